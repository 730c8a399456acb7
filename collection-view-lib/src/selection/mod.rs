//! Selection and editing state

mod set;
mod tracker;

pub use set::*;
pub use tracker::*;
