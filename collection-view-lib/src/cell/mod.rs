//! Recyclable cells and the template instances they own

mod globals;
mod instance;
mod pool;
mod recyclable;

pub use globals::*;
pub use instance::*;
pub use pool::*;
pub use recyclable::*;
