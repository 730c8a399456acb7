//! View configuration

mod bindings;
mod collection;

pub use bindings::*;
pub use collection::*;
