//! Row data model

mod index_path;
mod row;
mod shape;
mod value;

pub use index_path::*;
pub use row::*;
pub use shape::*;
pub use value::*;
