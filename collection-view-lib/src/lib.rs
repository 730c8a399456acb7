//! Virtualized collection view library
//!
//! Displays a data set as a scrollable collection of cells, each rendered from
//! a named template. Template definitions are fetched once and shared,
//! incoming data is reconciled into sorted, sectioned snapshots, and cells
//! follow selection and editing state across updates.

pub mod cell;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod model;
pub mod pipeline;
pub mod selection;
pub mod template;

mod view;

pub use error::Error;
pub use view::*;
