//! Data reconciliation pipeline
//!
//! Raw rows go through identity checks, sorting and sectioning into a
//! [`Snapshot`]. The [`Pipeline`] serializes updates, decides whether the
//! engine must recompute layout, and serves the committed snapshot through
//! the [`DataSet`](crate::engine::DataSet) contract.

pub mod edit;

mod queue;
mod reconcile;
mod snapshot;

pub use queue::*;
pub use reconcile::*;
pub use snapshot::*;
