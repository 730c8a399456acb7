//! Error types

mod config;
mod fetch;
mod field;
mod publish;
mod reconcile;

pub use config::*;
pub use fetch::*;
pub use field::*;
pub use publish::*;
pub use reconcile::*;

/// Umbrella error for collection view operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A template definition could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The view is configured in a way that cannot be honored.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A data update was rejected.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The host refused a property write.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// A row field was missing or had the wrong type.
    #[error(transparent)]
    Field(#[from] FieldError),
}
