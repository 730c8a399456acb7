//! Data reconciliation errors

use crate::model::IndexPath;
use crate::model::RowKey;

/// Errors that abort a data update. The previously committed data stays active.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// A row has no usable value in the identity field.
    #[error("Row {index} has no value in identity field '{field}'")]
    MissingUid { index: usize, field: String },

    /// Two rows share the same identity.
    #[error("Duplicate identity '{key}' at rows {first} and {second}")]
    DuplicateUid {
        key: RowKey,
        first: usize,
        second: usize,
    },

    /// An index path does not address a row of the current data set.
    #[error("No row at {0}")]
    IndexOutOfRange(IndexPath),

    /// No row with this identity exists in the current data set.
    #[error("No row with identity '{0}'")]
    UnknownKey(RowKey),

    /// A move would cross sections while that is disallowed.
    #[error("Moving from section {from} to section {to} is not allowed")]
    CrossSectionMove { from: usize, to: usize },
}

impl ReconcileError {
    /// Creates a new missing identity error.
    pub fn missing_uid(index: usize, field: impl Into<String>) -> Self {
        Self::MissingUid {
            index,
            field: field.into(),
        }
    }
}
