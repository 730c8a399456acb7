//! Row field access errors

/// Error returned by the typed accessors on [`Row`](crate::model::Row).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    /// The row has no such field.
    #[error("Row has no field '{field}'")]
    Missing { field: String },

    /// The field holds a value of another type.
    #[error("Field '{field}' holds {actual}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The field holds a value that cannot identify a row (null, tables).
    #[error("Field '{field}' holds {actual}, which cannot be used as an identity")]
    NotAKey { field: String, actual: &'static str },
}

impl FieldError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    pub fn type_mismatch(field: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    pub fn not_a_key(field: impl Into<String>, actual: &'static str) -> Self {
        Self::NotAKey {
            field: field.into(),
            actual,
        }
    }
}
