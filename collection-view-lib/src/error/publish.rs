//! Host publication errors

/// Errors reported by the host when a property write is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PublishError {
    /// The host does not know the property.
    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    /// The host rejected the value.
    #[error("Property '{property}' rejected: {message}")]
    Rejected { property: String, message: String },
}

impl PublishError {
    /// Creates a new rejection error.
    pub fn rejected(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            property: property.into(),
            message: message.into(),
        }
    }
}
