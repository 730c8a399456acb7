//! Configuration errors

use crate::model::IndexPath;

/// Errors caused by view configuration that cannot be honored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// No template name could be resolved for an item.
    #[error("No template configured for item at {0}")]
    NoTemplate(IndexPath),

    /// The parameter binding map is not a JSON object of strings.
    #[error("Malformed parameter binding map: {0}")]
    MalformedBindings(String),

    /// The template runtime failed to build an instance.
    #[error("Failed to build template '{template}': {message}")]
    Build { template: String, message: String },

    /// The operation is turned off by configuration.
    #[error("Operation disabled by setting '{0}'")]
    Disabled(&'static str),

    /// A required setting or component is absent.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

impl ConfigError {
    /// Creates a new instance build error.
    pub fn build(template: impl Into<String>, message: impl ToString) -> Self {
        Self::Build {
            template: template.into(),
            message: message.to_string(),
        }
    }
}
