//! Template definition fetch errors

/// Errors that can occur while retrieving a template definition.
///
/// Fetch errors are `Clone` because a single failed fetch is delivered to
/// every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("Network error fetching template '{name}': {message}")]
    Network { name: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching template '{name}'")]
    Http { name: String, status: u16 },

    /// The response body was not a valid template definition.
    #[error("Invalid definition for template '{name}': {message}")]
    Parse { name: String, message: String },

    /// No template with this name exists.
    #[error("Template '{0}' not found")]
    NotFound(String),

    /// The fetcher base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The fetcher cannot serve requests without suspending.
    #[error("Template '{0}' cannot be fetched synchronously")]
    BlockingUnsupported(String),
}

impl FetchError {
    /// Creates a new network error.
    pub fn network(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Creates a new HTTP status error.
    pub fn http(name: impl Into<String>, status: u16) -> Self {
        Self::Http {
            name: name.into(),
            status,
        }
    }

    /// Creates a new parse error.
    pub fn parse(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Returns `true` if retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
