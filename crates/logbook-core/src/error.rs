//! Error types for the logbook core.

use thiserror::Error;

/// Errors that can occur while validating, searching or allocating log entries.
#[derive(Debug, Error)]
pub enum LogbookError {
    /// A payload failed validation (inactive reference, bad attribute, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A named resource does not exist.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Resource kind, e.g. `"logbook"`.
        kind: &'static str,
        /// Key that was looked up.
        key: String,
    },

    /// The sequence generator cannot reach its counter resource.
    #[error("id allocation failed: {0}")]
    Allocation(String),

    /// The external index is unreachable or timed out.
    #[error("store unavailable: {0}")]
    TransientStore(String),

    /// The query string is structurally invalid.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// A time expression could not be parsed.
    #[error("invalid time expression: {0}")]
    InvalidTime(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LogbookError {
    /// Shorthand for a [`LogbookError::NotFound`].
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Returns true if a caller may retry the failed operation with backoff.
    ///
    /// Only connectivity failures qualify; a missing counter resource or a
    /// rejected payload will fail again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    /// Returns true if the error was caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MissingField(_)
                | Self::MalformedQuery(_)
                | Self::InvalidTime(_)
                | Self::Serialization(_)
        )
    }
}

/// Result type alias for logbook operations.
pub type Result<T> = std::result::Result<T, LogbookError>;
