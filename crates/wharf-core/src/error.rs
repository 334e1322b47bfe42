//! Error types and result aliases for wharf.
//!
//! This module defines the shared error types used across all wharf
//! components. Errors are structured for programmatic handling and include
//! context for debugging.

/// The result type used throughout wharf.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wharf core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A path or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error represents a missing object.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn storage_error_display() {
        let err = Error::storage("bucket unreachable");
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("bucket unreachable"));
    }

    #[test]
    fn storage_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::storage_with_source("failed to read object", source);
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn not_found_is_detectable() {
        assert!(Error::NotFound("a/b".into()).is_not_found());
        assert!(!Error::storage("x").is_not_found());
    }
}
