//! Error types for the asset reconciliation domain.

/// The result type used throughout wharf-assets.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during asset reconciliation.
///
/// All variants are transient from the reconciler's point of view: the
/// handler maps them onto the failing stage's reason code and the outer
/// plane requeues. Definitive content rejections (mutation/validation
/// webhooks answering `success=false`) are not errors; they are encoded
/// directly in the returned status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the referenced bucket status failed.
    #[error("bucket error: {message}")]
    Bucket {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fetching or staging source content failed.
    #[error("loader error: {message}")]
    Loader {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A webhook call failed at the transport level.
    #[error("webhook error: {message}")]
    Webhook {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// An error from wharf-core (storage and internal failures).
    #[error("core error: {0}")]
    Core(#[from] wharf_core::Error),
}

impl Error {
    /// Creates a new bucket error.
    #[must_use]
    pub fn bucket(message: impl Into<String>) -> Self {
        Self::Bucket {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new loader error.
    #[must_use]
    pub fn loader(message: impl Into<String>) -> Self {
        Self::Loader {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new loader error with a source cause.
    #[must_use]
    pub fn loader_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Loader {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new webhook transport error.
    #[must_use]
    pub fn webhook(message: impl Into<String>) -> Self {
        Self::Webhook {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new webhook transport error with a source cause.
    #[must_use]
    pub fn webhook_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Webhook {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn bucket_error_display() {
        let err = Error::bucket("while reading bucket status");
        assert!(err.to_string().contains("bucket error"));
        assert!(err.to_string().contains("while reading bucket status"));
    }

    #[test]
    fn loader_error_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::loader_with_source("while staging source content", source);
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn core_error_converts() {
        let err: Error = wharf_core::Error::storage("put failed").into();
        assert!(err.to_string().contains("put failed"));
    }
}
