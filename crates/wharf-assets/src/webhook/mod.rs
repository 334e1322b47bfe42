//! Webhook processing stages.
//!
//! Loaded content can be passed through three kinds of external services
//! before upload: mutation (rewrites files in place), validation
//! (accept/reject), and metadata extraction (per-file JSON annotations).
//! The reconciler consumes the stages behind narrow traits; wiring and
//! chaining across a service list is the client's concern, not the
//! pipeline's.
//!
//! [`http::HttpWebhook`] is the production client implementing all three
//! traits over HTTP.

pub mod http;

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::asset::WebhookService;
use crate::error::Result;

/// Result of a mutation or validation pass.
///
/// `success = false` is a definitive content rejection (sticky failure),
/// not a transport error; transport errors are returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    /// Whether every service accepted the content.
    pub success: bool,
    /// Rejection messages, empty on success.
    pub messages: String,
}

impl WebhookOutcome {
    /// An accepting outcome.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            success: true,
            messages: String::new(),
        }
    }

    /// A rejecting outcome with the given messages.
    #[must_use]
    pub fn rejected(messages: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: messages.into(),
        }
    }
}

/// Per-file metadata produced by a metadata webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    /// Filename relative to the workspace base path.
    pub name: String,
    /// Opaque JSON blob; passed through to the status untouched.
    pub metadata: serde_json::Value,
}

/// Rewrites loaded files in place via external services.
///
/// The filename list is canonical: its size and order are unchanged by
/// mutation; only file contents on disk may change.
#[async_trait]
pub trait Mutator: Send + Sync {
    /// Runs the mutation pass over the staged files.
    async fn mutate(
        &self,
        cancel: &CancellationToken,
        base_path: &Path,
        filenames: &[String],
        services: &[WebhookService],
    ) -> Result<WebhookOutcome>;
}

/// Produces an accept/reject verdict for loaded files.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Runs the validation pass over the staged files.
    async fn validate(
        &self,
        cancel: &CancellationToken,
        base_path: &Path,
        filenames: &[String],
        services: &[WebhookService],
    ) -> Result<WebhookOutcome>;
}

/// Produces per-file JSON metadata for loaded files.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Runs the metadata pass over the staged files.
    ///
    /// Files without metadata are simply absent from the result.
    async fn extract(
        &self,
        cancel: &CancellationToken,
        base_path: &Path,
        filenames: &[String],
        services: &[WebhookService],
    ) -> Result<Vec<FileMetadata>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_outcome_has_no_messages() {
        let outcome = WebhookOutcome::accepted();
        assert!(outcome.success);
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn rejected_outcome_carries_messages() {
        let outcome = WebhookOutcome::rejected("bad frontmatter");
        assert!(!outcome.success);
        assert_eq!(outcome.messages, "bad frontmatter");
    }
}
