//! Asset declaration types.
//!
//! These are the read-only inputs handed to the reconciler on every call:
//! the object metadata snapshot ([`AssetInstance`]) and the declared spec
//! ([`AssetSpec`]). Both are owned by the outer persistence/watch plane;
//! the core only observes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of an Asset's object metadata.
///
/// The outer plane advances `generation` on every spec change and sets
/// `deletion_timestamp` when the Asset is being torn down. Finalizers are
/// managed by the outer plane; the core only observes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInstance {
    /// Namespace the Asset lives in.
    pub namespace: String,
    /// Asset name; also the object prefix inside the target bucket.
    pub name: String,
    /// Monotonic integer advanced by the outer plane on each spec change.
    pub generation: i64,
    /// Present iff the Asset is being torn down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    /// Opaque finalizer set, managed by the outer plane.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

impl AssetInstance {
    /// Returns true when the Asset is being deleted.
    #[must_use]
    pub const fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

/// Reference to the target bucket in the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRef {
    /// Name of the referenced bucket.
    pub name: String,
}

/// What the loader is expected to produce for a source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// A single file.
    Single,
    /// An archive or directory tree unpacked into multiple files.
    Package,
    /// An indexed set of files.
    Index,
}

/// An external HTTP endpoint invoked to mutate, validate, or annotate
/// loaded files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookService {
    /// Endpoint URL of the service.
    pub url: String,
    /// Opaque parameters forwarded to the service with every call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl WebhookService {
    /// Creates a service entry for the given endpoint URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parameters: None,
        }
    }

    /// Attaches opaque parameters forwarded with every call.
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Declared source content and its processing webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSource {
    /// Location of the source content.
    pub url: String,
    /// Governs what the loader returns for the URL.
    pub mode: SourceMode,
    /// Optional regex narrowing loaded filenames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Ordered mutation webhook endpoints (empty = skip the stage).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutation_webhook_service: Vec<WebhookService>,
    /// Ordered validation webhook endpoints (empty = skip the stage).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_webhook_service: Vec<WebhookService>,
    /// Ordered metadata webhook endpoints (empty = skip the stage).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata_webhook_service: Vec<WebhookService>,
}

/// The declared state of an Asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSpec {
    /// The target bucket in the same namespace.
    pub bucket_ref: BucketRef,
    /// The source content declaration.
    pub source: AssetSource,
}
