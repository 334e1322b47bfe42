//! The durable status written back after each reconcile.
//!
//! [`CommonAssetStatus`] is the sole durable coordination surface between
//! reconcile invocations: the outer plane persists it and hands it back on
//! the next call. The reason set is closed; every reason carries a fixed
//! message template so that status messages and event messages stay
//! consistent across the codebase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of an Asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetPhase {
    /// Work is scheduled or in progress; content is not (yet) served.
    #[default]
    Pending,
    /// The declared content is present under the Asset's prefix.
    Ready,
    /// The last reconcile failed; see the reason for retry semantics.
    Failed,
}

/// Closed set of status/event reasons.
///
/// Each reason has a fixed message template, rendered via
/// [`AssetReason::render_message`]. Two reasons are sticky-failure markers
/// ([`AssetReason::MutationFailed`] and [`AssetReason::ValidationFailed`]):
/// a Failed status carrying one of them is not retried until the spec
/// generation advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetReason {
    /// Generation observed; the pipeline will run next tick.
    Scheduled,
    /// Referenced bucket not yet Ready; back off one relist interval.
    BucketNotReady,
    /// Error reading bucket status.
    BucketError,
    /// Loader fetched the source content.
    Pulled,
    /// Loader failed to fetch the source content.
    PullingFailed,
    /// Mutation webhooks rewrote the content.
    Mutated,
    /// Mutation webhook transport failure.
    MutationError,
    /// Mutation webhook rejected the content (sticky).
    MutationFailed,
    /// Validation webhooks accepted the content.
    Validated,
    /// Validation webhook transport failure.
    ValidationError,
    /// Validation webhook rejected the content (sticky).
    ValidationFailed,
    /// Metadata webhooks annotated the content.
    MetadataExtracted,
    /// Metadata webhook failure.
    MetadataExtractionFailed,
    /// Content uploaded to the bucket.
    Uploaded,
    /// Uploading content to the bucket failed.
    UploadFailed,
    /// Stale content removed from the bucket.
    Cleaned,
    /// Removing content from the bucket failed.
    CleanupError,
    /// Ready re-verification found at least one file missing.
    MissingContent,
    /// Error during Ready re-verification.
    RemoteContentVerificationError,
}

impl AssetReason {
    /// Returns the reason identifier as recorded in events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::BucketNotReady => "BucketNotReady",
            Self::BucketError => "BucketError",
            Self::Pulled => "Pulled",
            Self::PullingFailed => "PullingFailed",
            Self::Mutated => "Mutated",
            Self::MutationError => "MutationError",
            Self::MutationFailed => "MutationFailed",
            Self::Validated => "Validated",
            Self::ValidationError => "ValidationError",
            Self::ValidationFailed => "ValidationFailed",
            Self::MetadataExtracted => "MetadataExtracted",
            Self::MetadataExtractionFailed => "MetadataExtractionFailed",
            Self::Uploaded => "Uploaded",
            Self::UploadFailed => "UploadFailed",
            Self::Cleaned => "Cleaned",
            Self::CleanupError => "CleanupError",
            Self::MissingContent => "MissingContent",
            Self::RemoteContentVerificationError => "RemoteContentVerificationError",
        }
    }

    /// Returns the fixed human message template for this reason.
    #[must_use]
    pub const fn message_template(self) -> &'static str {
        match self {
            Self::Scheduled => "Asset scheduled for processing",
            Self::BucketNotReady => "Referenced bucket is not ready",
            Self::BucketError => "Reading bucket status failed",
            Self::Pulled => "Asset content has been pulled",
            Self::PullingFailed => "Pulling asset content failed",
            Self::Mutated => "Asset content has been mutated",
            Self::MutationError => "Mutating asset content failed",
            Self::MutationFailed => "Mutation webhook rejected asset content",
            Self::Validated => "Asset content has been validated",
            Self::ValidationError => "Validating asset content failed",
            Self::ValidationFailed => "Validation webhook rejected asset content",
            Self::MetadataExtracted => "Metadata has been extracted from asset content",
            Self::MetadataExtractionFailed => "Extracting metadata from asset content failed",
            Self::Uploaded => "Asset content has been uploaded",
            Self::UploadFailed => "Uploading asset content failed",
            Self::Cleaned => "Stale asset content has been removed from the bucket",
            Self::CleanupError => "Removing asset content from the bucket failed",
            Self::MissingContent => "Some asset files are missing from the bucket",
            Self::RemoteContentVerificationError => "Verifying asset content in the bucket failed",
        }
    }

    /// Renders the message template, appending `detail` when present.
    #[must_use]
    pub fn render_message(self, detail: &str) -> String {
        if detail.is_empty() {
            self.message_template().to_string()
        } else {
            format!("{}: {detail}", self.message_template())
        }
    }

    /// Returns true for sticky-failure markers.
    ///
    /// A Failed status carrying a sticky reason will not self-heal; the
    /// user must change the spec, advancing the generation.
    #[must_use]
    pub const fn is_sticky(self) -> bool {
        matches!(self, Self::MutationFailed | Self::ValidationFailed)
    }
}

impl std::fmt::Display for AssetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file recorded in a Ready status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    /// Filename relative to the Asset's prefix in the bucket.
    pub name: String,
    /// Opaque per-file metadata produced by the metadata webhook.
    ///
    /// Passed through untouched; the core never parses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AssetFile {
    /// Creates a file entry without metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
        }
    }
}

/// Public addressing information, meaningful only in the Ready phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    /// Public URL prefix under which the files are served.
    #[serde(rename = "baseURL", default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    /// Files present under the prefix, with optional metadata.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<AssetFile>,
}

impl AssetRef {
    /// Returns the recorded filenames, in recorded order.
    #[must_use]
    pub fn filenames(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }
}

/// The durable status of an Asset; the core's sole output per reconcile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonAssetStatus {
    /// Lifecycle phase.
    pub phase: AssetPhase,
    /// Reason for the current phase; absent only on a never-reconciled
    /// Asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AssetReason>,
    /// Rendered message for the current reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// The generation the core last acted on.
    #[serde(default)]
    pub observed_generation: i64,
    /// Wall-clock instant this status was produced.
    #[serde(default = "epoch")]
    pub last_heartbeat_time: DateTime<Utc>,
    /// Public addressing information (Ready phase only).
    #[serde(default, skip_serializing_if = "asset_ref_is_empty")]
    pub asset_ref: AssetRef,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

fn asset_ref_is_empty(asset_ref: &AssetRef) -> bool {
    asset_ref.base_url.is_empty() && asset_ref.files.is_empty()
}

impl CommonAssetStatus {
    /// Returns true when the status carries a sticky failure.
    #[must_use]
    pub fn is_sticky_failure(&self) -> bool {
        self.phase == AssetPhase::Failed && self.reason.is_some_and(AssetReason::is_sticky)
    }
}
