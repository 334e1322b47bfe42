//! Bucket readiness probe.
//!
//! Buckets are reconciled by a separate controller; the asset reconciler
//! only needs to know whether the referenced bucket is Ready and, if so,
//! how to address it. The probe folds "not found" and "not Ready" into the
//! same non-ready answer; only genuine lookup failures are errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Addressing information of a Ready bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    /// Name of the bucket inside the object store.
    pub remote_name: String,
    /// Public URL prefix the bucket is served under.
    pub url: String,
}

/// Outcome of a bucket readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketState {
    /// The bucket exists and is Ready.
    Ready(BucketStatus),
    /// The bucket is missing or not yet Ready.
    NotReady,
}

impl BucketState {
    /// Returns true when the bucket is Ready.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns the bucket status when Ready.
    #[must_use]
    pub const fn ready(&self) -> Option<&BucketStatus> {
        match self {
            Self::Ready(status) => Some(status),
            Self::NotReady => None,
        }
    }
}

/// Looks up the status of a referenced bucket.
///
/// Implementations read the outer plane's view of Bucket objects. They must
/// be safe for concurrent use.
#[async_trait]
pub trait BucketStatusFinder: Send + Sync {
    /// Probes the bucket `name` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the lookup itself fails; a missing or
    /// not-Ready bucket is reported as [`BucketState::NotReady`].
    async fn find(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<BucketState>;
}
