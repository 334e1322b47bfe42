//! Reconciler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the asset reconciler.
///
/// A single interval drives both cadences the reconciler backs off on: the
/// Ready re-verification check and the `BucketNotReady` retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Minimum duration between two successive I/O-touching reconciles of
    /// the same Ready or bucket-blocked Asset.
    #[serde(default = "default_relist_interval")]
    pub relist_interval: Duration,
}

fn default_relist_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            relist_interval: default_relist_interval(),
        }
    }
}

impl ReconcileConfig {
    /// The relist interval as a `chrono` duration for status arithmetic.
    ///
    /// Intervals beyond the `chrono` range are clamped to the maximum.
    #[must_use]
    pub fn relist_interval_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.relist_interval).unwrap_or(chrono::Duration::MAX)
    }
}
