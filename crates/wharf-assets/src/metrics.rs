//! Observability metrics for asset reconciliation.
//!
//! Metrics are exposed via the `metrics` crate facade and are Prometheus
//! compatible. Two series cover the reconciler:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `wharf_assets_reconcile_total` | Counter | `action`, `outcome` | Reconcile invocations by branch and result |
//! | `wharf_assets_reconcile_duration_seconds` | Histogram | `action` | Reconcile branch duration |

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Reconcile invocations by branch and result.
    pub const RECONCILE_TOTAL: &str = "wharf_assets_reconcile_total";
    /// Histogram: Reconcile branch duration in seconds.
    pub const RECONCILE_DURATION_SECONDS: &str = "wharf_assets_reconcile_duration_seconds";
}

/// Label keys used across metrics.
pub mod labels {
    /// Selected reconcile branch (delete, checkpoint, reverify, ...).
    pub const ACTION: &str = "action";
    /// Invocation result (changed, unchanged, error).
    pub const OUTCOME: &str = "outcome";
}

/// Records one reconcile invocation.
pub fn record_reconcile(action: &str, outcome: &str) {
    counter!(
        names::RECONCILE_TOTAL,
        labels::ACTION => action.to_string(),
        labels::OUTCOME => outcome.to_string(),
    )
    .increment(1);
}

/// RAII guard recording reconcile duration when dropped.
pub struct TimingGuard {
    start: Instant,
    action: &'static str,
}

impl TimingGuard {
    /// Starts timing the given reconcile branch.
    #[must_use]
    pub fn new(action: &'static str) -> Self {
        Self {
            start: Instant::now(),
            action,
        }
    }

    /// Returns the elapsed time since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        histogram!(
            names::RECONCILE_DURATION_SECONDS,
            labels::ACTION => self.action.to_string(),
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_an_installed_recorder_does_not_panic() {
        record_reconcile("rebuild", "changed");
        record_reconcile("delete", "error");
    }

    #[test]
    fn timing_guard_measures_duration() {
        let guard = TimingGuard::new("reverify");
        std::thread::sleep(Duration::from_millis(5));
        assert!(guard.elapsed() >= Duration::from_millis(5));
    }
}
