//! Reconcile branch classification.
//!
//! The branch predicate is a prioritized cascade, not a formal state
//! machine: deletion cross-cuts any phase, so predicates are evaluated in
//! a strict order and the first match wins. Keeping the classification
//! pure (no I/O, no clock reads) makes every branch decision unit-testable
//! in isolation.

use chrono::{DateTime, Duration, Utc};

use crate::asset::AssetInstance;
use crate::status::{AssetPhase, AssetReason, CommonAssetStatus};

/// The reconcile branch selected for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The Asset is being torn down; clean up remote content.
    Delete,
    /// A new generation was observed; checkpoint it as Pending/Scheduled.
    Checkpoint,
    /// A Ready Asset is due for re-verification.
    Reverify,
    /// A Pending Asset runs the full rebuild pipeline.
    Rebuild,
    /// A retryably-Failed Asset re-runs the full rebuild pipeline.
    Retry,
    /// Nothing to do this tick.
    Skip,
}

impl Action {
    /// Returns the action name used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Checkpoint => "checkpoint",
            Self::Reverify => "reverify",
            Self::Rebuild => "rebuild",
            Self::Retry => "retry",
            Self::Skip => "skip",
        }
    }
}

/// Classifies `(instance, status, now)` into a reconcile action.
///
/// Predicates are evaluated in strict order; the first match wins:
///
/// 1. Deletion timestamp set → [`Action::Delete`]
/// 2. Observed generation differs → [`Action::Checkpoint`]
/// 3. Ready and past the relist interval → [`Action::Reverify`]
/// 4. Pending, unless blocked on `BucketNotReady` within the relist
///    interval → [`Action::Rebuild`]
/// 5. Failed with a non-sticky reason → [`Action::Retry`]
/// 6. Otherwise → [`Action::Skip`]
#[must_use]
pub fn classify(
    instance: &AssetInstance,
    status: &CommonAssetStatus,
    now: DateTime<Utc>,
    relist_interval: Duration,
) -> Action {
    if instance.is_being_deleted() {
        return Action::Delete;
    }

    if status.observed_generation != instance.generation {
        return Action::Checkpoint;
    }

    if is_on_ready(status, now, relist_interval) {
        return Action::Reverify;
    }

    if is_on_pending(status, now, relist_interval) {
        return Action::Rebuild;
    }

    if status.phase == AssetPhase::Failed && !status.is_sticky_failure() {
        return Action::Retry;
    }

    Action::Skip
}

fn is_on_ready(status: &CommonAssetStatus, now: DateTime<Utc>, relist_interval: Duration) -> bool {
    status.phase == AssetPhase::Ready && now > status.last_heartbeat_time + relist_interval
}

fn is_on_pending(
    status: &CommonAssetStatus,
    now: DateTime<Utc>,
    relist_interval: Duration,
) -> bool {
    if status.phase != AssetPhase::Pending {
        return false;
    }

    // Bucket back-off: blocked Assets are re-checked no sooner than one
    // relist interval after the last heartbeat.
    if status.reason == Some(AssetReason::BucketNotReady)
        && now < status.last_heartbeat_time + relist_interval
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fix_instance(generation: i64) -> AssetInstance {
        AssetInstance {
            namespace: "default".into(),
            name: "a1".into(),
            generation,
            deletion_timestamp: None,
            finalizers: Vec::new(),
        }
    }

    fn fix_status(
        phase: AssetPhase,
        reason: AssetReason,
        observed_generation: i64,
        heartbeat: DateTime<Utc>,
    ) -> CommonAssetStatus {
        CommonAssetStatus {
            phase,
            reason: Some(reason),
            message: String::new(),
            observed_generation,
            last_heartbeat_time: heartbeat,
            asset_ref: crate::status::AssetRef::default(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn relist() -> Duration {
        Duration::seconds(60)
    }

    #[test]
    fn deletion_wins_over_everything() {
        let mut instance = fix_instance(2);
        instance.deletion_timestamp = Some(t0());

        // Even with a stale generation, deletion is classified first.
        let status = fix_status(AssetPhase::Ready, AssetReason::Uploaded, 1, t0());
        assert_eq!(classify(&instance, &status, t0(), relist()), Action::Delete);
    }

    #[test]
    fn new_generation_checkpoints() {
        let instance = fix_instance(2);
        let status = fix_status(AssetPhase::Ready, AssetReason::Uploaded, 1, t0());
        assert_eq!(classify(&instance, &status, t0(), relist()), Action::Checkpoint);
    }

    #[test]
    fn empty_status_checkpoints() {
        let instance = fix_instance(1);
        let status = CommonAssetStatus::default();
        assert_eq!(classify(&instance, &status, t0(), relist()), Action::Checkpoint);
    }

    #[test]
    fn ready_reverifies_only_after_the_relist_interval() {
        let instance = fix_instance(1);
        let status = fix_status(AssetPhase::Ready, AssetReason::Uploaded, 1, t0());

        assert_eq!(
            classify(&instance, &status, t0() + Duration::seconds(30), relist()),
            Action::Skip
        );
        // Exactly at the boundary the predicate is strict.
        assert_eq!(
            classify(&instance, &status, t0() + relist(), relist()),
            Action::Skip
        );
        assert_eq!(
            classify(&instance, &status, t0() + Duration::seconds(61), relist()),
            Action::Reverify
        );
    }

    #[test]
    fn pending_scheduled_rebuilds_immediately() {
        let instance = fix_instance(1);
        let status = fix_status(AssetPhase::Pending, AssetReason::Scheduled, 1, t0());
        assert_eq!(classify(&instance, &status, t0(), relist()), Action::Rebuild);
    }

    #[test]
    fn bucket_not_ready_backs_off_one_relist_interval() {
        let instance = fix_instance(1);
        let status = fix_status(AssetPhase::Pending, AssetReason::BucketNotReady, 1, t0());

        assert_eq!(
            classify(&instance, &status, t0() + Duration::seconds(59), relist()),
            Action::Skip
        );
        // At the boundary the back-off expires.
        assert_eq!(
            classify(&instance, &status, t0() + relist(), relist()),
            Action::Rebuild
        );
    }

    #[test]
    fn retryable_failures_retry() {
        let instance = fix_instance(1);
        for reason in [
            AssetReason::BucketError,
            AssetReason::PullingFailed,
            AssetReason::MutationError,
            AssetReason::ValidationError,
            AssetReason::MetadataExtractionFailed,
            AssetReason::UploadFailed,
            AssetReason::CleanupError,
            AssetReason::MissingContent,
            AssetReason::RemoteContentVerificationError,
        ] {
            let status = fix_status(AssetPhase::Failed, reason, 1, t0());
            assert_eq!(
                classify(&instance, &status, t0(), relist()),
                Action::Retry,
                "reason {reason} should retry"
            );
        }
    }

    #[test]
    fn sticky_failures_skip_until_generation_changes() {
        let instance = fix_instance(1);
        for reason in [AssetReason::MutationFailed, AssetReason::ValidationFailed] {
            let status = fix_status(AssetPhase::Failed, reason, 1, t0());
            assert_eq!(classify(&instance, &status, t0(), relist()), Action::Skip);

            // A new generation re-enters through the checkpoint branch.
            let bumped = fix_instance(2);
            assert_eq!(classify(&bumped, &status, t0(), relist()), Action::Checkpoint);
        }
    }
}
