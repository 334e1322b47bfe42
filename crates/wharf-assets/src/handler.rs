//! The reconcile orchestrator.
//!
//! One [`Handler::handle`] call per reconcile event: the outer plane hands
//! in a monotonic `now`, the Asset snapshot, its spec, and the last
//! persisted status; the handler classifies the call into a branch,
//! executes it, and returns an [`Outcome`] describing what to persist and
//! whether to requeue.
//!
//! The handler holds no state of its own between calls — the returned
//! status is the sole coordination surface — so it is safe to drive
//! different Assets concurrently from separate tasks. The outer plane
//! serializes calls per Asset key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use wharf_core::observability::reconcile_span;

use crate::asset::{AssetInstance, AssetSpec};
use crate::bucket::{BucketState, BucketStatusFinder};
use crate::config::ReconcileConfig;
use crate::error::{Error, Result};
use crate::events::{EventRecorder, EventType};
use crate::loader::{Loader, Workspace};
use crate::metrics::{TimingGuard, record_reconcile};
use crate::predicate::{Action, classify};
use crate::status::{AssetFile, AssetPhase, AssetReason, AssetRef, CommonAssetStatus};
use crate::store::Store;
use crate::webhook::{FileMetadata, MetadataExtractor, Mutator, Validator};

/// Result of one reconcile invocation.
///
/// Mirrors the `(new status?, error?)` contract the outer plane consumes:
///
/// - `status` set: persist it before anything else
/// - `error` set: requeue the Asset after persisting
/// - neither set: no change, write nothing
///
/// Sticky content rejections produce a status with **no** error, so the
/// outer plane does not requeue; recovery requires a new spec generation.
#[derive(Debug)]
pub struct Outcome {
    /// New status to persist, if any.
    pub status: Option<CommonAssetStatus>,
    /// Error to surface for requeue, if any.
    pub error: Option<Error>,
}

impl Outcome {
    /// No change; the outer plane writes nothing.
    #[must_use]
    pub const fn unchanged() -> Self {
        Self {
            status: None,
            error: None,
        }
    }

    /// A new status with no error.
    #[must_use]
    pub fn changed(status: CommonAssetStatus) -> Self {
        Self {
            status: Some(status),
            error: None,
        }
    }

    /// A new status plus an error to trigger a requeue.
    #[must_use]
    pub fn failed(status: CommonAssetStatus, error: Error) -> Self {
        Self {
            status: Some(status),
            error: Some(error),
        }
    }

    /// An error with no status change.
    #[must_use]
    pub fn error(error: Error) -> Self {
        Self {
            status: None,
            error: Some(error),
        }
    }

    /// Returns true when neither a status nor an error was produced.
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        self.status.is_none() && self.error.is_none()
    }

    fn result_label(&self) -> &'static str {
        match (&self.status, &self.error) {
            (_, Some(_)) => "error",
            (Some(_), None) => "changed",
            (None, None) => "unchanged",
        }
    }
}

/// The reconcile entry point consumed by the outer controller loop.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs one reconcile for the given Asset snapshot.
    async fn handle(
        &self,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        spec: &AssetSpec,
        status: &CommonAssetStatus,
    ) -> Outcome;
}

/// Injected collaborators for [`AssetHandler`].
///
/// Every collaborator must be safe for concurrent use; the handler may
/// drive many Assets at once from separate tasks.
#[derive(Clone)]
pub struct Dependencies {
    /// Event sink for stage-boundary events.
    pub recorder: Arc<dyn EventRecorder>,
    /// Bucket readiness probe.
    pub find_bucket_status: Arc<dyn BucketStatusFinder>,
    /// Bucket-scoped object store.
    pub store: Arc<dyn Store>,
    /// Source content loader.
    pub loader: Arc<dyn Loader>,
    /// Mutation webhook stage.
    pub mutator: Arc<dyn Mutator>,
    /// Validation webhook stage.
    pub validator: Arc<dyn Validator>,
    /// Metadata webhook stage.
    pub metadata_extractor: Arc<dyn MetadataExtractor>,
}

/// The asset reconciliation state machine.
pub struct AssetHandler {
    deps: Dependencies,
    relist_interval: chrono::Duration,
}

impl AssetHandler {
    /// Creates a handler over the given collaborators.
    #[must_use]
    pub fn new(deps: Dependencies, config: ReconcileConfig) -> Self {
        Self {
            deps,
            relist_interval: config.relist_interval_chrono(),
        }
    }

    async fn on_delete(
        &self,
        cancel: &CancellationToken,
        instance: &AssetInstance,
        spec: &AssetSpec,
    ) -> Outcome {
        tracing::info!("deleting asset content");

        let bucket = match self.probe_bucket(cancel, instance, spec).await {
            Ok(state) => state,
            Err(e) => return Outcome::error(e),
        };

        let Some(bucket) = bucket.ready().cloned() else {
            // A torn-down bucket leaves nothing to reclaim.
            tracing::info!(bucket = %spec.bucket_ref.name, "nothing to delete, bucket is not ready");
            return Outcome::unchanged();
        };

        match self
            .delete_remote_content(cancel, instance, &bucket.remote_name)
            .await
        {
            Ok(()) => {
                tracing::info!("asset content deleted");
                Outcome::unchanged()
            }
            Err(e) => Outcome::error(e),
        }
    }

    async fn on_ready(
        &self,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        spec: &AssetSpec,
        status: &CommonAssetStatus,
    ) -> Outcome {
        let bucket = match self.probe_bucket(cancel, instance, spec).await {
            Ok(BucketState::Ready(bucket)) => bucket,
            Ok(BucketState::NotReady) => return self.bucket_not_ready(now, instance, spec),
            Err(e) => return self.fail(now, instance, AssetReason::BucketError, e),
        };

        let expected = status.asset_ref.filenames();
        match self
            .deps
            .store
            .contains_all_objects(cancel, &bucket.remote_name, &instance.name, &expected)
            .await
        {
            Err(e) => self.fail(now, instance, AssetReason::RemoteContentVerificationError, e),
            Ok(false) => {
                self.record_warning(instance, AssetReason::MissingContent, "");
                Outcome::changed(self.status_for(
                    now,
                    instance,
                    AssetPhase::Failed,
                    AssetReason::MissingContent,
                    "",
                ))
            }
            Ok(true) => {
                tracing::info!("asset content is up to date");
                Outcome::changed(self.ready_status(
                    now,
                    instance,
                    status.asset_ref.base_url.clone(),
                    status.asset_ref.files.clone(),
                ))
            }
        }
    }

    /// The full rebuild pipeline for Pending and retryably-Failed Assets.
    async fn on_pending(
        &self,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        spec: &AssetSpec,
    ) -> Outcome {
        let bucket = match self.probe_bucket(cancel, instance, spec).await {
            Ok(BucketState::Ready(bucket)) => bucket,
            Ok(BucketState::NotReady) => return self.bucket_not_ready(now, instance, spec),
            Err(e) => return self.fail(now, instance, AssetReason::BucketError, e),
        };

        // Stale content from a prior generation is dropped before the new
        // content is fetched; the no-content window is accepted.
        if let Err(e) = self
            .delete_remote_content(cancel, instance, &bucket.remote_name)
            .await
        {
            return self.fail(now, instance, AssetReason::CleanupError, e);
        }

        let source = &spec.source;
        tracing::info!(url = %source.url, "loading asset content");
        let workspace = match self
            .deps
            .loader
            .load(&source.url, &instance.name, source.mode, source.filter.as_deref())
            .await
        {
            // The guard owns the scratch directory from here on; every
            // return below releases it.
            Ok((base_path, filenames)) => {
                Workspace::new(Arc::clone(&self.deps.loader), base_path, filenames)
            }
            Err(e) => return self.fail(now, instance, AssetReason::PullingFailed, e),
        };
        self.record_normal(instance, AssetReason::Pulled, "");

        if !source.mutation_webhook_service.is_empty() {
            tracing::info!("mutating asset content");
            let result = self
                .deps
                .mutator
                .mutate(
                    cancel,
                    workspace.base_path(),
                    workspace.filenames(),
                    &source.mutation_webhook_service,
                )
                .await;
            match result {
                Err(e) => return self.fail(now, instance, AssetReason::MutationError, e),
                Ok(result) if !result.success => {
                    return self.reject(now, instance, AssetReason::MutationFailed, &result.messages);
                }
                Ok(_) => self.record_normal(instance, AssetReason::Mutated, ""),
            }
        }

        if !source.validation_webhook_service.is_empty() {
            tracing::info!("validating asset content");
            let result = self
                .deps
                .validator
                .validate(
                    cancel,
                    workspace.base_path(),
                    workspace.filenames(),
                    &source.validation_webhook_service,
                )
                .await;
            match result {
                Err(e) => return self.fail(now, instance, AssetReason::ValidationError, e),
                Ok(result) if !result.success => {
                    return self.reject(
                        now,
                        instance,
                        AssetReason::ValidationFailed,
                        &result.messages,
                    );
                }
                Ok(_) => self.record_normal(instance, AssetReason::Validated, ""),
            }
        }

        let mut files: Vec<AssetFile> = workspace
            .filenames()
            .iter()
            .map(|name| AssetFile::new(name.clone()))
            .collect();

        if !source.metadata_webhook_service.is_empty() {
            tracing::info!("extracting metadata from asset content");
            match self
                .deps
                .metadata_extractor
                .extract(
                    cancel,
                    workspace.base_path(),
                    workspace.filenames(),
                    &source.metadata_webhook_service,
                )
                .await
            {
                Err(e) => {
                    return self.fail(now, instance, AssetReason::MetadataExtractionFailed, e);
                }
                Ok(metadatas) => {
                    files = merge_metadata(files, metadatas);
                    self.record_normal(instance, AssetReason::MetadataExtracted, "");
                }
            }
        }

        tracing::info!(bucket = %bucket.remote_name, "uploading asset content");
        if let Err(e) = self
            .deps
            .store
            .put_objects(
                cancel,
                &bucket.remote_name,
                &instance.name,
                workspace.base_path(),
                workspace.filenames(),
            )
            .await
        {
            return self.fail(now, instance, AssetReason::UploadFailed, e);
        }
        self.record_normal(instance, AssetReason::Uploaded, "");

        let base_url = format!("{}/{}", bucket.url, instance.name);
        Outcome::changed(self.ready_status(now, instance, base_url, files))
    }

    async fn probe_bucket(
        &self,
        cancel: &CancellationToken,
        instance: &AssetInstance,
        spec: &AssetSpec,
    ) -> Result<BucketState> {
        self.deps
            .find_bucket_status
            .find(cancel, &instance.namespace, &spec.bucket_ref.name)
            .await
    }

    async fn delete_remote_content(
        &self,
        cancel: &CancellationToken,
        instance: &AssetInstance,
        remote_name: &str,
    ) -> Result<()> {
        let files = self
            .deps
            .store
            .list_objects(cancel, remote_name, &instance.name)
            .await?;

        if files.is_empty() {
            tracing::info!("bucket contains no asset files, nothing to delete");
            return Ok(());
        }

        self.deps
            .store
            .delete_objects(cancel, remote_name, &instance.name)
            .await?;
        self.record_normal(instance, AssetReason::Cleaned, "");

        Ok(())
    }

    fn bucket_not_ready(
        &self,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        spec: &AssetSpec,
    ) -> Outcome {
        tracing::info!(bucket = %spec.bucket_ref.name, "bucket is not ready");
        self.record_warning(instance, AssetReason::BucketNotReady, "");
        Outcome::changed(self.status_for(
            now,
            instance,
            AssetPhase::Pending,
            AssetReason::BucketNotReady,
            "",
        ))
    }

    /// A transient failure: status plus an error so the outer plane requeues.
    fn fail(
        &self,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        reason: AssetReason,
        error: Error,
    ) -> Outcome {
        let detail = error.to_string();
        self.record_warning(instance, reason, &detail);
        Outcome::failed(
            self.status_for(now, instance, AssetPhase::Failed, reason, &detail),
            error,
        )
    }

    /// A definitive content rejection: status only, no requeue.
    fn reject(
        &self,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        reason: AssetReason,
        messages: &str,
    ) -> Outcome {
        self.record_warning(instance, reason, messages);
        Outcome::changed(self.status_for(now, instance, AssetPhase::Failed, reason, messages))
    }

    fn status_for(
        &self,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        phase: AssetPhase,
        reason: AssetReason,
        detail: &str,
    ) -> CommonAssetStatus {
        CommonAssetStatus {
            phase,
            reason: Some(reason),
            message: reason.render_message(detail),
            observed_generation: instance.generation,
            last_heartbeat_time: now,
            asset_ref: AssetRef::default(),
        }
    }

    fn ready_status(
        &self,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        base_url: String,
        files: Vec<AssetFile>,
    ) -> CommonAssetStatus {
        let mut status = self.status_for(
            now,
            instance,
            AssetPhase::Ready,
            AssetReason::Uploaded,
            "",
        );
        status.asset_ref = AssetRef { base_url, files };
        status
    }

    fn record_normal(&self, instance: &AssetInstance, reason: AssetReason, detail: &str) {
        self.deps.recorder.record(
            instance,
            EventType::Normal,
            reason,
            &reason.render_message(detail),
        );
    }

    fn record_warning(&self, instance: &AssetInstance, reason: AssetReason, detail: &str) {
        self.deps.recorder.record(
            instance,
            EventType::Warning,
            reason,
            &reason.render_message(detail),
        );
    }
}

#[async_trait]
impl Handler for AssetHandler {
    async fn handle(
        &self,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        spec: &AssetSpec,
        status: &CommonAssetStatus,
    ) -> Outcome {
        let action = classify(instance, status, now, self.relist_interval);
        let _timing = TimingGuard::new(action.as_str());
        let span = reconcile_span(action.as_str(), &instance.namespace, &instance.name);

        let outcome = async {
            match action {
                Action::Delete => self.on_delete(cancel, instance, spec).await,
                Action::Checkpoint => {
                    tracing::info!(generation = instance.generation, "generation observed");
                    Outcome::changed(self.status_for(
                        now,
                        instance,
                        AssetPhase::Pending,
                        AssetReason::Scheduled,
                        "",
                    ))
                }
                Action::Reverify => self.on_ready(cancel, now, instance, spec, status).await,
                Action::Rebuild | Action::Retry => {
                    self.on_pending(cancel, now, instance, spec).await
                }
                Action::Skip => Outcome::unchanged(),
            }
        }
        .instrument(span)
        .await;

        record_reconcile(action.as_str(), outcome.result_label());
        outcome
    }
}

/// Attaches extracted metadata to the matching files.
///
/// Files without an entry keep `metadata = None`; entries for unknown
/// names are dropped. Size and order of `files` are unchanged.
fn merge_metadata(files: Vec<AssetFile>, metadatas: Vec<FileMetadata>) -> Vec<AssetFile> {
    let mut by_name: HashMap<String, serde_json::Value> = metadatas
        .into_iter()
        .map(|m| (m.name, m.metadata))
        .collect();

    files
        .into_iter()
        .map(|file| {
            let metadata = by_name.remove(&file.name);
            AssetFile {
                metadata,
                ..file
            }
        })
        .collect()
}
