//! Shared fixtures for wharf-assets integration tests.
//!
//! The fakes here are scripted by hand, in the same spirit as the
//! in-memory collaborators the crate ships (`MemoryBackend`,
//! `MemoryRecorder`): no mocking framework, just small thread-safe
//! structs whose behavior tests can flip between calls.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use wharf_assets::asset::{
    AssetInstance, AssetSource, AssetSpec, BucketRef, SourceMode, WebhookService,
};
use wharf_assets::bucket::{BucketState, BucketStatus, BucketStatusFinder};
use wharf_assets::config::ReconcileConfig;
use wharf_assets::error::{Error, Result};
use wharf_assets::events::MemoryRecorder;
use wharf_assets::handler::{AssetHandler, Dependencies, Handler, Outcome};
use wharf_assets::loader::Loader;
use wharf_assets::status::CommonAssetStatus;
use wharf_assets::store::ObjectStore;
use wharf_assets::webhook::{
    FileMetadata, MetadataExtractor, Mutator, Validator, WebhookOutcome,
};
use wharf_core::MemoryBackend;

// ============================================================================
// Bucket finder
// ============================================================================

enum FindResult {
    Ready(BucketStatus),
    NotReady,
    Error(String),
}

/// Bucket probe whose answer tests flip between calls.
pub struct StaticBucketFinder {
    state: Mutex<FindResult>,
}

impl StaticBucketFinder {
    pub fn ready(remote_name: &str, url: &str) -> Self {
        Self {
            state: Mutex::new(FindResult::Ready(BucketStatus {
                remote_name: remote_name.into(),
                url: url.into(),
            })),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            state: Mutex::new(FindResult::NotReady),
        }
    }

    pub fn set_ready(&self, remote_name: &str, url: &str) {
        *self.state.lock().unwrap() = FindResult::Ready(BucketStatus {
            remote_name: remote_name.into(),
            url: url.into(),
        });
    }

    pub fn set_not_ready(&self) {
        *self.state.lock().unwrap() = FindResult::NotReady;
    }

    pub fn set_error(&self, message: &str) {
        *self.state.lock().unwrap() = FindResult::Error(message.into());
    }
}

#[async_trait]
impl BucketStatusFinder for StaticBucketFinder {
    async fn find(
        &self,
        _cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<BucketState> {
        match &*self.state.lock().unwrap() {
            FindResult::Ready(status) => Ok(BucketState::Ready(status.clone())),
            FindResult::NotReady => Ok(BucketState::NotReady),
            FindResult::Error(message) => Err(Error::bucket(message.clone())),
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loader staging a fixed file set into a scratch directory per load.
///
/// Records every `clean` call so tests can assert workspace release.
pub struct FakeLoader {
    files: Vec<(String, Vec<u8>)>,
    fail: AtomicBool,
    cleaned: Mutex<Vec<PathBuf>>,
}

impl FakeLoader {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, content)| ((*name).to_string(), content.as_bytes().to_vec()))
                .collect(),
            fail: AtomicBool::new(false),
            cleaned: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn cleaned_paths(&self) -> Vec<PathBuf> {
        self.cleaned.lock().unwrap().clone()
    }
}

#[async_trait]
impl Loader for FakeLoader {
    async fn load(
        &self,
        _url: &str,
        name: &str,
        _mode: SourceMode,
        _filter: Option<&str>,
    ) -> Result<(PathBuf, Vec<String>)> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::loader("scripted loader failure"));
        }

        let workspace = tempfile::Builder::new()
            .prefix(&format!("wharf-test-{name}-"))
            .tempdir()
            .map_err(|e| Error::loader_with_source("while creating workspace", e))?
            .keep();

        let mut filenames = Vec::new();
        for (file, content) in &self.files {
            let target = workspace.join(file);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::loader_with_source("while staging", e))?;
            }
            std::fs::write(&target, content)
                .map_err(|e| Error::loader_with_source("while staging", e))?;
            filenames.push(file.clone());
        }

        Ok((workspace, filenames))
    }

    fn clean(&self, base_path: &Path) {
        let _ = std::fs::remove_dir_all(base_path);
        self.cleaned.lock().unwrap().push(base_path.to_path_buf());
    }
}

// ============================================================================
// Webhooks
// ============================================================================

#[derive(Clone)]
pub enum ScriptedCall {
    Accept,
    Reject(String),
    TransportError(String),
}

#[derive(Clone)]
pub enum ScriptedExtract {
    Metadata(Vec<(String, serde_json::Value)>),
    TransportError(String),
}

/// Webhook stages whose behavior tests flip between calls.
pub struct ScriptedWebhook {
    mutate: Mutex<ScriptedCall>,
    validate: Mutex<ScriptedCall>,
    extract: Mutex<ScriptedExtract>,
}

impl Default for ScriptedWebhook {
    fn default() -> Self {
        Self {
            mutate: Mutex::new(ScriptedCall::Accept),
            validate: Mutex::new(ScriptedCall::Accept),
            extract: Mutex::new(ScriptedExtract::Metadata(Vec::new())),
        }
    }
}

impl ScriptedWebhook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_mutate(&self, call: ScriptedCall) {
        *self.mutate.lock().unwrap() = call;
    }

    pub fn script_validate(&self, call: ScriptedCall) {
        *self.validate.lock().unwrap() = call;
    }

    pub fn script_extract(&self, call: ScriptedExtract) {
        *self.extract.lock().unwrap() = call;
    }
}

fn outcome_for(call: &ScriptedCall) -> Result<WebhookOutcome> {
    match call {
        ScriptedCall::Accept => Ok(WebhookOutcome::accepted()),
        ScriptedCall::Reject(messages) => Ok(WebhookOutcome::rejected(messages.clone())),
        ScriptedCall::TransportError(message) => Err(Error::webhook(message.clone())),
    }
}

#[async_trait]
impl Mutator for ScriptedWebhook {
    async fn mutate(
        &self,
        _cancel: &CancellationToken,
        _base_path: &Path,
        _filenames: &[String],
        _services: &[WebhookService],
    ) -> Result<WebhookOutcome> {
        outcome_for(&self.mutate.lock().unwrap())
    }
}

#[async_trait]
impl Validator for ScriptedWebhook {
    async fn validate(
        &self,
        _cancel: &CancellationToken,
        _base_path: &Path,
        _filenames: &[String],
        _services: &[WebhookService],
    ) -> Result<WebhookOutcome> {
        outcome_for(&self.validate.lock().unwrap())
    }
}

#[async_trait]
impl MetadataExtractor for ScriptedWebhook {
    async fn extract(
        &self,
        _cancel: &CancellationToken,
        _base_path: &Path,
        _filenames: &[String],
        _services: &[WebhookService],
    ) -> Result<Vec<FileMetadata>> {
        match &*self.extract.lock().unwrap() {
            ScriptedExtract::Metadata(entries) => Ok(entries
                .iter()
                .map(|(name, metadata)| FileMetadata {
                    name: name.clone(),
                    metadata: metadata.clone(),
                })
                .collect()),
            ScriptedExtract::TransportError(message) => Err(Error::webhook(message.clone())),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A fully wired handler with inspectable collaborators.
pub struct Harness {
    pub handler: AssetHandler,
    pub backend: Arc<MemoryBackend>,
    pub recorder: Arc<MemoryRecorder>,
    pub finder: Arc<StaticBucketFinder>,
    pub loader: Arc<FakeLoader>,
    pub webhook: Arc<ScriptedWebhook>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn new(relist_interval: Duration) -> Self {
        Self::with_files(relist_interval, &[("a.md", "alpha"), ("b.md", "beta")])
    }

    pub fn with_files(relist_interval: Duration, files: &[(&str, &str)]) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let recorder = Arc::new(MemoryRecorder::new());
        let finder = Arc::new(StaticBucketFinder::ready("r1", "http://cdn/r1"));
        let loader = Arc::new(FakeLoader::new(files));
        let webhook = Arc::new(ScriptedWebhook::new());

        let handler = AssetHandler::new(
            Dependencies {
                recorder: recorder.clone(),
                find_bucket_status: finder.clone(),
                store: Arc::new(ObjectStore::new(backend.clone())),
                loader: loader.clone(),
                mutator: webhook.clone(),
                validator: webhook.clone(),
                metadata_extractor: webhook.clone(),
            },
            ReconcileConfig { relist_interval },
        );

        Self {
            handler,
            backend,
            recorder,
            finder,
            loader,
            webhook,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn handle(
        &self,
        now: DateTime<Utc>,
        instance: &AssetInstance,
        spec: &AssetSpec,
        status: &CommonAssetStatus,
    ) -> Outcome {
        self.handler
            .handle(&self.cancel, now, instance, spec, status)
            .await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn fix_instance(generation: i64) -> AssetInstance {
    AssetInstance {
        namespace: "default".into(),
        name: "a1".into(),
        generation,
        deletion_timestamp: None,
        finalizers: Vec::new(),
    }
}

pub fn fix_spec() -> AssetSpec {
    AssetSpec {
        bucket_ref: BucketRef { name: "b1".into() },
        source: AssetSource {
            url: "http://x/a.zip".into(),
            mode: SourceMode::Package,
            filter: None,
            mutation_webhook_service: Vec::new(),
            validation_webhook_service: Vec::new(),
            metadata_webhook_service: Vec::new(),
        },
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}
