//! # wharf-assets
//!
//! Asset reconciliation engine for the wharf content delivery controller.
//!
//! An **Asset** is a declarative record pairing a remote source URL with a
//! target object-storage **Bucket** and optional processing webhooks. This
//! crate implements the state machine that drives each Asset from its
//! declaration to an uploaded artifact set in the bucket:
//!
//! - **Predicates**: Pure classification of `(instance, status, now)` into
//!   a reconcile action
//! - **Pipeline**: fetch → mutate → validate → extract metadata → upload,
//!   with partial-failure semantics distinguishing transient (retry) from
//!   definitive (do-not-retry) failures
//! - **Status**: A durable, monotonic record that survives controller
//!   restarts and is the sole coordination surface between reconciles
//!
//! ## Guarantees
//!
//! - After any successful reconcile, the Asset's prefix in the bucket
//!   either matches the declared spec (Ready) or is empty (Pending/Failed)
//! - Sticky content failures (`MutationFailed`, `ValidationFailed`) are
//!   never retried until the spec generation advances
//! - The loader workspace is released on every exit path
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use tokio_util::sync::CancellationToken;
//! use wharf_assets::config::ReconcileConfig;
//! use wharf_assets::events::LogRecorder;
//! use wharf_assets::handler::{AssetHandler, Dependencies, Handler};
//! use wharf_assets::loader::DirLoader;
//! use wharf_assets::status::CommonAssetStatus;
//! use wharf_assets::store::ObjectStore;
//! use wharf_assets::webhook::http::HttpWebhook;
//! use wharf_core::MemoryBackend;
//!
//! # async fn run(
//! #     finder: Arc<dyn wharf_assets::bucket::BucketStatusFinder>,
//! #     instance: wharf_assets::asset::AssetInstance,
//! #     spec: wharf_assets::asset::AssetSpec,
//! # ) {
//! let webhook = Arc::new(HttpWebhook::new());
//! let handler = AssetHandler::new(
//!     Dependencies {
//!         recorder: Arc::new(LogRecorder),
//!         find_bucket_status: finder,
//!         store: Arc::new(ObjectStore::new(Arc::new(MemoryBackend::new()))),
//!         loader: Arc::new(DirLoader::new()),
//!         mutator: webhook.clone(),
//!         validator: webhook.clone(),
//!         metadata_extractor: webhook,
//!     },
//!     ReconcileConfig::default(),
//! );
//!
//! let cancel = CancellationToken::new();
//! let status = CommonAssetStatus::default();
//! let outcome = handler
//!     .handle(&cancel, Utc::now(), &instance, &spec, &status)
//!     .await;
//! # let _ = outcome;
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod asset;
pub mod bucket;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod loader;
pub mod metrics;
pub mod predicate;
pub mod status;
pub mod store;
pub mod webhook;

pub use asset::{AssetInstance, AssetSource, AssetSpec, BucketRef, SourceMode, WebhookService};
pub use bucket::{BucketState, BucketStatus, BucketStatusFinder};
pub use config::ReconcileConfig;
pub use error::{Error, Result};
pub use handler::{AssetHandler, Dependencies, Handler, Outcome};
pub use status::{AssetFile, AssetPhase, AssetReason, AssetRef, CommonAssetStatus};
