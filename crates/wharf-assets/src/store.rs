//! Bucket-scoped object store operations.
//!
//! The reconciler addresses content as `bucket / prefix / filename`, where
//! the prefix is the Asset name. [`Store`] is the narrow interface the
//! pipeline consumes; [`ObjectStore`] implements it on top of any
//! [`wharf_core::StorageBackend`] by flattening the addressing onto the
//! backend's key space.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use wharf_core::StorageBackend;

use crate::error::{Error, Result};

/// Object store operations the reconciler needs.
///
/// All operations honor the cancellation token between individual object
/// requests. Implementations must be safe for concurrent use.
#[async_trait]
pub trait Store: Send + Sync {
    /// Lists object names under `bucket/prefix/`, relative to the prefix.
    async fn list_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>>;

    /// Deletes every object under `bucket/prefix/`.
    async fn delete_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
    ) -> Result<()>;

    /// Returns true iff every name in `names` exists under `bucket/prefix/`.
    async fn contains_all_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
        names: &[String],
    ) -> Result<bool>;

    /// Uploads `filenames` (relative to `base_path`) under `bucket/prefix/`.
    async fn put_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
        base_path: &Path,
        filenames: &[String],
    ) -> Result<()>;
}

/// [`Store`] implementation over a flat-key storage backend.
///
/// Keys take the form `{bucket}/{prefix}/{filename}`. The trailing slash
/// in list/delete prefixes keeps `a1` from matching `a10`.
#[derive(Debug, Clone)]
pub struct ObjectStore<B> {
    backend: Arc<B>,
}

impl<B: StorageBackend> ObjectStore<B> {
    /// Creates a store over the given backend.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    fn dir_key(bucket: &str, prefix: &str) -> String {
        format!("{bucket}/{prefix}/")
    }

    fn object_key(bucket: &str, prefix: &str, name: &str) -> String {
        format!("{bucket}/{prefix}/{name}")
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl<B: StorageBackend> Store for ObjectStore<B> {
    async fn list_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>> {
        ensure_live(cancel)?;

        let dir = Self::dir_key(bucket, prefix);
        let objects = self.backend.list(&dir).await?;

        Ok(objects
            .into_iter()
            .filter_map(|meta| meta.path.strip_prefix(&dir).map(str::to_string))
            .collect())
    }

    async fn delete_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
    ) -> Result<()> {
        ensure_live(cancel)?;

        let dir = Self::dir_key(bucket, prefix);
        let objects = self.backend.list(&dir).await?;

        for meta in objects {
            ensure_live(cancel)?;
            self.backend.delete(&meta.path).await?;
        }

        Ok(())
    }

    async fn contains_all_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
        names: &[String],
    ) -> Result<bool> {
        for name in names {
            ensure_live(cancel)?;

            let key = Self::object_key(bucket, prefix, name);
            if self.backend.head(&key).await?.is_none() {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn put_objects(
        &self,
        cancel: &CancellationToken,
        bucket: &str,
        prefix: &str,
        base_path: &Path,
        filenames: &[String],
    ) -> Result<()> {
        for name in filenames {
            ensure_live(cancel)?;

            let source = base_path.join(name);
            let data = tokio::fs::read(&source).await.map_err(|e| {
                Error::Core(wharf_core::Error::storage_with_source(
                    format!("while reading staged file {}", source.display()),
                    e,
                ))
            })?;

            let key = Self::object_key(bucket, prefix, name);
            self.backend.put(&key, Bytes::from(data)).await?;
        }

        Ok(())
    }
}
