//! Source content staging.
//!
//! [`Loader`] fetches declared source content into a scratch workspace on
//! local disk; every downstream stage (webhooks, upload) operates on that
//! workspace. The workspace is the only scoped resource the reconciler
//! owns, and its release is guaranteed by the [`Workspace`] RAII guard:
//! dropping the guard invokes [`Loader::clean`] no matter how the pipeline
//! exits.
//!
//! Loader plugins for remote protocols (git, http, archives) plug in
//! behind the same trait; this module ships [`DirLoader`], which stages
//! content from a local directory tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::asset::SourceMode;
use crate::error::{Error, Result};

/// Fetches source content into a local scratch workspace.
///
/// ## Contract
///
/// - On success, returns the workspace base path and the staged filenames
///   *relative to* that base path; the filename list is the canonical set
///   for all downstream stages.
/// - On error, the implementation must release any partially created
///   workspace before returning; callers only see a path on success.
/// - [`Loader::clean`] releases a workspace returned by `load` and must
///   tolerate paths that are already gone.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Stages the content at `url` for the Asset `name`.
    async fn load(
        &self,
        url: &str,
        name: &str,
        mode: SourceMode,
        filter: Option<&str>,
    ) -> Result<(PathBuf, Vec<String>)>;

    /// Releases a workspace returned by [`Loader::load`].
    fn clean(&self, base_path: &Path);
}

/// RAII guard owning a loader workspace.
///
/// Dropping the guard releases the workspace via the loader that created
/// it. The reconcile pipeline wraps every successful `load` in a guard
/// immediately, so early returns and cancellation cannot leak scratch
/// directories.
pub struct Workspace {
    loader: Arc<dyn Loader>,
    base_path: PathBuf,
    filenames: Vec<String>,
}

impl Workspace {
    /// Takes ownership of a loaded workspace.
    #[must_use]
    pub fn new(loader: Arc<dyn Loader>, base_path: PathBuf, filenames: Vec<String>) -> Self {
        Self {
            loader,
            base_path,
            filenames,
        }
    }

    /// The workspace base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Staged filenames, relative to the base path.
    #[must_use]
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.loader.clean(&self.base_path);
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("base_path", &self.base_path)
            .field("filenames", &self.filenames)
            .finish_non_exhaustive()
    }
}

/// Loader that stages content from a local directory tree.
///
/// The source `url` is a filesystem path, optionally prefixed with
/// `file://`. Mode semantics:
///
/// - [`SourceMode::Single`]: the URL names one file; it is staged under
///   its final path segment and the filter is ignored.
/// - [`SourceMode::Package`] / [`SourceMode::Index`]: the URL names a
///   directory; its tree is staged recursively and the optional regex
///   filter narrows the relative filenames.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirLoader;

impl DirLoader {
    /// Creates a new directory loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn source_path(url: &str) -> &Path {
        Path::new(url.strip_prefix("file://").unwrap_or(url))
    }

    fn stage_single(source: &Path, workspace: &Path) -> Result<Vec<String>> {
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::loader(format!("source url has no filename: {}", source.display())))?
            .to_string();

        std::fs::copy(source, workspace.join(&filename)).map_err(|e| {
            Error::loader_with_source(format!("while staging {}", source.display()), e)
        })?;

        Ok(vec![filename])
    }

    fn stage_tree(
        source: &Path,
        workspace: &Path,
        filter: Option<&Regex>,
    ) -> Result<Vec<String>> {
        let mut filenames = Vec::new();
        Self::stage_dir(source, workspace, Path::new(""), filter, &mut filenames)?;
        filenames.sort();
        Ok(filenames)
    }

    fn stage_dir(
        source_root: &Path,
        workspace: &Path,
        relative: &Path,
        filter: Option<&Regex>,
        filenames: &mut Vec<String>,
    ) -> Result<()> {
        let dir = source_root.join(relative);
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            Error::loader_with_source(format!("while reading directory {}", dir.display()), e)
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::loader_with_source(format!("while reading directory {}", dir.display()), e)
            })?;
            let file_type = entry.file_type().map_err(|e| {
                Error::loader_with_source(format!("while inspecting {}", entry.path().display()), e)
            })?;

            let Some(entry_name) = entry.file_name().to_str().map(str::to_string) else {
                return Err(Error::loader(format!(
                    "non-utf8 filename under {}",
                    dir.display()
                )));
            };
            let entry_relative = relative.join(&entry_name);

            if file_type.is_dir() {
                Self::stage_dir(source_root, workspace, &entry_relative, filter, filenames)?;
                continue;
            }

            let relative_name = entry_relative
                .to_str()
                .map(str::to_string)
                .ok_or_else(|| Error::loader("non-utf8 relative path".to_string()))?;

            if let Some(filter) = filter {
                if !filter.is_match(&relative_name) {
                    continue;
                }
            }

            let target = workspace.join(&entry_relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::loader_with_source(
                        format!("while creating directory {}", parent.display()),
                        e,
                    )
                })?;
            }
            std::fs::copy(entry.path(), &target).map_err(|e| {
                Error::loader_with_source(format!("while staging {}", entry.path().display()), e)
            })?;

            filenames.push(relative_name);
        }

        Ok(())
    }
}

#[async_trait]
impl Loader for DirLoader {
    async fn load(
        &self,
        url: &str,
        name: &str,
        mode: SourceMode,
        filter: Option<&str>,
    ) -> Result<(PathBuf, Vec<String>)> {
        let filter = filter
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::loader_with_source("invalid source filter", e))?;

        let source = Self::source_path(url);

        // TempDir removes itself on drop, which covers every staging error
        // below; only a fully staged workspace is kept for the caller.
        let workspace = tempfile::Builder::new()
            .prefix(&format!("wharf-{name}-"))
            .tempdir()
            .map_err(|e| Error::loader_with_source("while creating workspace", e))?;

        let filenames = match mode {
            SourceMode::Single => Self::stage_single(source, workspace.path())?,
            SourceMode::Package | SourceMode::Index => {
                Self::stage_tree(source, workspace.path(), filter.as_ref())?
            }
        };

        Ok((workspace.keep(), filenames))
    }

    fn clean(&self, base_path: &Path) {
        if let Err(e) = std::fs::remove_dir_all(base_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %base_path.display(),
                    error = %e,
                    "failed to release loader workspace"
                );
            }
        }
    }
}
