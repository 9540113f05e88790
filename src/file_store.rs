//! Project-root-scoped file access on the local filesystem.
//!
//! Paths are normalized lexically first (no `..` above the root, no absolute
//! paths), then the deepest existing ancestor is canonicalized so a symlinked
//! directory inside the project cannot redirect a write outside it.
//!
//! Writes go to a temp file in the destination directory and are renamed into
//! place, so readers never observe a partially written file.
//!
//! Every operation runs on tokio's blocking pool.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notegraph_core::checksum::compute_checksum;
use notegraph_core::error::FileError;
use notegraph_core::models::FileStats;
use notegraph_core::store::{normalize_path, FileStore};
use tempfile::NamedTempFile;

pub struct LocalFileStore {
    root: PathBuf,
}

fn io_error(path: &str) -> impl FnOnce(std::io::Error) -> FileError + '_ {
    move |source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(path.to_string())
        } else {
            FileError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

impl LocalFileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FileError> {
        let display = root.as_ref().display().to_string();
        fs::create_dir_all(root.as_ref()).map_err(io_error(&display))?;
        let root = root.as_ref().canonicalize().map_err(io_error(&display))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `op` with the resolved location of `path` on the blocking pool.
    async fn with_resolved<T, F>(&self, path: &str, op: F) -> Result<T, FileError>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf, &str) -> Result<T, FileError> + Send + 'static,
    {
        let root = self.root.clone();
        let owned = path.to_string();
        tokio::task::spawn_blocking(move || {
            let full = resolve(&root, &owned)?;
            op(full, &owned)
        })
        .await
        .map_err(|e| FileError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?
    }
}

/// Map a project-relative path to its location under `root`.
fn resolve(root: &Path, path: &str) -> Result<PathBuf, FileError> {
    let relative = normalize_path(path)?;
    let full = root.join(&relative);

    let mut ancestor = full.as_path();
    loop {
        if ancestor.exists() {
            let canonical = ancestor.canonicalize().map_err(io_error(path))?;
            if !canonical.starts_with(root) {
                return Err(FileError::PathEscape(path.to_string()));
            }
            break;
        }
        match ancestor.parent() {
            Some(parent) => ancestor = parent,
            None => break,
        }
    }

    Ok(full)
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<String, FileError> {
        let content = content.to_vec();
        self.with_resolved(path, move |full, path| {
            let parent = full
                .parent()
                .ok_or_else(|| FileError::PathEscape(path.to_string()))?;
            fs::create_dir_all(parent).map_err(io_error(path))?;

            let mut tmp = NamedTempFile::new_in(parent).map_err(io_error(path))?;
            tmp.write_all(&content).map_err(io_error(path))?;
            tmp.as_file().sync_all().map_err(io_error(path))?;
            tmp.persist(&full).map_err(|e| io_error(path)(e.error))?;

            Ok(compute_checksum(&content))
        })
        .await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileError> {
        self.with_resolved(path, |full, path| fs::read(&full).map_err(io_error(path)))
            .await
    }

    async fn stat(&self, path: &str) -> Result<FileStats, FileError> {
        self.with_resolved(path, |full, path| {
            let metadata = fs::metadata(&full).map_err(io_error(path))?;
            let modified = metadata.modified().map_err(io_error(path))?;
            // Birth time is not available on every filesystem.
            let created = metadata.created().unwrap_or(modified);

            Ok(FileStats {
                created_at: DateTime::<Utc>::from(created),
                modified_at: DateTime::<Utc>::from(modified),
                size: metadata.len(),
            })
        })
        .await
    }
}
