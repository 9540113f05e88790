//! Error types for the synchronization and context layers.

use thiserror::Error;

/// Failures raised by a [`FileStore`](crate::store::FileStore).
#[derive(Error, Debug)]
pub enum FileError {
    /// The path resolves outside the project root.
    #[error("path escapes project root: {0}")]
    PathEscape(String),

    /// The path does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Any other I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures raised by an entity repository or relation source.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A record already exists for this file path.
    #[error("an entity already exists for file path: {file_path}")]
    UniquenessViolation { file_path: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// Database or driver failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures raised by a [`SearchIndex`](crate::store::SearchIndex).
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("search index unavailable: {0}")]
    Unavailable(String),
}

/// Fatal outcomes of an entity sync.
///
/// Index failures during `sync` are not in this list; they are reported on
/// the successful [`SyncOutcome`](crate::sync::SyncOutcome) instead.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Rejected before any write.
    #[error("refusing to write outside the project root: {0}")]
    PathEscape(String),

    /// The file could not be written; nothing was committed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] FileError),

    /// The file could not be read back for re-import or re-indexing.
    #[error("read failed: {0}")]
    ReadFailed(#[source] FileError),

    /// Another sync created the record first. Retry as an update.
    #[error("concurrent create for {file_path}; retry as an update")]
    ConcurrentCreateConflict { file_path: String },

    /// Explicit re-indexing failed.
    #[error(transparent)]
    IndexUnavailable(#[from] IndexError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    pub(crate) fn from_write(err: FileError) -> Self {
        match err {
            FileError::PathEscape(path) => SyncError::PathEscape(path),
            other => SyncError::WriteFailed(other),
        }
    }

    pub(crate) fn from_read(err: FileError) -> Self {
        match err {
            FileError::PathEscape(path) => SyncError::PathEscape(path),
            other => SyncError::ReadFailed(other),
        }
    }
}

/// Failures raised while building a context.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The starting reference is malformed.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
