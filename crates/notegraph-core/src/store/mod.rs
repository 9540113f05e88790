//! Boundary traits between the core algorithms and their collaborators.
//!
//! | Trait | Role |
//! |-------|------|
//! | [`FileStore`] | Scoped file writes, reads, and stats under a project root |
//! | [`EntityRepository`] | Entity records keyed by unique `file_path` |
//! | [`RelationSource`] | Relations persisted by the markdown pipeline |
//! | [`SearchIndex`] | Full-text index keyed by entity identity |
//!
//! Implementations must be `Send + Sync`. The application implements these
//! over SQLite and the local filesystem; [`memory`] holds in-memory versions.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FileError, IndexError, StorageResult};
use crate::models::{
    Entity, EntityId, EntityUpdate, FileStats, NewEntity, NewRelation, Relation, SearchHit,
};

/// Project-root-scoped file access.
///
/// Paths are project-relative. Implementations reject paths that escape the
/// root with [`FileError::PathEscape`] and write atomically: readers see the
/// old bytes or the new bytes, never a partial file.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `content` to `path`, creating parent directories. Returns the
    /// checksum of the written bytes.
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<String, FileError>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileError>;

    /// Creation and modification times of `path`.
    async fn stat(&self, path: &str) -> Result<FileStats, FileError>;
}

/// CRUD over entity records.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn get_by_path(&self, file_path: &str) -> StorageResult<Option<Entity>>;

    /// Fetch entities by id, in the order requested. Missing ids are skipped.
    async fn get_by_ids(&self, ids: &[EntityId]) -> StorageResult<Vec<Entity>>;

    /// Entities whose title equals `title` exactly, by id.
    async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Entity>>;

    /// Entities whose path ends with `/<suffix>`, by path.
    async fn find_by_path_suffix(&self, suffix: &str) -> StorageResult<Vec<Entity>>;

    /// Entities whose path matches a `*` glob, by path.
    async fn find_by_pattern(&self, pattern: &str) -> StorageResult<Vec<Entity>>;

    /// Entities updated at or after `since`, newest first. An empty `types`
    /// slice matches every entity type.
    async fn find_recent(
        &self,
        since: Option<DateTime<Utc>>,
        types: &[String],
        limit: usize,
    ) -> StorageResult<Vec<Entity>>;

    async fn list_all(&self) -> StorageResult<Vec<Entity>>;

    /// Persist a new entity and assign its id.
    ///
    /// Fails with [`StorageError::UniquenessViolation`](crate::error::StorageError::UniquenessViolation)
    /// when a record already exists for the path.
    async fn add(&self, entity: NewEntity) -> StorageResult<Entity>;

    /// Apply a partial update and return the stored entity.
    async fn update(&self, id: EntityId, fields: &EntityUpdate) -> StorageResult<Entity>;
}

/// Read access to the relation graph, plus the writes the sync layer needs.
#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Relations with either endpoint in `ids`, created at or after `since`,
    /// ordered by `(created_at, id)`.
    async fn relations_touching(
        &self,
        ids: &[EntityId],
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<Relation>>;

    /// Record a relation. Re-adding the same `(from, target name, type)`
    /// returns the existing relation.
    async fn add_relation(&self, relation: NewRelation) -> StorageResult<Relation>;

    /// Point unresolved relations targeting `title` at `entity_id`.
    /// Returns how many were resolved.
    async fn resolve_forward_references(
        &self,
        title: &str,
        entity_id: EntityId,
    ) -> StorageResult<u64>;
}

/// Which indexed field a search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Text,
    Title,
}

/// Bundles the inputs of a single search.
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub text: &'a str,
    pub field: SearchField,
    /// Only entities updated at or after this instant.
    pub after: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

/// Full-text index over entity content.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the document for `entity`.
    async fn index(&self, entity: &Entity, content: &str) -> Result<(), IndexError>;

    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchHit>, IndexError>;
}

/// Normalize a project-relative path lexically.
///
/// Separators become `/`, `.` segments are dropped and `..` segments are
/// folded. Absolute paths and paths that climb above the root are rejected.
pub fn normalize_path(path: &str) -> Result<String, FileError> {
    let escape = || FileError::PathEscape(path.to_string());

    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(escape());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or_else(escape)?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(escape());
    }
    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("notes/a.md").unwrap(), "notes/a.md");
        assert_eq!(normalize_path("./notes//a.md").unwrap(), "notes/a.md");
        assert_eq!(normalize_path("notes\\sub\\a.md").unwrap(), "notes/sub/a.md");
        assert_eq!(normalize_path("notes/tmp/../a.md").unwrap(), "notes/a.md");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        for bad in ["../a.md", "notes/../../a.md", "/etc/passwd", "C:\\x.md", "", "."] {
            assert!(
                matches!(normalize_path(bad), Err(FileError::PathEscape(_))),
                "expected PathEscape for {:?}",
                bad
            );
        }
    }
}
