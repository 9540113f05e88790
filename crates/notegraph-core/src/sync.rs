//! Entity synchronization: file → record → search index.
//!
//! A sync runs a fixed pipeline of fallible steps, each awaited before the
//! next starts:
//!
//! 1. **write** the content through the [`FileStore`] (returns the checksum)
//! 2. **stat** the written file for its creation/modification times
//! 3. **lookup** the record by `file_path`
//! 4. **upsert**: create a new entity, or update the mutable fields of the
//!    existing one in place (identity and `created_at` are preserved)
//! 5. **index** the entity into the [`SearchIndex`]
//! 6. **resolve** forward references to the new title (creates only)
//!
//! A failed write or stat aborts before any record is touched. Once the
//! record is written nothing after it is fatal: a failed index is returned
//! as [`SyncOutcome::index_warning`] and the entry can be rebuilt with
//! [`EntitySynchronizer::reindex`]; a failed resolution is returned as
//! [`SyncOutcome::reference_warning`] and the relations stay unresolved.
//!
//! There is no locking here. Two concurrent syncs of the same new path can
//! both see "absent"; the repository's uniqueness constraint rejects the
//! second create, which surfaces as [`SyncError::ConcurrentCreateConflict`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checksum::compute_checksum;
use crate::error::{StorageError, SyncError};
use crate::models::{Entity, EntityUpdate, FileStats, NewEntity};
use crate::store::{normalize_path, EntityRepository, FileStore, RelationSource, SearchIndex};

/// Input to a single sync.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Project-relative destination path.
    pub file_path: String,
    pub content: Vec<u8>,
    pub title: String,
    pub entity_type: String,
    pub content_type: String,
}

/// What a sync did to the entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    /// Re-import found the record already matching the file.
    Unchanged,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncAction::Created => "Created",
            SyncAction::Updated => "Updated",
            SyncAction::Unchanged => "Unchanged",
        };
        f.write_str(label)
    }
}

/// Result of a successful sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub entity: Entity,
    pub action: SyncAction,
    /// Set when the record was written but indexing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_warning: Option<String>,
    /// Set when a new entity was written but forward references to its
    /// title could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_warning: Option<String>,
}

/// Result of [`EntitySynchronizer::reindex_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    /// `(file_path, error)` for every entity that could not be re-indexed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<(String, String)>,
}

/// Orchestrates file, record, and index writes for one project.
pub struct EntitySynchronizer {
    files: Arc<dyn FileStore>,
    entities: Arc<dyn EntityRepository>,
    relations: Arc<dyn RelationSource>,
    index: Arc<dyn SearchIndex>,
}

impl EntitySynchronizer {
    pub fn new(
        files: Arc<dyn FileStore>,
        entities: Arc<dyn EntityRepository>,
        relations: Arc<dyn RelationSource>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            files,
            entities,
            relations,
            index,
        }
    }

    /// Write `request.content` and bring the record and index in line with it.
    pub async fn sync(&self, request: SyncRequest) -> Result<SyncOutcome, SyncError> {
        let file_path = normalize_path(&request.file_path).map_err(SyncError::from_write)?;

        let checksum = self
            .files
            .write_file(&file_path, &request.content)
            .await
            .map_err(SyncError::from_write)?;
        debug!(file_path = %file_path, checksum = %checksum, "file written");

        let stats = self
            .files
            .stat(&file_path)
            .await
            .map_err(SyncError::from_write)?;

        let (entity, action) = self
            .upsert_record(
                &file_path,
                Some(&request.title),
                &request.entity_type,
                &request.content_type,
                checksum,
                &stats,
            )
            .await?;

        let index_warning = self.index_entity(&entity, &request.content).await;
        let reference_warning = self.resolve_references(&entity, action).await;

        info!(
            file_path = %entity.file_path,
            entity_id = entity.id,
            action = %action,
            indexed = index_warning.is_none(),
            "entity synced"
        );
        Ok(SyncOutcome {
            entity,
            action,
            index_warning,
            reference_warning,
        })
    }

    /// Sync a file that already exists on disk, without rewriting it.
    ///
    /// Used when files are edited outside notegraph. An existing record keeps
    /// its title; a new one is titled by [`title_from_path`]. If the record's
    /// checksum already matches, nothing is written and the action is
    /// [`SyncAction::Unchanged`].
    pub async fn reimport(
        &self,
        file_path: &str,
        entity_type: &str,
        content_type: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let file_path = normalize_path(file_path).map_err(SyncError::from_read)?;

        let content = self
            .files
            .read_file(&file_path)
            .await
            .map_err(SyncError::from_read)?;
        let checksum = compute_checksum(&content);

        let stats = self
            .files
            .stat(&file_path)
            .await
            .map_err(SyncError::from_read)?;

        if let Some(existing) = self.entities.get_by_path(&file_path).await? {
            if existing.checksum == checksum {
                debug!(file_path = %file_path, "checksum unchanged, skipping");
                return Ok(SyncOutcome {
                    entity: existing,
                    action: SyncAction::Unchanged,
                    index_warning: None,
                    reference_warning: None,
                });
            }
        }

        let (entity, action) = self
            .upsert_record(&file_path, None, entity_type, content_type, checksum, &stats)
            .await?;
        let index_warning = self.index_entity(&entity, &content).await;
        let reference_warning = self.resolve_references(&entity, action).await;

        info!(file_path = %entity.file_path, entity_id = entity.id, action = %action, "entity re-imported");
        Ok(SyncOutcome {
            entity,
            action,
            index_warning,
            reference_warning,
        })
    }

    /// Rebuild the index entry for `entity` from the file on disk.
    pub async fn reindex(&self, entity: &Entity) -> Result<(), SyncError> {
        let content = self
            .files
            .read_file(&entity.file_path)
            .await
            .map_err(SyncError::from_read)?;
        self.index
            .index(entity, &String::from_utf8_lossy(&content))
            .await?;
        Ok(())
    }

    /// Re-index every entity. Failures are collected, not fatal.
    pub async fn reindex_all(&self) -> Result<ReindexReport, SyncError> {
        let mut report = ReindexReport::default();
        for entity in self.entities.list_all().await? {
            match self.reindex(&entity).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    warn!(file_path = %entity.file_path, error = %e, "re-index failed");
                    report.failed.push((entity.file_path.clone(), e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// `title: None` keeps the stored title on update and derives one from
    /// the path on create.
    async fn upsert_record(
        &self,
        file_path: &str,
        title: Option<&str>,
        entity_type: &str,
        content_type: &str,
        checksum: String,
        stats: &FileStats,
    ) -> Result<(Entity, SyncAction), SyncError> {
        match self.entities.get_by_path(file_path).await? {
            Some(existing) => {
                let fields = EntityUpdate {
                    title: title.map(str::to_string),
                    entity_type: Some(entity_type.to_string()),
                    content_type: Some(content_type.to_string()),
                    file_path: None,
                    checksum: Some(checksum),
                    updated_at: Some(stats.modified_at),
                };
                let entity = self.entities.update(existing.id, &fields).await?;
                Ok((entity, SyncAction::Updated))
            }
            None => {
                let new_entity = NewEntity {
                    title: title.map_or_else(|| title_from_path(file_path), str::to_string),
                    entity_type: entity_type.to_string(),
                    content_type: content_type.to_string(),
                    file_path: file_path.to_string(),
                    checksum,
                    created_at: stats.created_at,
                    updated_at: stats.modified_at,
                };
                let entity = match self.entities.add(new_entity).await {
                    Ok(entity) => entity,
                    Err(StorageError::UniquenessViolation { file_path }) => {
                        warn!(file_path = %file_path, "lost create race");
                        return Err(SyncError::ConcurrentCreateConflict { file_path });
                    }
                    Err(e) => return Err(e.into()),
                };
                Ok((entity, SyncAction::Created))
            }
        }
    }

    async fn resolve_references(&self, entity: &Entity, action: SyncAction) -> Option<String> {
        if action != SyncAction::Created {
            return None;
        }
        match self
            .relations
            .resolve_forward_references(&entity.title, entity.id)
            .await
        {
            Ok(0) => None,
            Ok(resolved) => {
                debug!(title = %entity.title, resolved, "resolved forward references");
                None
            }
            Err(e) => {
                warn!(title = %entity.title, error = %e, "forward reference resolution failed; record kept");
                Some(e.to_string())
            }
        }
    }

    async fn index_entity(&self, entity: &Entity, content: &[u8]) -> Option<String> {
        match self
            .index
            .index(entity, &String::from_utf8_lossy(content))
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(file_path = %entity.file_path, error = %e, "index update failed; record kept");
                Some(e.to_string())
            }
        }
    }
}

/// Display title for a file found on disk: the stem for markdown, the full
/// file name otherwise (`Flow.canvas` stays `Flow.canvas`).
pub fn title_from_path(file_path: &str) -> String {
    let path = Path::new(file_path);
    let markdown = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    );
    let name = if markdown {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FileError, IndexError, StorageResult};
    use crate::models::{EntityId, NewRelation, Relation, RelationTarget, SearchHit};
    use crate::store::memory::{InMemoryStore, MemoryFileStore};
    use crate::store::SearchQuery;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    fn synchronizer(
        files: Arc<MemoryFileStore>,
        store: Arc<InMemoryStore>,
    ) -> EntitySynchronizer {
        EntitySynchronizer::new(files, store.clone(), store.clone(), store)
    }

    fn note(path: &str, content: &str, title: &str) -> SyncRequest {
        SyncRequest {
            file_path: path.to_string(),
            content: content.as_bytes().to_vec(),
            title: title.to_string(),
            entity_type: "note".to_string(),
            content_type: "text/markdown".to_string(),
        }
    }

    struct UnavailableIndex;

    #[async_trait]
    impl SearchIndex for UnavailableIndex {
        async fn index(&self, _: &Entity, _: &str) -> Result<(), IndexError> {
            Err(IndexError::Unavailable("index offline".to_string()))
        }

        async fn search(&self, _: &SearchQuery<'_>) -> Result<Vec<SearchHit>, IndexError> {
            Err(IndexError::Unavailable("index offline".to_string()))
        }
    }

    /// A repository whose lookups never see existing records, the way a
    /// sync that lost a race observes the store.
    struct StaleLookup(Arc<InMemoryStore>);

    #[async_trait]
    impl EntityRepository for StaleLookup {
        async fn get_by_path(&self, _: &str) -> StorageResult<Option<Entity>> {
            Ok(None)
        }
        async fn get_by_ids(&self, ids: &[EntityId]) -> StorageResult<Vec<Entity>> {
            self.0.get_by_ids(ids).await
        }
        async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Entity>> {
            self.0.find_by_title(title).await
        }
        async fn find_by_path_suffix(&self, suffix: &str) -> StorageResult<Vec<Entity>> {
            self.0.find_by_path_suffix(suffix).await
        }
        async fn find_by_pattern(&self, pattern: &str) -> StorageResult<Vec<Entity>> {
            self.0.find_by_pattern(pattern).await
        }
        async fn find_recent(
            &self,
            since: Option<DateTime<Utc>>,
            types: &[String],
            limit: usize,
        ) -> StorageResult<Vec<Entity>> {
            self.0.find_recent(since, types, limit).await
        }
        async fn list_all(&self) -> StorageResult<Vec<Entity>> {
            self.0.list_all().await
        }
        async fn add(&self, entity: NewEntity) -> StorageResult<Entity> {
            self.0.add(entity).await
        }
        async fn update(&self, id: EntityId, fields: &EntityUpdate) -> StorageResult<Entity> {
            self.0.update(id, fields).await
        }
    }

    /// Relations that can be read and added but not resolved.
    struct BusyRelations(Arc<InMemoryStore>);

    #[async_trait]
    impl RelationSource for BusyRelations {
        async fn relations_touching(
            &self,
            ids: &[EntityId],
            since: Option<DateTime<Utc>>,
        ) -> StorageResult<Vec<Relation>> {
            self.0.relations_touching(ids, since).await
        }
        async fn add_relation(&self, relation: NewRelation) -> StorageResult<Relation> {
            self.0.add_relation(relation).await
        }
        async fn resolve_forward_references(&self, _: &str, _: EntityId) -> StorageResult<u64> {
            Err(StorageError::Backend("db busy".to_string()))
        }
    }

    #[tokio::test]
    async fn test_create_then_update_keeps_identity() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let first = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap();
        assert_eq!(first.action, SyncAction::Created);
        assert_eq!(first.entity.id, 1);
        assert_eq!(first.entity.checksum, compute_checksum(b"# A"));

        let second = sync
            .sync(note("notes/a.md", "# A updated", "A"))
            .await
            .unwrap();
        assert_eq!(second.action, SyncAction::Updated);
        assert_eq!(second.entity.id, first.entity.id);
        assert_eq!(second.entity.created_at, first.entity.created_at);
        assert_ne!(second.entity.checksum, first.entity.checksum);
        assert_eq!(store.entity_count(), 1);
    }

    #[tokio::test]
    async fn test_resync_identical_content_is_idempotent() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let first = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap();
        let second = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap();

        assert_eq!(second.action, SyncAction::Updated);
        assert_eq!(second.entity.id, first.entity.id);
        assert_eq!(second.entity.checksum, first.entity.checksum);
    }

    #[tokio::test]
    async fn test_checksum_matches_stored_bytes() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        for content in ["one", "two", "three"] {
            let outcome = sync.sync(note("x/y.md", content, "Y")).await.unwrap();
            let on_disk = files.read_file("x/y.md").await.unwrap();
            assert_eq!(outcome.entity.checksum, compute_checksum(&on_disk));
        }
    }

    #[tokio::test]
    async fn test_equivalent_paths_share_one_record() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        sync.sync(note("notes/a.md", "1", "A")).await.unwrap();
        sync.sync(note("./notes//a.md", "2", "A")).await.unwrap();
        sync.sync(note("notes/tmp/../a.md", "3", "A")).await.unwrap();
        sync.sync(note("notes/b.md", "4", "B")).await.unwrap();

        assert_eq!(store.entity_count(), 2);
    }

    #[tokio::test]
    async fn test_path_escape_writes_nothing() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let err = sync
            .sync(note("../outside.md", "x", "X"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::PathEscape(_)));
        assert_eq!(store.entity_count(), 0);
    }

    #[tokio::test]
    async fn test_index_failure_is_reported_not_fatal() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = EntitySynchronizer::new(
            files.clone(),
            store.clone(),
            store.clone(),
            Arc::new(UnavailableIndex),
        );

        let outcome = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap();
        assert_eq!(outcome.action, SyncAction::Created);
        assert!(outcome
            .index_warning
            .as_deref()
            .unwrap_or_default()
            .contains("index offline"));
        assert!(store.get_by_path("notes/a.md").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sync_indexes_latest_content() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let outcome = sync.sync(note("notes/a.md", "first", "A")).await.unwrap();
        sync.sync(note("notes/a.md", "second", "A")).await.unwrap();
        assert_eq!(
            store.indexed_content(outcome.entity.id).as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_lost_create_race_is_a_conflict() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let winner = synchronizer(files.clone(), store.clone());
        let loser = EntitySynchronizer::new(
            files.clone(),
            Arc::new(StaleLookup(store.clone())),
            store.clone(),
            store.clone(),
        );

        winner.sync(note("notes/a.md", "winner", "A")).await.unwrap();
        let err = loser
            .sync(note("notes/a.md", "loser", "A"))
            .await
            .unwrap_err();
        match err {
            SyncError::ConcurrentCreateConflict { file_path } => assert_eq!(file_path, "notes/a.md"),
            other => panic!("expected ConcurrentCreateConflict, got {:?}", other),
        }
        assert_eq!(store.entity_count(), 1);

        // Retrying as an update through a fresh lookup succeeds.
        let retried = winner.sync(note("notes/a.md", "loser", "A")).await.unwrap();
        assert_eq!(retried.action, SyncAction::Updated);
    }

    #[tokio::test]
    async fn test_create_resolves_forward_references() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let a = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap().entity;
        store
            .add_relation(NewRelation {
                from_id: a.id,
                target: RelationTarget::Unresolved("B".to_string()),
                target_name: "B".to_string(),
                relation_type: "relates_to".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let b = sync.sync(note("notes/b.md", "# B", "B")).await.unwrap().entity;
        let rels = store.relations_touching(&[a.id], None).await.unwrap();
        assert_eq!(rels[0].target, RelationTarget::Resolved(b.id));
    }

    #[tokio::test]
    async fn test_reference_failure_still_indexes_new_entity() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = EntitySynchronizer::new(
            files.clone(),
            store.clone(),
            Arc::new(BusyRelations(store.clone())),
            store.clone(),
        );

        let outcome = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap();
        assert_eq!(outcome.action, SyncAction::Created);
        assert!(outcome.index_warning.is_none());
        assert!(outcome
            .reference_warning
            .as_deref()
            .unwrap_or_default()
            .contains("db busy"));
        assert_eq!(
            store.indexed_content(outcome.entity.id).as_deref(),
            Some("# A")
        );

        let again = sync.sync(note("notes/a.md", "# A", "A")).await.unwrap();
        assert_eq!(again.action, SyncAction::Updated);
        assert!(again.reference_warning.is_none());
    }

    #[tokio::test]
    async fn test_reimport_keeps_stored_title() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let canvas = SyncRequest {
            file_path: "d/Flow.canvas".to_string(),
            content: br#"{"nodes":[],"edges":[]}"#.to_vec(),
            title: "Flow.canvas".to_string(),
            entity_type: "canvas".to_string(),
            content_type: "application/json".to_string(),
        };
        let created = sync.sync(canvas).await.unwrap();
        sync.sync(note("notes/a-b.md", "# A/B", "A/B")).await.unwrap();

        files
            .write_file("d/Flow.canvas", br#"{"nodes":[{"id":"n1"}],"edges":[]}"#)
            .await
            .unwrap();
        files.write_file("notes/a-b.md", b"# A/B edited").await.unwrap();

        let canvas = sync
            .reimport("d/Flow.canvas", "canvas", "application/json")
            .await
            .unwrap();
        assert_eq!(canvas.action, SyncAction::Updated);
        assert_eq!(canvas.entity.id, created.entity.id);
        assert_eq!(canvas.entity.title, "Flow.canvas");

        let edited = sync
            .reimport("notes/a-b.md", "note", "text/markdown")
            .await
            .unwrap();
        assert_eq!(edited.action, SyncAction::Updated);
        assert_eq!(edited.entity.title, "A/B");
    }

    #[tokio::test]
    async fn test_reimport_detects_changes_by_checksum() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        files.write_file("notes/External Note.md", b"v1").await.unwrap();
        let created = sync
            .reimport("notes/External Note.md", "note", "text/markdown")
            .await
            .unwrap();
        assert_eq!(created.action, SyncAction::Created);
        assert_eq!(created.entity.title, "External Note");

        let unchanged = sync
            .reimport("notes/External Note.md", "note", "text/markdown")
            .await
            .unwrap();
        assert_eq!(unchanged.action, SyncAction::Unchanged);

        files.write_file("notes/External Note.md", b"v2").await.unwrap();
        let updated = sync
            .reimport("notes/External Note.md", "note", "text/markdown")
            .await
            .unwrap();
        assert_eq!(updated.action, SyncAction::Updated);
        assert_eq!(updated.entity.id, created.entity.id);
        assert_eq!(updated.entity.checksum, compute_checksum(b"v2"));
    }

    #[tokio::test]
    async fn test_reimport_missing_file_fails_without_record() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let sync = synchronizer(files.clone(), store.clone());

        let err = sync
            .reimport("notes/ghost.md", "note", "text/markdown")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ReadFailed(FileError::NotFound(_))));
        assert_eq!(store.entity_count(), 0);
    }

    #[tokio::test]
    async fn test_reindex_all_recovers_stale_index() {
        let files = Arc::new(MemoryFileStore::new());
        let store = Arc::new(InMemoryStore::new());
        let offline = EntitySynchronizer::new(
            files.clone(),
            store.clone(),
            store.clone(),
            Arc::new(UnavailableIndex),
        );
        let outcome = offline.sync(note("notes/a.md", "# A", "A")).await.unwrap();
        assert!(store.indexed_content(outcome.entity.id).is_none());

        let report = synchronizer(files, store.clone()).reindex_all().await.unwrap();
        assert_eq!(report.indexed, 1);
        assert!(report.failed.is_empty());
        assert_eq!(
            store.indexed_content(outcome.entity.id).as_deref(),
            Some("# A")
        );
    }

    #[test]
    fn test_title_from_path() {
        assert_eq!(title_from_path("notes/My Note.md"), "My Note");
        assert_eq!(title_from_path("diagrams/flow.canvas"), "flow.canvas");
        assert_eq!(title_from_path("data/export.json"), "export.json");
    }
}
