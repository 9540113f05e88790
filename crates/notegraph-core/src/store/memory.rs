//! In-memory implementations of the boundary traits, for tests.
//!
//! [`InMemoryStore`] implements [`EntityRepository`], [`RelationSource`] and
//! [`SearchIndex`] behind `std::sync::RwLock`s. Keyword search is a naive
//! all-terms substring match. [`MemoryFileStore`] keeps file bytes in a map
//! and stamps them with wall-clock times.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::checksum::compute_checksum;
use crate::error::{FileError, IndexError, StorageError, StorageResult};
use crate::models::{
    Entity, EntityId, EntityUpdate, FileStats, NewEntity, NewRelation, Relation, RelationTarget,
    SearchHit,
};

use super::{
    normalize_path, EntityRepository, FileStore, RelationSource, SearchField, SearchIndex,
    SearchQuery,
};

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("in-memory store lock poisoned".to_string())
}

fn index_poisoned<T>(_: T) -> IndexError {
    IndexError::Unavailable("in-memory index lock poisoned".to_string())
}

/// Match `text` against a glob where `*` matches any run of characters.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[derive(Default)]
struct Records {
    last_id: EntityId,
    entities: BTreeMap<EntityId, Entity>,
}

struct StoredRelation {
    relation: Relation,
    target_name: String,
}

struct IndexedDoc {
    entity: Entity,
    content: String,
}

/// In-memory repository, relation source, and search index.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Records>,
    relations: RwLock<Vec<StoredRelation>>,
    documents: RwLock<BTreeMap<EntityId, IndexedDoc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content last indexed for `id`, if any.
    pub fn indexed_content(&self, id: EntityId) -> Option<String> {
        let docs = self.documents.read().ok()?;
        docs.get(&id).map(|d| d.content.clone())
    }

    pub fn entity_count(&self) -> usize {
        self.records.read().map(|r| r.entities.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EntityRepository for InMemoryStore {
    async fn get_by_path(&self, file_path: &str) -> StorageResult<Option<Entity>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .entities
            .values()
            .find(|e| e.file_path == file_path)
            .cloned())
    }

    async fn get_by_ids(&self, ids: &[EntityId]) -> StorageResult<Vec<Entity>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| records.entities.get(id).cloned())
            .collect())
    }

    async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Entity>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .entities
            .values()
            .filter(|e| e.title == title)
            .cloned()
            .collect())
    }

    async fn find_by_path_suffix(&self, suffix: &str) -> StorageResult<Vec<Entity>> {
        let needle = format!("/{}", suffix);
        let records = self.records.read().map_err(poisoned)?;
        let mut found: Vec<Entity> = records
            .entities
            .values()
            .filter(|e| e.file_path.ends_with(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(found)
    }

    async fn find_by_pattern(&self, pattern: &str) -> StorageResult<Vec<Entity>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut found: Vec<Entity> = records
            .entities
            .values()
            .filter(|e| glob_match(pattern, &e.file_path))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(found)
    }

    async fn find_recent(
        &self,
        since: Option<DateTime<Utc>>,
        types: &[String],
        limit: usize,
    ) -> StorageResult<Vec<Entity>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut found: Vec<Entity> = records
            .entities
            .values()
            .filter(|e| since.map_or(true, |s| e.updated_at >= s))
            .filter(|e| types.is_empty() || types.contains(&e.entity_type))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        found.truncate(limit);
        Ok(found)
    }

    async fn list_all(&self) -> StorageResult<Vec<Entity>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.entities.values().cloned().collect())
    }

    async fn add(&self, entity: NewEntity) -> StorageResult<Entity> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records
            .entities
            .values()
            .any(|e| e.file_path == entity.file_path)
        {
            return Err(StorageError::UniquenessViolation {
                file_path: entity.file_path,
            });
        }
        records.last_id += 1;
        let stored = entity.with_id(records.last_id);
        records.entities.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: EntityId, fields: &EntityUpdate) -> StorageResult<Entity> {
        let mut records = self.records.write().map_err(poisoned)?;
        if let Some(path) = &fields.file_path {
            if records
                .entities
                .values()
                .any(|e| e.id != id && &e.file_path == path)
            {
                return Err(StorageError::UniquenessViolation {
                    file_path: path.clone(),
                });
            }
        }
        let entity = records
            .entities
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("entity {}", id)))?;
        fields.apply_to(entity);
        Ok(entity.clone())
    }
}

#[async_trait]
impl RelationSource for InMemoryStore {
    async fn relations_touching(
        &self,
        ids: &[EntityId],
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<Relation>> {
        let relations = self.relations.read().map_err(poisoned)?;
        let mut found: Vec<Relation> = relations
            .iter()
            .map(|s| &s.relation)
            .filter(|r| {
                ids.contains(&r.from_id)
                    || r.target.entity_id().map_or(false, |to| ids.contains(&to))
            })
            .filter(|r| since.map_or(true, |s| r.created_at >= s))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn add_relation(&self, relation: NewRelation) -> StorageResult<Relation> {
        let mut relations = self.relations.write().map_err(poisoned)?;
        if let Some(existing) = relations.iter_mut().find(|s| {
            s.relation.from_id == relation.from_id
                && s.target_name == relation.target_name
                && s.relation.relation_type == relation.relation_type
        }) {
            if let RelationTarget::Resolved(_) = relation.target {
                existing.relation.target = relation.target;
            }
            return Ok(existing.relation.clone());
        }

        let stored = Relation {
            id: relations.len() as i64 + 1,
            from_id: relation.from_id,
            target: relation.target,
            relation_type: relation.relation_type,
            created_at: relation.created_at,
        };
        relations.push(StoredRelation {
            relation: stored.clone(),
            target_name: relation.target_name,
        });
        Ok(stored)
    }

    async fn resolve_forward_references(
        &self,
        title: &str,
        entity_id: EntityId,
    ) -> StorageResult<u64> {
        let mut relations = self.relations.write().map_err(poisoned)?;
        let mut resolved = 0;
        for stored in relations.iter_mut() {
            if matches!(&stored.relation.target, RelationTarget::Unresolved(name) if name == title)
            {
                stored.relation.target = RelationTarget::Resolved(entity_id);
                resolved += 1;
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl SearchIndex for InMemoryStore {
    async fn index(&self, entity: &Entity, content: &str) -> Result<(), IndexError> {
        let mut docs = self.documents.write().map_err(index_poisoned)?;
        docs.insert(
            entity.id,
            IndexedDoc {
                entity: entity.clone(),
                content: content.to_string(),
            },
        );
        Ok(())
    }

    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchHit>, IndexError> {
        let lowered = query.text.to_lowercase();
        let terms: Vec<&str> = lowered.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.documents.read().map_err(index_poisoned)?;
        let mut hits: Vec<SearchHit> = docs
            .values()
            .filter(|d| query.after.map_or(true, |a| d.entity.updated_at >= a))
            .filter_map(|d| {
                let haystack = match query.field {
                    SearchField::Title => d.entity.title.to_lowercase(),
                    SearchField::Text => {
                        format!("{}\n{}", d.entity.title, d.content).to_lowercase()
                    }
                };
                let occurrences: usize = terms.iter().map(|t| haystack.matches(t).count()).sum();
                if terms.iter().all(|t| haystack.contains(t)) {
                    Some(SearchHit {
                        entity_id: d.entity.id,
                        title: d.entity.title.clone(),
                        file_path: d.entity.file_path.clone(),
                        entity_type: d.entity.entity_type.clone(),
                        updated_at: d.entity.updated_at,
                        score: occurrences as f64,
                        snippet: d.content.chars().take(240).collect(),
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.updated_at.cmp(&a.updated_at))
                .then(a.entity_id.cmp(&b.entity_id))
        });
        Ok(hits
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

struct StoredFile {
    content: Vec<u8>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

/// In-memory file store. Paths are normalized like the real one.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, StoredFile>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn file_poisoned<T>(path: &str) -> impl FnOnce(T) -> FileError + '_ {
    move |_| FileError::Io {
        path: path.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "file store lock poisoned"),
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<String, FileError> {
        let path = normalize_path(path)?;
        let now = Utc::now();
        let mut files = self.files.write().map_err(file_poisoned(&path))?;
        let created_at = files.get(&path).map_or(now, |f| f.created_at);
        files.insert(
            path.clone(),
            StoredFile {
                content: content.to_vec(),
                created_at,
                modified_at: now,
            },
        );
        Ok(compute_checksum(content))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FileError> {
        let path = normalize_path(path)?;
        let files = self.files.read().map_err(file_poisoned(&path))?;
        files
            .get(&path)
            .map(|f| f.content.clone())
            .ok_or(FileError::NotFound(path.clone()))
    }

    async fn stat(&self, path: &str) -> Result<FileStats, FileError> {
        let path = normalize_path(path)?;
        let files = self.files.read().map_err(file_poisoned(&path))?;
        files
            .get(&path)
            .map(|f| FileStats {
                created_at: f.created_at,
                modified_at: f.modified_at,
                size: f.content.len() as u64,
            })
            .ok_or(FileError::NotFound(path.clone()))
    }
}
