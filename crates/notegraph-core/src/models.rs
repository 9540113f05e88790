//! Core data models used throughout notegraph.
//!
//! An [`Entity`] is a file-backed record keyed by its project-relative
//! `file_path`. A [`Relation`] is a typed, directed edge produced by the
//! markdown pipeline; its target may be a title that has no entity yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity assigned by the repository on first persistence.
pub type EntityId = i64;

/// `entity_type` for markdown notes.
pub const NOTE_TYPE: &str = "note";
/// `entity_type` for JSON Canvas files.
pub const CANVAS_TYPE: &str = "canvas";
/// `entity_type` for any other tracked file.
pub const FILE_TYPE: &str = "file";

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const PLAIN_CONTENT_TYPE: &str = "text/plain";

/// A persisted, file-backed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub title: String,
    /// Discriminator such as `note` or `canvas`. Rendering only.
    pub entity_type: String,
    pub content_type: String,
    /// Project-relative path with `/` separators. Unique per project.
    pub file_path: String,
    /// Checksum of the file bytes at the last successful sync.
    pub checksum: String,
    /// File creation time at first sync.
    pub created_at: DateTime<Utc>,
    /// File modification time at the last sync.
    pub updated_at: DateTime<Utc>,
}

/// An entity that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub title: String,
    pub entity_type: String,
    pub content_type: String,
    pub file_path: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewEntity {
    /// Attach the identity assigned by the repository.
    pub fn with_id(self, id: EntityId) -> Entity {
        Entity {
            id,
            title: self.title,
            entity_type: self.entity_type,
            content_type: self.content_type,
            file_path: self.file_path,
            checksum: self.checksum,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A partial update applied to an existing entity.
///
/// `None` leaves the stored value untouched. `id` and `created_at` are not
/// updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityUpdate {
    pub title: Option<String>,
    pub entity_type: Option<String>,
    pub content_type: Option<String>,
    pub file_path: Option<String>,
    pub checksum: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntityUpdate {
    pub fn is_empty(&self) -> bool {
        self == &EntityUpdate::default()
    }

    /// Apply the set fields to `entity` in place.
    pub fn apply_to(&self, entity: &mut Entity) {
        if let Some(title) = &self.title {
            entity.title = title.clone();
        }
        if let Some(entity_type) = &self.entity_type {
            entity.entity_type = entity_type.clone();
        }
        if let Some(content_type) = &self.content_type {
            entity.content_type = content_type.clone();
        }
        if let Some(file_path) = &self.file_path {
            entity.file_path = file_path.clone();
        }
        if let Some(checksum) = &self.checksum {
            entity.checksum = checksum.clone();
        }
        if let Some(updated_at) = self.updated_at {
            entity.updated_at = updated_at;
        }
    }
}

/// Target of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationTarget {
    /// Points at an existing entity.
    Resolved(EntityId),
    /// Forward reference to a title with no entity yet.
    Unresolved(String),
}

impl RelationTarget {
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            RelationTarget::Resolved(id) => Some(*id),
            RelationTarget::Unresolved(_) => None,
        }
    }
}

/// A typed, directed edge between entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub from_id: EntityId,
    pub target: RelationTarget,
    pub relation_type: String,
    pub created_at: DateTime<Utc>,
}

/// A relation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelation {
    pub from_id: EntityId,
    pub target: RelationTarget,
    /// Display name of the target; the title for resolved targets.
    pub target_name: String,
    pub relation_type: String,
    pub created_at: DateTime<Utc>,
}

/// Filesystem timestamps captured right after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

/// A search result returned from the search index.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entity_id: EntityId,
    pub title: String,
    pub file_path: String,
    pub entity_type: String,
    pub updated_at: DateTime<Utc>,
    pub score: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub snippet: String,
}
