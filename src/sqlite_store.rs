//! SQLite implementation of the core storage traits.
//!
//! One [`SqliteStore`] is scoped to a single project: every entity query
//! filters on `entities.project`, and relations are scoped through their
//! `from_id` entity. Timestamps are stored as unix milliseconds.
//!
//! | Trait | Tables |
//! |-------|--------|
//! | [`EntityRepository`] | `entities` |
//! | [`RelationSource`] | `relations` (`to_id` NULL for forward references) |
//! | [`SearchIndex`] | `search_index` (FTS5) joined to `entities` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notegraph_core::error::{IndexError, StorageError, StorageResult};
use notegraph_core::models::{
    Entity, EntityId, EntityUpdate, NewEntity, NewRelation, Relation, RelationTarget, SearchHit,
};
use notegraph_core::store::{
    EntityRepository, RelationSource, SearchField, SearchIndex, SearchQuery,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

const ENTITY_COLUMNS: &str =
    "id, title, entity_type, content_type, file_path, checksum, created_at, updated_at";

const RELATION_COLUMNS: &str = "id, from_id, to_id, to_name, relation_type, created_at";

/// Bound on ids per `IN (...)` list.
const ID_BATCH: usize = 500;

pub struct SqliteStore {
    pool: SqlitePool,
    project: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, project: impl Into<String>) -> Self {
        Self {
            pool,
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    async fn get_by_id(&self, id: EntityId) -> StorageResult<Entity> {
        let sql = format!(
            "SELECT {} FROM entities WHERE project = ? AND id = ?",
            ENTITY_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&self.project)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| entity_from_row(&row))
            .ok_or_else(|| StorageError::NotFound(format!("entity {}", id)))
    }
}

fn backend(err: sqlx::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn unavailable(err: sqlx::Error) -> IndexError {
    IndexError::Unavailable(err.to_string())
}

/// Map a write error, turning unique-constraint failures into
/// [`StorageError::UniquenessViolation`].
fn write_error(file_path: &str) -> impl FnOnce(sqlx::Error) -> StorageError + '_ {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StorageError::UniquenessViolation {
                    file_path: file_path.to_string(),
                };
            }
        }
        backend(err)
    }
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn entity_from_row(row: &SqliteRow) -> Entity {
    Entity {
        id: row.get("id"),
        title: row.get("title"),
        entity_type: row.get("entity_type"),
        content_type: row.get("content_type"),
        file_path: row.get("file_path"),
        checksum: row.get("checksum"),
        created_at: from_millis(row.get("created_at")),
        updated_at: from_millis(row.get("updated_at")),
    }
}

fn relation_from_row(row: &SqliteRow) -> Relation {
    let to_id: Option<i64> = row.get("to_id");
    let target = match to_id {
        Some(id) => RelationTarget::Resolved(id),
        None => RelationTarget::Unresolved(row.get("to_name")),
    };
    Relation {
        id: row.get("id"),
        from_id: row.get("from_id"),
        target,
        relation_type: row.get("relation_type"),
        created_at: from_millis(row.get("created_at")),
    }
}

/// Escape GLOB metacharacters other than `*`.
fn glob_literal(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => out.push_str("[[]"),
            '?' => out.push_str("[?]"),
            other => out.push(other),
        }
    }
    out
}

/// Build an FTS5 MATCH expression requiring every term. Terms are quoted so
/// user input cannot inject query syntax.
fn fts_expression(text: &str, field: SearchField) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .map(|t| match field {
            SearchField::Title => format!("title : {}", t),
            SearchField::Text => t,
        })
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

#[async_trait]
impl EntityRepository for SqliteStore {
    async fn get_by_path(&self, file_path: &str) -> StorageResult<Option<Entity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE project = ? AND file_path = ?",
            ENTITY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&self.project)
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| entity_from_row(&r)))
    }

    async fn get_by_ids(&self, ids: &[EntityId]) -> StorageResult<Vec<Entity>> {
        let mut found: HashMap<EntityId, Entity> = HashMap::new();
        for batch in ids.chunks(ID_BATCH) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {} FROM entities WHERE project = ",
                ENTITY_COLUMNS
            ));
            builder.push_bind(&self.project).push(" AND id IN (");
            let mut separated = builder.separated(", ");
            for id in batch {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows = builder
                .build()
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
            for row in rows {
                let entity = entity_from_row(&row);
                found.insert(entity.id, entity);
            }
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Entity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE project = ? AND title = ? ORDER BY id",
            ENTITY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&self.project)
            .bind(title)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.iter().map(entity_from_row).collect())
    }

    async fn find_by_path_suffix(&self, suffix: &str) -> StorageResult<Vec<Entity>> {
        let needle = format!("/{}", suffix.trim_start_matches('/'));
        let sql = format!(
            "SELECT {} FROM entities \
             WHERE project = ? AND substr(file_path, -length(?)) = ? \
             ORDER BY file_path",
            ENTITY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&self.project)
            .bind(&needle)
            .bind(&needle)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.iter().map(entity_from_row).collect())
    }

    async fn find_by_pattern(&self, pattern: &str) -> StorageResult<Vec<Entity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE project = ? AND file_path GLOB ? ORDER BY file_path",
            ENTITY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&self.project)
            .bind(glob_literal(pattern))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.iter().map(entity_from_row).collect())
    }

    async fn find_recent(
        &self,
        since: Option<DateTime<Utc>>,
        types: &[String],
        limit: usize,
    ) -> StorageResult<Vec<Entity>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM entities WHERE project = ",
            ENTITY_COLUMNS
        ));
        builder.push_bind(&self.project);
        if let Some(since) = since {
            builder.push(" AND updated_at >= ").push_bind(to_millis(since));
        }
        if !types.is_empty() {
            builder.push(" AND entity_type IN (");
            let mut separated = builder.separated(", ");
            for t in types {
                separated.push_bind(t);
            }
            separated.push_unseparated(")");
        }
        builder
            .push(" ORDER BY updated_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.iter().map(entity_from_row).collect())
    }

    async fn list_all(&self) -> StorageResult<Vec<Entity>> {
        let sql = format!(
            "SELECT {} FROM entities WHERE project = ? ORDER BY file_path",
            ENTITY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&self.project)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.iter().map(entity_from_row).collect())
    }

    async fn add(&self, entity: NewEntity) -> StorageResult<Entity> {
        let sql = format!(
            "INSERT INTO entities \
             (project, title, entity_type, content_type, file_path, checksum, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {}",
            ENTITY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&self.project)
            .bind(&entity.title)
            .bind(&entity.entity_type)
            .bind(&entity.content_type)
            .bind(&entity.file_path)
            .bind(&entity.checksum)
            .bind(to_millis(entity.created_at))
            .bind(to_millis(entity.updated_at))
            .fetch_one(&self.pool)
            .await
            .map_err(write_error(&entity.file_path))?;
        Ok(entity_from_row(&row))
    }

    async fn update(&self, id: EntityId, fields: &EntityUpdate) -> StorageResult<Entity> {
        if fields.is_empty() {
            return self.get_by_id(id).await;
        }

        let sql = format!(
            "UPDATE entities SET \
                title = COALESCE(?, title), \
                entity_type = COALESCE(?, entity_type), \
                content_type = COALESCE(?, content_type), \
                file_path = COALESCE(?, file_path), \
                checksum = COALESCE(?, checksum), \
                updated_at = COALESCE(?, updated_at) \
             WHERE project = ? AND id = ? \
             RETURNING {}",
            ENTITY_COLUMNS
        );
        let conflict_path = fields.file_path.clone().unwrap_or_default();
        let row = sqlx::query(&sql)
            .bind(&fields.title)
            .bind(&fields.entity_type)
            .bind(&fields.content_type)
            .bind(&fields.file_path)
            .bind(&fields.checksum)
            .bind(fields.updated_at.map(to_millis))
            .bind(&self.project)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error(&conflict_path))?;

        row.map(|r| entity_from_row(&r))
            .ok_or_else(|| StorageError::NotFound(format!("entity {}", id)))
    }
}

#[async_trait]
impl RelationSource for SqliteStore {
    async fn relations_touching(
        &self,
        ids: &[EntityId],
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<Relation>> {
        let mut relations: Vec<Relation> = Vec::new();
        for batch in ids.chunks(ID_BATCH) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT r.id, r.from_id, r.to_id, r.to_name, r.relation_type, r.created_at \
                 FROM relations r JOIN entities e ON e.id = r.from_id \
                 WHERE e.project = ",
            );
            builder.push_bind(&self.project);
            if let Some(since) = since {
                builder.push(" AND r.created_at >= ").push_bind(to_millis(since));
            }

            builder.push(" AND (r.from_id IN (");
            let mut from = builder.separated(", ");
            for id in batch {
                from.push_bind(*id);
            }
            from.push_unseparated(") OR r.to_id IN (");
            let mut to = builder.separated(", ");
            for id in batch {
                to.push_bind(*id);
            }
            to.push_unseparated("))");

            let rows = builder
                .build()
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
            relations.extend(rows.iter().map(relation_from_row));
        }

        // Batches can overlap on relations that join two batches.
        relations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        relations.dedup_by_key(|r| r.id);
        Ok(relations)
    }

    async fn add_relation(&self, relation: NewRelation) -> StorageResult<Relation> {
        let sql = format!(
            "INSERT INTO relations (from_id, to_id, to_name, relation_type, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(from_id, to_name, relation_type) DO UPDATE SET \
                to_id = COALESCE(excluded.to_id, relations.to_id) \
             RETURNING {}",
            RELATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(relation.from_id)
            .bind(relation.target.entity_id())
            .bind(&relation.target_name)
            .bind(&relation.relation_type)
            .bind(to_millis(relation.created_at))
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(relation_from_row(&row))
    }

    async fn resolve_forward_references(
        &self,
        title: &str,
        entity_id: EntityId,
    ) -> StorageResult<u64> {
        let result = sqlx::query(
            "UPDATE relations SET to_id = ? \
             WHERE to_id IS NULL AND to_name = ? \
               AND from_id IN (SELECT id FROM entities WHERE project = ?)",
        )
        .bind(entity_id)
        .bind(title)
        .bind(&self.project)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SearchIndex for SqliteStore {
    async fn index(&self, entity: &Entity, content: &str) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query("DELETE FROM search_index WHERE entity_id = ?")
            .bind(entity.id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        sqlx::query(
            "INSERT INTO search_index (entity_id, title, file_path, content) VALUES (?, ?, ?, ?)",
        )
        .bind(entity.id)
        .bind(&entity.title)
        .bind(&entity.file_path)
        .bind(content)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }

    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<SearchHit>, IndexError> {
        let expression = match fts_expression(query.text, query.field) {
            Some(expression) => expression,
            None => return Ok(Vec::new()),
        };

        let rows = sqlx::query(
            r#"
            SELECT e.id, e.title, e.file_path, e.entity_type, e.updated_at,
                   bm25(search_index) AS bm25_rank,
                   snippet(search_index, 3, '>>>', '<<<', '...', 32) AS snippet
            FROM search_index
            JOIN entities e ON e.id = search_index.entity_id
            WHERE search_index MATCH ?
              AND e.project = ?
              AND (? IS NULL OR e.updated_at >= ?)
            ORDER BY bm25_rank, e.updated_at DESC, e.id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&expression)
        .bind(&self.project)
        .bind(query.after.map(to_millis))
        .bind(query.after.map(to_millis))
        .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(query.offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("bm25_rank");
                SearchHit {
                    entity_id: row.get("id"),
                    title: row.get("title"),
                    file_path: row.get("file_path"),
                    entity_type: row.get("entity_type"),
                    updated_at: from_millis(row.get("updated_at")),
                    score: -rank, // negate so higher = better
                    snippet: row.get("snippet"),
                }
            })
            .collect())
    }
}
