//! Context assembly by breadth-first traversal of the relation graph.
//!
//! A context query starts from a [`ContextReference`], resolves it to a set
//! of **primary** entities, then walks relations outward from all primaries
//! at once, one hop per round:
//!
//! ```text
//! hop 0   primaries            visited = {primaries}
//! hop 1   relations_touching(frontier, since)
//!         → unvisited endpoints, one candidate per (primary, entity)
//!         → drop missing and stale (updated_at < since) entities
//!         → rank by recency; each entity goes to the first primary
//!           reaching it that still has max_related quota
//! hop 2.. repeat from the kept nodes of the previous hop
//! ```
//!
//! Every entity is accepted at most once, so traversal terminates on cyclic
//! graphs after at most `depth` rounds. Unresolved forward references are
//! skipped: they have no entity to expand. Total work is further bounded by
//! the `since` cutoff, the per-primary `max_related` quota, and the optional
//! `max_visited` budget.
//!
//! Paging (`limit`/`offset`) is applied to the combined ordered list,
//! primaries first, after traversal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::ContextError;
use crate::memory_url::MemoryUrl;
use crate::models::{Entity, EntityId, Relation};
use crate::store::{EntityRepository, RelationSource};

/// Where a context query starts.
#[derive(Debug, Clone)]
pub enum ContextReference {
    /// Resolve a memory URL: exact path, then path suffix, then title; or a
    /// glob for pattern URLs.
    Url(MemoryUrl),
    /// Entities updated at or after the query's `since`, optionally limited
    /// to some entity types. An empty list matches all types.
    Recent { types: Vec<String> },
    /// An already-resolved primary set.
    Entities(Vec<Entity>),
}

/// Parameters for [`ContextBuilder::build_context`].
#[derive(Debug, Clone)]
pub struct ContextQuery {
    pub reference: ContextReference,
    /// Maximum hop count from any primary. `0` returns only primaries.
    pub depth: usize,
    /// Entities and relations older than this are excluded from traversal.
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
    /// Cap on related entities attributed to each primary.
    pub max_related: usize,
    /// Cap on entities discovered by traversal, across all primaries.
    pub max_visited: Option<usize>,
}

/// One edge on the path from a primary to a related entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationStep {
    pub relation_id: i64,
    pub relation_type: String,
    pub from_id: EntityId,
    pub to_id: EntityId,
}

/// An entity reached by traversal.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedEntity {
    pub entity: Entity,
    pub hop_distance: usize,
    /// Relations followed from the primary, in traversal order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relation_path: Vec<RelationStep>,
    /// The primary this entity was attributed to.
    pub primary_id: EntityId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
    pub primary_count: usize,
    pub related_count: usize,
    /// Size of the combined result list before paging.
    pub total_results: usize,
    /// Set when `max_visited` stopped the traversal early.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    pub generated_at: DateTime<Utc>,
}

/// Result of a context query.
#[derive(Debug, Clone, Serialize)]
pub struct GraphContext {
    pub primary_results: Vec<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_results: Vec<RelatedEntity>,
    pub metadata: ContextMetadata,
}

/// A node waiting to be expanded.
struct FrontierNode {
    id: EntityId,
    root: EntityId,
    path: Vec<RelationStep>,
}

/// A node found during one hop, before ranking.
struct Candidate {
    id: EntityId,
    root: EntityId,
    path: Vec<RelationStep>,
    order: usize,
}

struct Traversal {
    related: Vec<RelatedEntity>,
    truncated: bool,
}

/// Builds [`GraphContext`]s over an entity repository and relation source.
pub struct ContextBuilder {
    entities: Arc<dyn EntityRepository>,
    relations: Arc<dyn RelationSource>,
}

impl ContextBuilder {
    pub fn new(entities: Arc<dyn EntityRepository>, relations: Arc<dyn RelationSource>) -> Self {
        Self {
            entities,
            relations,
        }
    }

    pub async fn build_context(&self, query: ContextQuery) -> Result<GraphContext, ContextError> {
        let primaries = self
            .resolve_primaries(&query.reference, query.since, query.offset.saturating_add(query.limit))
            .await?;

        let traversal = if primaries.is_empty() || query.depth == 0 || query.max_related == 0 {
            Traversal {
                related: Vec::new(),
                truncated: false,
            }
        } else {
            self.traverse(&primaries, &query).await?
        };

        let total_results = primaries.len() + traversal.related.len();
        debug!(
            primaries = primaries.len(),
            related = traversal.related.len(),
            truncated = traversal.truncated,
            "context traversal complete"
        );

        let (primary_results, related_results) =
            paginate(primaries, traversal.related, query.offset, query.limit);

        let (uri, types) = match &query.reference {
            ContextReference::Url(url) => (Some(url.to_string()), Vec::new()),
            ContextReference::Recent { types } => (None, types.clone()),
            ContextReference::Entities(_) => (None, Vec::new()),
        };

        let metadata = ContextMetadata {
            uri,
            types,
            depth: query.depth,
            since: query.since,
            limit: query.limit,
            offset: query.offset,
            primary_count: primary_results.len(),
            related_count: related_results.len(),
            total_results,
            truncated: traversal.truncated,
            generated_at: Utc::now(),
        };

        Ok(GraphContext {
            primary_results,
            related_results,
            metadata,
        })
    }

    /// Resolve a reference to its primary entities, deduplicated, in a
    /// stable order. `recent_limit` caps the `Recent` form only.
    pub async fn resolve_primaries(
        &self,
        reference: &ContextReference,
        since: Option<DateTime<Utc>>,
        recent_limit: usize,
    ) -> Result<Vec<Entity>, ContextError> {
        let found = match reference {
            ContextReference::Url(MemoryUrl::Path(path)) => self.resolve_path(path).await?,
            ContextReference::Url(MemoryUrl::Pattern(pattern)) => {
                self.entities.find_by_pattern(pattern).await?
            }
            ContextReference::Recent { types } => {
                self.entities.find_recent(since, types, recent_limit).await?
            }
            ContextReference::Entities(entities) => entities.clone(),
        };

        let mut seen = HashSet::new();
        Ok(found.into_iter().filter(|e| seen.insert(e.id)).collect())
    }

    async fn resolve_path(&self, path: &str) -> Result<Vec<Entity>, ContextError> {
        if let Some(entity) = self.entities.get_by_path(path).await? {
            return Ok(vec![entity]);
        }
        let by_suffix = self.entities.find_by_path_suffix(path).await?;
        if !by_suffix.is_empty() {
            return Ok(by_suffix);
        }
        Ok(self.entities.find_by_title(path).await?)
    }

    async fn traverse(
        &self,
        primaries: &[Entity],
        query: &ContextQuery,
    ) -> Result<Traversal, ContextError> {
        let mut visited: HashSet<EntityId> = primaries.iter().map(|e| e.id).collect();
        let mut discovered: HashSet<EntityId> = HashSet::new();
        let mut accepted: HashMap<EntityId, usize> = HashMap::new();
        let mut related = Vec::new();
        let mut order = 0usize;
        let mut truncated = false;

        let mut frontier: Vec<FrontierNode> = primaries
            .iter()
            .map(|e| FrontierNode {
                id: e.id,
                root: e.id,
                path: Vec::new(),
            })
            .collect();

        for hop in 1..=query.depth {
            if frontier.is_empty() {
                break;
            }

            let ids: Vec<EntityId> = frontier.iter().map(|n| n.id).collect();
            let relations = self.relations.relations_touching(&ids, query.since).await?;
            let by_id: HashMap<EntityId, &FrontierNode> =
                frontier.iter().map(|n| (n.id, n)).collect();

            // One candidate per (primary, entity) pair. An entity reached from
            // several primaries is attributed after ranking, not here.
            let mut pairs: HashSet<(EntityId, EntityId)> = HashSet::new();
            let mut candidates = Vec::new();
            'relations: for relation in relations.iter().filter(|r| is_recent(r, query.since)) {
                let Some(to_id) = relation.target.entity_id() else {
                    continue;
                };

                for (near, far) in [(relation.from_id, to_id), (to_id, relation.from_id)] {
                    let Some(node) = by_id.get(&near) else {
                        continue;
                    };
                    if visited.contains(&far) || pairs.contains(&(node.root, far)) {
                        continue;
                    }
                    if !discovered.contains(&far) {
                        if query.max_visited.is_some_and(|budget| discovered.len() >= budget) {
                            truncated = true;
                            break 'relations;
                        }
                        discovered.insert(far);
                    }

                    pairs.insert((node.root, far));
                    let mut path = node.path.clone();
                    path.push(RelationStep {
                        relation_id: relation.id,
                        relation_type: relation.relation_type.clone(),
                        from_id: relation.from_id,
                        to_id,
                    });
                    candidates.push(Candidate {
                        id: far,
                        root: node.root,
                        path,
                        order,
                    });
                    order += 1;
                }
            }

            if candidates.is_empty() {
                break;
            }

            let mut candidate_ids: Vec<EntityId> = candidates.iter().map(|c| c.id).collect();
            candidate_ids.sort_unstable();
            candidate_ids.dedup();
            let loaded: HashMap<EntityId, Entity> = self
                .entities
                .get_by_ids(&candidate_ids)
                .await?
                .into_iter()
                .map(|e| (e.id, e))
                .collect();

            // Missing or stale nodes are visited but neither returned nor expanded.
            let mut ranked: Vec<(Candidate, &Entity)> = Vec::new();
            for candidate in candidates {
                match loaded.get(&candidate.id) {
                    Some(entity) if query.since.map_or(true, |since| entity.updated_at >= since) => {
                        ranked.push((candidate, entity))
                    }
                    _ => {
                        visited.insert(candidate.id);
                    }
                }
            }
            ranked.sort_by(|(ca, ea), (cb, eb)| {
                eb.updated_at
                    .cmp(&ea.updated_at)
                    .then(ca.order.cmp(&cb.order))
            });

            // Greedy: each entity goes to the first primary, in rank order,
            // that still has quota. Entities every reaching primary rejected
            // stay unvisited so a later hop may still reach them.
            let mut next = Vec::new();
            for (candidate, entity) in ranked {
                if visited.contains(&candidate.id) {
                    continue;
                }
                let count = accepted.entry(candidate.root).or_insert(0);
                if *count >= query.max_related {
                    continue;
                }
                *count += 1;
                visited.insert(candidate.id);

                next.push(FrontierNode {
                    id: candidate.id,
                    root: candidate.root,
                    path: candidate.path.clone(),
                });
                related.push(RelatedEntity {
                    entity: entity.clone(),
                    hop_distance: hop,
                    relation_path: candidate.path,
                    primary_id: candidate.root,
                });
            }

            if truncated {
                break;
            }
            next.retain(|n| accepted.get(&n.root).copied().unwrap_or(0) < query.max_related);
            frontier = next;
        }

        // Hops are appended in order and each hop is already ranked, so
        // `related` is ordered by (hop, recency desc, discovery order).
        Ok(Traversal { related, truncated })
    }
}

fn is_recent(relation: &Relation, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |since| relation.created_at >= since)
}

/// Apply `offset`/`limit` to `primaries ++ related` and split the page back
/// into the two lists.
fn paginate(
    primaries: Vec<Entity>,
    related: Vec<RelatedEntity>,
    offset: usize,
    limit: usize,
) -> (Vec<Entity>, Vec<RelatedEntity>) {
    let end = offset.saturating_add(limit);
    let primary_len = primaries.len();

    let page_primaries: Vec<Entity> = primaries
        .into_iter()
        .skip(offset)
        .take(end.saturating_sub(offset))
        .collect();

    let related_start = offset.saturating_sub(primary_len);
    let related_end = end.saturating_sub(primary_len);
    let page_related: Vec<RelatedEntity> = related
        .into_iter()
        .skip(related_start)
        .take(related_end.saturating_sub(related_start))
        .collect();

    (page_primaries, page_related)
}
