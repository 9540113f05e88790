//! Recording relations between entities.
//!
//! The source must resolve to an existing entity. A target that resolves to
//! nothing is stored as a forward reference by title and is resolved when an
//! entity with that title is created.

use anyhow::{bail, Result};
use chrono::Utc;
use notegraph_core::context::ContextReference;
use notegraph_core::memory_url::{MemoryUrl, SCHEME};
use notegraph_core::models::{Entity, NewRelation, Relation, RelationTarget};
use notegraph_core::store::RelationSource;

use crate::app::AppContext;

async fn resolve_one(app: &AppContext, identifier: &str) -> Result<Option<Entity>> {
    let url = MemoryUrl::parse(identifier)?;
    if url.is_pattern() {
        bail!("relation endpoints must name a single entity, got pattern '{}'", identifier);
    }
    let found = app
        .context_builder()
        .resolve_primaries(&ContextReference::Url(url), None, 1)
        .await?;
    if found.len() > 1 {
        bail!(
            "'{}' is ambiguous: matches {}",
            identifier,
            found
                .iter()
                .map(|e| e.file_path.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(found.into_iter().next())
}

pub async fn relate(
    app: &AppContext,
    from: &str,
    to: &str,
    relation_type: &str,
) -> Result<Relation> {
    if relation_type.trim().is_empty() {
        bail!("relation type must not be empty");
    }

    let source = match resolve_one(app, from).await? {
        Some(entity) => entity,
        None => bail!("Source entity not found: {}", from),
    };

    let (target, target_name) = match resolve_one(app, to).await? {
        Some(entity) => (RelationTarget::Resolved(entity.id), entity.title),
        None => {
            let title = to.strip_prefix(SCHEME).unwrap_or(to).trim_matches('/');
            (RelationTarget::Unresolved(title.to_string()), title.to_string())
        }
    };

    let relation = app
        .store
        .add_relation(NewRelation {
            from_id: source.id,
            target,
            target_name,
            relation_type: relation_type.trim().to_string(),
            created_at: Utc::now(),
        })
        .await?;
    Ok(relation)
}

/// CLI entry point for `ng relate`.
pub async fn run_relate(app: &AppContext, from: &str, to: &str, relation_type: &str) -> Result<()> {
    let relation = relate(app, from, to, relation_type).await?;
    println!("{}", serde_json::to_string_pretty(&relation)?);
    Ok(())
}
