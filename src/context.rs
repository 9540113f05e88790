//! CLI glue for the context builder: `build-context`, `recent-activity`,
//! and `continue`.
//!
//! Each command turns its flags into a [`ContextQuery`], filling unset
//! values from `[context]` in the config, and prints the resulting
//! [`GraphContext`] as JSON.

use anyhow::Result;
use chrono::{DateTime, Utc};
use notegraph_core::context::{ContextQuery, ContextReference, GraphContext};
use notegraph_core::memory_url::MemoryUrl;
use notegraph_core::store::{EntityRepository, SearchField, SearchIndex, SearchQuery};
use notegraph_core::timeframe::parse_timeframe;

use crate::app::AppContext;
use crate::search::page_offset;

/// Flags shared by the context commands. `None` means "use the config".
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub depth: Option<usize>,
    pub timeframe: Option<String>,
    pub page: usize,
    pub page_size: Option<usize>,
    pub max_related: Option<usize>,
}

impl ContextOptions {
    fn into_query(self, app: &AppContext, reference: ContextReference) -> Result<ContextQuery> {
        let defaults = &app.config.context;
        let page_size = self.page_size.unwrap_or(defaults.page_size);
        let offset = page_offset(self.page, page_size)?;

        Ok(ContextQuery {
            reference,
            depth: self.depth.unwrap_or(defaults.depth),
            since: Some(self.since(app)?),
            limit: page_size,
            offset,
            max_related: self.max_related.unwrap_or(defaults.max_related),
            max_visited: defaults.max_visited,
        })
    }

    fn since(&self, app: &AppContext) -> Result<DateTime<Utc>> {
        let text = self
            .timeframe
            .as_deref()
            .unwrap_or(&app.config.context.timeframe);
        Ok(parse_timeframe(text, Utc::now())?)
    }
}

pub async fn build_context(
    app: &AppContext,
    url: &str,
    options: ContextOptions,
) -> Result<GraphContext> {
    let reference = ContextReference::Url(MemoryUrl::parse(url)?);
    let query = options.into_query(app, reference)?;
    Ok(app.context_builder().build_context(query).await?)
}

pub async fn recent_activity(
    app: &AppContext,
    types: Vec<String>,
    options: ContextOptions,
) -> Result<GraphContext> {
    let query = options.into_query(app, ContextReference::Recent { types })?;
    Ok(app.context_builder().build_context(query).await?)
}

/// Context for resuming work on `topic`, or on whatever changed recently
/// when no topic is given.
pub async fn continue_conversation(
    app: &AppContext,
    topic: Option<&str>,
    options: ContextOptions,
) -> Result<GraphContext> {
    let topic = topic.map(str::trim).filter(|t| !t.is_empty());
    let Some(topic) = topic else {
        return recent_activity(app, Vec::new(), options).await;
    };

    let since = options.since(app)?;
    let page_size = options
        .page_size
        .unwrap_or(app.config.context.page_size);
    let hits = app
        .store
        .search(&SearchQuery {
            text: topic,
            field: SearchField::Text,
            after: Some(since),
            limit: page_size,
            offset: 0,
        })
        .await?;
    let ids: Vec<i64> = hits.iter().map(|h| h.entity_id).collect();
    let primaries = app.store.get_by_ids(&ids).await?;

    let query = options.into_query(app, ContextReference::Entities(primaries))?;
    Ok(app.context_builder().build_context(query).await?)
}

fn print_context(context: &GraphContext) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(context)?);
    Ok(())
}

/// CLI entry point for `ng build-context`.
pub async fn run_build_context(app: &AppContext, url: &str, options: ContextOptions) -> Result<()> {
    print_context(&build_context(app, url, options).await?)
}

/// CLI entry point for `ng recent-activity`.
pub async fn run_recent_activity(
    app: &AppContext,
    types: Vec<String>,
    options: ContextOptions,
) -> Result<()> {
    print_context(&recent_activity(app, types, options).await?)
}

/// CLI entry point for `ng continue`.
pub async fn run_continue(
    app: &AppContext,
    topic: Option<&str>,
    options: ContextOptions,
) -> Result<()> {
    print_context(&continue_conversation(app, topic, options).await?)
}
