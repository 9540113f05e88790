//! Full-text search over indexed entities.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use notegraph_core::models::SearchHit;
use notegraph_core::store::{SearchField, SearchIndex, SearchQuery};
use notegraph_core::timeframe::parse_timeframe;
use serde::Serialize;

use crate::app::AppContext;

/// Search response, printed as JSON.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<SearchHit>,
}

/// Offset of the first result on a 1-based `page`.
pub fn page_offset(page: usize, page_size: usize) -> Result<usize> {
    if page == 0 {
        bail!("--page must be >= 1");
    }
    if page_size == 0 {
        bail!("--page-size must be >= 1");
    }
    match (page - 1).checked_mul(page_size) {
        Some(offset) => Ok(offset),
        None => bail!("--page {} with --page-size {} is out of range", page, page_size),
    }
}

pub async fn search(
    app: &AppContext,
    query: &str,
    title_only: bool,
    after_date: Option<&str>,
    page: usize,
    page_size: usize,
) -> Result<SearchResponse> {
    let offset = page_offset(page, page_size)?;

    let after = after_date
        .map(|text| parse_timeframe(text, Utc::now()))
        .transpose()?;

    let results = if query.trim().is_empty() {
        Vec::new()
    } else {
        app.store
            .search(&SearchQuery {
                text: query,
                field: if title_only {
                    SearchField::Title
                } else {
                    SearchField::Text
                },
                after,
                limit: page_size,
                offset,
            })
            .await?
    };

    Ok(SearchResponse {
        query: query.to_string(),
        after,
        page,
        page_size,
        results,
    })
}

/// CLI entry point for `ng search`.
pub async fn run_search(
    app: &AppContext,
    query: &str,
    title_only: bool,
    after_date: Option<&str>,
    page: usize,
    page_size: usize,
) -> Result<()> {
    let response = search(app, query, title_only, after_date, page, page_size).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
