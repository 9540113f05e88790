//! JSON Canvas files.
//!
//! A canvas is a `{ "nodes": [...], "edges": [...] }` document stored as
//! `<folder>/<title>.canvas` and synced as a `canvas` entity.

use anyhow::{bail, Context, Result};
use notegraph_core::models::{CANVAS_TYPE, JSON_CONTENT_TYPE};
use notegraph_core::sync::{SyncOutcome, SyncRequest};
use serde_json::Value;

use crate::app::AppContext;

pub const CANVAS_EXTENSION: &str = ".canvas";

/// File name for a canvas title. The extension is appended once.
pub fn canvas_file_name(title: &str) -> String {
    if title.ends_with(CANVAS_EXTENSION) {
        title.to_string()
    } else {
        format!("{}{}", title, CANVAS_EXTENSION)
    }
}

/// Parse `text` as a JSON array.
pub fn parse_array(label: &str, text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text)
        .with_context(|| format!("Invalid JSON format for {}", label))?;
    if !value.is_array() {
        bail!("{} must be a JSON array", label);
    }
    Ok(value)
}

pub fn render_canvas(nodes: Value, edges: Value) -> Result<String> {
    let document = serde_json::json!({ "nodes": nodes, "edges": edges });
    Ok(serde_json::to_string_pretty(&document)?)
}

pub async fn write_canvas(
    app: &AppContext,
    nodes: Value,
    edges: Value,
    title: &str,
    folder: &str,
) -> Result<SyncOutcome> {
    if title.trim().is_empty() {
        bail!("canvas title must not be empty");
    }
    if !nodes.is_array() || !edges.is_array() {
        bail!("nodes and edges must be JSON arrays");
    }

    let file_title = canvas_file_name(title.trim());
    let folder = folder.trim_matches('/');
    let file_path = if folder.is_empty() {
        file_title.clone()
    } else {
        format!("{}/{}", folder, file_title)
    };

    let outcome = app
        .synchronizer()
        .sync(SyncRequest {
            file_path,
            content: render_canvas(nodes, edges)?.into_bytes(),
            title: file_title,
            entity_type: CANVAS_TYPE.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
        })
        .await?;
    Ok(outcome)
}

/// Human-readable result of a canvas write.
pub fn summary(outcome: &SyncOutcome) -> String {
    let mut lines = vec![
        format!("# {}: {}", outcome.action, outcome.entity.file_path),
        String::new(),
        "The canvas is ready to open in any JSON Canvas viewer.".to_string(),
    ];
    if let Some(warning) = &outcome.index_warning {
        lines.push(format!("Warning: canvas saved but not indexed: {}", warning));
    }
    if let Some(warning) = &outcome.reference_warning {
        lines.push(format!("Warning: links to this canvas were not resolved: {}", warning));
    }
    lines.join("\n")
}

/// CLI entry point for `ng canvas`.
pub async fn run_canvas(
    app: &AppContext,
    nodes: &str,
    edges: &str,
    title: &str,
    folder: &str,
) -> Result<()> {
    let nodes = parse_array("nodes", nodes)?;
    let edges = parse_array("edges", edges)?;
    let outcome = write_canvas(app, nodes, edges, title, folder).await?;
    println!("{}", summary(&outcome));
    Ok(())
}
