//! Markdown notes.
//!
//! `write_note` renders a frontmatter header and syncs the note to
//! `<folder>/<title>.md`. `read_note` resolves an identifier the same way a
//! memory URL is resolved and returns the file body, falling back to a
//! full-text search when nothing matches exactly.

use anyhow::{bail, Context, Result};
use notegraph_core::context::ContextReference;
use notegraph_core::memory_url::MemoryUrl;
use notegraph_core::models::{Entity, SearchHit, MARKDOWN_CONTENT_TYPE, NOTE_TYPE};
use notegraph_core::store::{FileStore, SearchField, SearchIndex, SearchQuery};
use notegraph_core::sync::{SyncOutcome, SyncRequest};

use crate::app::AppContext;
use crate::search::page_offset;

/// Result of [`read_note`].
#[derive(Debug)]
pub enum NoteLookup {
    Found { entity: Entity, content: String },
    /// No exact match; these search hits may be what was meant.
    Suggestions(Vec<SearchHit>),
}

/// File name for a note title: path separators become `-`.
pub fn note_file_name(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!("{}.md", cleaned)
}

pub fn note_path(folder: &str, title: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        note_file_name(title)
    } else {
        format!("{}/{}", folder, note_file_name(title))
    }
}

/// Prefix `content` with a YAML frontmatter block.
pub fn render_note(title: &str, tags: &[String], content: &str) -> Result<String> {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: {}\n", serde_json::to_string(title)?));
    out.push_str(&format!("type: {}\n", NOTE_TYPE));
    if !tags.is_empty() {
        out.push_str(&format!("tags: {}\n", serde_json::to_string(tags)?));
    }
    out.push_str("---\n\n");
    out.push_str(content.trim_end());
    out.push('\n');
    Ok(out)
}

pub async fn write_note(
    app: &AppContext,
    title: &str,
    folder: &str,
    content: &str,
    tags: &[String],
) -> Result<SyncOutcome> {
    if title.trim().is_empty() {
        bail!("note title must not be empty");
    }
    if content.trim().is_empty() {
        bail!("Empty content provided. Please provide non-empty content.");
    }

    let body = render_note(title.trim(), tags, content)?;
    let outcome = app
        .synchronizer()
        .sync(SyncRequest {
            file_path: note_path(folder, title),
            content: body.into_bytes(),
            title: title.trim().to_string(),
            entity_type: NOTE_TYPE.to_string(),
            content_type: MARKDOWN_CONTENT_TYPE.to_string(),
        })
        .await?;
    Ok(outcome)
}

pub async fn read_note(
    app: &AppContext,
    identifier: &str,
    page: usize,
    page_size: usize,
) -> Result<NoteLookup> {
    let url = MemoryUrl::parse(identifier)?;
    let matches = app
        .context_builder()
        .resolve_primaries(&ContextReference::Url(url), None, 1)
        .await?;

    if let Some(entity) = matches.into_iter().next() {
        let bytes = app
            .files
            .read_file(&entity.file_path)
            .await
            .with_context(|| format!("Failed to read {}", entity.file_path))?;
        return Ok(NoteLookup::Found {
            entity,
            content: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    let offset = page_offset(page, page_size)?;
    let hits = app
        .store
        .search(&SearchQuery {
            text: identifier,
            field: SearchField::Text,
            after: None,
            limit: page_size,
            offset,
        })
        .await?;
    Ok(NoteLookup::Suggestions(hits))
}

/// CLI entry point for `ng write-note`.
pub async fn run_write_note(
    app: &AppContext,
    title: &str,
    folder: &str,
    content: &str,
    tags: &[String],
) -> Result<()> {
    let outcome = write_note(app, title, folder, content, tags).await?;

    println!("# {}: {}", outcome.action, outcome.entity.file_path);
    println!("id: {}", outcome.entity.id);
    println!("checksum: {}", outcome.entity.checksum);
    if !tags.is_empty() {
        println!("tags: {}", tags.join(", "));
    }
    if let Some(warning) = &outcome.index_warning {
        eprintln!("Warning: note saved but not indexed: {}", warning);
    }
    if let Some(warning) = &outcome.reference_warning {
        eprintln!("Warning: links to this note were not resolved: {}", warning);
    }
    Ok(())
}

/// CLI entry point for `ng read-note`.
pub async fn run_read_note(
    app: &AppContext,
    identifier: &str,
    page: usize,
    page_size: usize,
) -> Result<()> {
    if page == 0 {
        bail!("--page must be >= 1");
    }

    match read_note(app, identifier, page, page_size).await? {
        NoteLookup::Found { content, .. } => {
            print!("{}", content);
        }
        NoteLookup::Suggestions(hits) if hits.is_empty() => {
            bail!("Note not found: {}", identifier);
        }
        NoteLookup::Suggestions(hits) => {
            println!("# Note not found: {}", identifier);
            println!();
            println!("Possibly related:");
            for hit in hits {
                println!("- {} ({})", hit.title, hit.file_path);
            }
        }
    }
    Ok(())
}
