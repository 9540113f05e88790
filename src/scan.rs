//! Re-import files edited outside notegraph.
//!
//! Walks the project home, keeps files matching `[scan] include_globs` and
//! not `exclude_globs`, and re-imports each one. Files whose checksum already
//! matches their record are left alone.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use notegraph_core::models::{
    CANVAS_TYPE, FILE_TYPE, JSON_CONTENT_TYPE, MARKDOWN_CONTENT_TYPE, NOTE_TYPE,
    PLAIN_CONTENT_TYPE,
};
use notegraph_core::sync::SyncAction;
use serde::Serialize;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::app::AppContext;

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unindexed: Vec<String>,
}

/// `(entity_type, content_type)` for a file, by extension.
pub fn classify(path: &str) -> (&'static str, &'static str) {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => (NOTE_TYPE, MARKDOWN_CONTENT_TYPE),
        Some("canvas") => (CANVAS_TYPE, JSON_CONTENT_TYPE),
        Some("json") => (FILE_TYPE, JSON_CONTENT_TYPE),
        _ => (FILE_TYPE, PLAIN_CONTENT_TYPE),
    }
}

/// Project-relative paths of every matching file, sorted.
pub fn collect_files(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<String>> {
    let include_set = build_globset(include)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/.*/**".to_string()];
    default_excludes.extend(exclude.iter().cloned());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push(rel_str);
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

pub async fn scan_project(app: &AppContext) -> Result<ScanReport> {
    let files = collect_files(
        app.files.root(),
        &app.config.scan.include_globs,
        &app.config.scan.exclude_globs,
    )?;

    let synchronizer = app.synchronizer();
    let mut report = ScanReport::default();
    for file_path in files {
        let (entity_type, content_type) = classify(&file_path);
        match synchronizer
            .reimport(&file_path, entity_type, content_type)
            .await
        {
            Ok(outcome) => {
                match outcome.action {
                    SyncAction::Created => report.created += 1,
                    SyncAction::Updated => report.updated += 1,
                    SyncAction::Unchanged => report.unchanged += 1,
                }
                if let Some(warning) = &outcome.reference_warning {
                    warn!(file_path = %file_path, error = %warning, "forward references left unresolved");
                }
                if outcome.index_warning.is_some() {
                    report.unindexed.push(file_path);
                }
            }
            Err(e) => {
                warn!(file_path = %file_path, error = %e, "re-import failed");
                report.failed.push((file_path, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// CLI entry point for `ng scan`.
pub async fn run_scan(app: &AppContext) -> Result<()> {
    let report = scan_project(app).await?;
    println!(
        "scan {}: created={} updated={} unchanged={} failed={}",
        app.project.name,
        report.created,
        report.updated,
        report.unchanged,
        report.failed.len()
    );
    for (path, error) in &report.failed {
        eprintln!("  {}: {}", path, error);
    }
    if !report.unindexed.is_empty() {
        eprintln!(
            "Warning: {} file(s) saved but not indexed; run `ng reindex`",
            report.unindexed.len()
        );
    }
    Ok(())
}

/// CLI entry point for `ng reindex`.
pub async fn run_reindex(app: &AppContext) -> Result<()> {
    let report = app.synchronizer().reindex_all().await?;
    println!("reindex {}: indexed={}", app.project.name, report.indexed);
    for (path, error) in &report.failed {
        eprintln!("  {}: {}", path, error);
    }
    if !report.failed.is_empty() {
        anyhow::bail!("{} file(s) could not be re-indexed", report.failed.len());
    }
    Ok(())
}
