//! TOML configuration.
//!
//! ```toml
//! default_project = "main"
//!
//! [db]
//! path = "./data/notegraph.sqlite"
//!
//! [projects.main]
//! home = "./notes"
//!
//! [context]
//! depth = 1
//! timeframe = "7d"
//! page_size = 10
//! max_related = 10
//! # max_visited = 500
//!
//! [scan]
//! include_globs = ["**/*.md", "**/*.canvas"]
//! exclude_globs = []
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use notegraph_core::timeframe::parse_timeframe;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    /// Project used when `--project` is not given. Optional when only one
    /// project is configured.
    #[serde(default)]
    pub default_project: Option<String>,
    pub projects: BTreeMap<String, ProjectConfig>,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    /// Root directory; every file path is relative to it.
    pub home: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_related")]
    pub max_related: usize,
    #[serde(default)]
    pub max_visited: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            timeframe: default_timeframe(),
            page_size: default_page_size(),
            max_related: default_max_related(),
            max_visited: None,
        }
    }
}

fn default_depth() -> usize {
    1
}
fn default_timeframe() -> String {
    "7d".to_string()
}
fn default_page_size() -> usize {
    10
}
fn default_max_related() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.canvas".to_string()]
}

/// A selected project.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub home: PathBuf,
}

impl Config {
    /// Select a project by name, falling back to `default_project`, then to
    /// the only configured project.
    pub fn project(&self, name: Option<&str>) -> Result<Project> {
        let name = match name.or(self.default_project.as_deref()) {
            Some(name) => name.to_string(),
            None if self.projects.len() == 1 => match self.projects.keys().next() {
                Some(only) => only.clone(),
                None => bail!("no projects configured"),
            },
            None => bail!("several projects configured; pass --project or set default_project"),
        };

        let project = self
            .projects
            .get(&name)
            .with_context(|| format!("Unknown project: '{}'", name))?;
        Ok(Project {
            name,
            home: project.home.clone(),
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.projects.is_empty() {
        bail!("at least one [projects.<name>] section is required");
    }

    if let Some(default) = &config.default_project {
        if !config.projects.contains_key(default) {
            bail!("default_project '{}' is not a configured project", default);
        }
    }

    if config.context.page_size == 0 {
        bail!("context.page_size must be >= 1");
    }

    if config.context.max_related == 0 {
        bail!("context.max_related must be >= 1");
    }

    if config.context.max_visited == Some(0) {
        bail!("context.max_visited must be >= 1 when set");
    }

    parse_timeframe(&config.context.timeframe, Utc::now())
        .with_context(|| format!("context.timeframe '{}' is invalid", config.context.timeframe))?;

    for pattern in config
        .scan
        .include_globs
        .iter()
        .chain(config.scan.exclude_globs.iter())
    {
        globset::Glob::new(pattern)
            .with_context(|| format!("scan glob '{}' is invalid", pattern))?;
    }

    Ok(config)
}
