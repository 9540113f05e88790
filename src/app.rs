//! Per-process wiring.
//!
//! [`AppContext::open`] builds the pool and the adapters once for a selected
//! project and hands them to the core services by constructor. Nothing here
//! is global; commands receive the context explicitly.

use anyhow::{Context, Result};
use notegraph_core::context::ContextBuilder;
use notegraph_core::sync::EntitySynchronizer;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, Project};
use crate::db;
use crate::file_store::LocalFileStore;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub project: Project,
    pub pool: SqlitePool,
    pub files: Arc<LocalFileStore>,
    pub store: Arc<SqliteStore>,
}

impl AppContext {
    /// Connect, apply migrations, and build the adapters for `project`
    /// (or the configured default).
    pub async fn open(config: &Config, project: Option<&str>) -> Result<Self> {
        let project = config.project(project)?;
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let files = LocalFileStore::new(&project.home).with_context(|| {
            format!("Failed to open project home: {}", project.home.display())
        })?;
        debug!(project = %project.name, home = %files.root().display(), "project opened");

        let store = SqliteStore::new(pool.clone(), project.name.clone());
        Ok(Self {
            config: config.clone(),
            project,
            pool,
            files: Arc::new(files),
            store: Arc::new(store),
        })
    }

    pub fn synchronizer(&self) -> EntitySynchronizer {
        EntitySynchronizer::new(
            self.files.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
        )
    }

    pub fn context_builder(&self) -> ContextBuilder {
        ContextBuilder::new(self.store.clone(), self.store.clone())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
