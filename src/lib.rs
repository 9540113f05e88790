//! # notegraph
//!
//! A local-first knowledge base: markdown notes and JSON canvases on disk,
//! entity records and a full-text index in SQLite, and a context builder
//! that walks the relation graph to assemble bounded, recent context for AI
//! tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │ CLI (ng)  │──▶│ notegraph-core       │──▶│ LocalFile-   │
//! │ note      │   │  EntitySynchronizer  │   │ Store (disk) │
//! │ canvas    │   │  ContextBuilder      │   └──────────────┘
//! │ scan ...  │   └──────────┬───────────┘   ┌──────────────┐
//! └───────────┘              └──────────────▶│ SqliteStore  │
//!                                            │ entities/FTS5│
//!                                            └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ng init
//! echo "# Rust notes" | ng write-note --title "Rust" --folder notes
//! ng build-context memory://notes/Rust.md --depth 2
//! ng search "rust" --after-date 7d
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`file_store`] | Project-scoped atomic file access |
//! | [`sqlite_store`] | Entity, relation, and search storage |
//! | [`app`] | Wiring of adapters into core services |
//! | [`note`] | Markdown notes |
//! | [`canvas`] | JSON Canvas files |
//! | [`relations`] | Recording relations |
//! | [`context`] | Context and recent-activity commands |
//! | [`search`] | Full-text search |
//! | [`scan`] | Re-import and re-index |

pub mod app;
pub mod canvas;
pub mod config;
pub mod context;
pub mod db;
pub mod file_store;
pub mod migrate;
pub mod note;
pub mod relations;
pub mod scan;
pub mod search;
pub mod sqlite_store;
