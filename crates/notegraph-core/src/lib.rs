//! # notegraph core
//!
//! Storage-agnostic logic for notegraph: the entity data model, content
//! checksums, memory URLs, the boundary traits the application implements
//! over SQLite and the local filesystem, and the two algorithms that sit on
//! top of them.
//!
//! - [`sync::EntitySynchronizer`] keeps a file, its entity record, and its
//!   search-index entry consistent for a single logical write.
//! - [`context::ContextBuilder`] assembles a bounded neighborhood of related
//!   entities by breadth-first traversal over the relation graph.
//!
//! This crate contains no sqlx or direct filesystem I/O. Everything it
//! touches goes through the traits in [`store`]; [`store::memory`] provides
//! in-memory implementations for tests.

pub mod checksum;
pub mod context;
pub mod error;
pub mod memory_url;
pub mod models;
pub mod store;
pub mod sync;
pub mod timeframe;
