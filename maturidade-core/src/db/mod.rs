//! Database layer for maturidade
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository operations for fact tables and the snapshot store
//! - The [`FactSource`] / [`SnapshotStore`] seams analytics depends on

pub mod repo;
pub mod schema;
pub mod traits;

pub use repo::{Database, ImportCheckpoint};
pub use traits::{FactSource, SnapshotFilter, SnapshotStore, TaskFilter};
