//! # maturidade-core
//!
//! Core library for maturidade - journey maturity snapshots and timelines.
//!
//! This library provides:
//! - Domain types for companies, journeys, processes and snapshots
//! - Database storage layer with SQLite
//! - Fact import from JSON bundles
//! - Snapshot building, timeline reading, statistics and period comparison
//! - CSV export
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Facts:** process catalog, maturity evaluations and tasks (read-only here)
//! - **Snapshots:** one stored aggregate per company, journey and bucket
//!   (rebuildable from facts)
//!
//! ## Example
//!
//! ```rust,no_run
//! use maturidade_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use analytics::AnalyticsContext;
pub use config::Config;
pub use db::{Database, FactSource, SnapshotFilter, SnapshotStore};
pub use error::{Error, Result};
pub use ingest::{FactBundle, FactImporter, ImportResult};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod types;
