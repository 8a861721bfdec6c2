//! Fact import from JSON bundles
//!
//! Fact tables (companies, journeys, processes, evaluations, tasks) are owned
//! by the surrounding dashboard. This module loads exported JSON bundles of
//! those facts into the local database so snapshots can be built from them.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Bundle Files   │ ──► │   FactImporter   │ ──► │    Database     │
//! │  (*.json)       │     │  (hash checkpt)  │     │  (fact tables)  │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! A bundle is written in one transaction. Files whose SHA-256 matches the
//! recorded checkpoint are skipped, so re-running an import over the same
//! directory is cheap.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maturidade_core::{Config, Database};
//! use maturidade_core::ingest::FactImporter;
//!
//! let db = Database::open(&Config::database_path())?;
//! let importer = FactImporter::new(&db);
//! let result = importer.import_paths(&FactImporter::discover(dir)?)?;
//! println!("Imported {} files", result.files_imported);
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::db::{Database, ImportCheckpoint};
use crate::error::{Error, Result};
use crate::types::{Company, Journey, MaturityEvaluation, ProcessCatalogEntry, TaskEvent};

/// A batch of facts, as exported by the dashboard.
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FactBundle {
    pub companies: Vec<Company>,
    pub journeys: Vec<Journey>,
    pub processes: Vec<ProcessCatalogEntry>,
    pub evaluations: Vec<MaturityEvaluation>,
    pub tasks: Vec<TaskEvent>,
}

impl FactBundle {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
            && self.journeys.is_empty()
            && self.processes.is_empty()
            && self.evaluations.is_empty()
            && self.tasks.is_empty()
    }
}

/// Rows written for one bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BundleCounts {
    pub companies: usize,
    pub journeys: usize,
    pub processes: usize,
    pub evaluations_inserted: usize,
    /// Evaluations already present for the same process and timestamp
    pub evaluations_skipped: usize,
    pub tasks: usize,
}

impl BundleCounts {
    fn add(&mut self, other: &BundleCounts) {
        self.companies += other.companies;
        self.journeys += other.journeys;
        self.processes += other.processes;
        self.evaluations_inserted += other.evaluations_inserted;
        self.evaluations_skipped += other.evaluations_skipped;
        self.tasks += other.tasks;
    }
}

/// Outcome of importing one file.
#[derive(Debug, Clone)]
pub enum FileImport {
    Imported(BundleCounts),
    /// Content hash matches the last import
    Unchanged,
}

/// Result of importing a set of files.
#[derive(Debug, Default, Serialize)]
pub struct ImportResult {
    pub files_imported: usize,
    pub files_skipped: usize,
    pub counts: BundleCounts,
    /// Errors encountered (file path → error message)
    pub errors: Vec<(PathBuf, String)>,
}

/// Loads fact bundles into a database.
pub struct FactImporter<'a> {
    db: &'a Database,
}

impl<'a> FactImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Write a bundle in a single transaction.
    pub fn import_bundle(&self, bundle: &FactBundle) -> Result<BundleCounts> {
        let counts = self.db.insert_fact_bundle(bundle)?;
        tracing::debug!(
            companies = counts.companies,
            journeys = counts.journeys,
            processes = counts.processes,
            evaluations = counts.evaluations_inserted,
            tasks = counts.tasks,
            "Imported fact bundle"
        );
        Ok(counts)
    }

    /// Import one bundle file unless its content is unchanged since the last
    /// import.
    pub fn import_file(&self, path: &Path) -> Result<FileImport> {
        let content = std::fs::read(path)?;
        let content_hash = hex::encode(Sha256::digest(&content));
        let source_path = path.to_string_lossy().to_string();

        if let Some(checkpoint) = self.db.get_import_checkpoint(&source_path)? {
            if checkpoint.content_hash == content_hash {
                tracing::debug!(path = %path.display(), "Fact file unchanged, skipping");
                return Ok(FileImport::Unchanged);
            }
        }

        let bundle: FactBundle = serde_json::from_slice(&content).map_err(|e| Error::Import {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let counts = self.import_bundle(&bundle)?;

        self.db.set_import_checkpoint(&ImportCheckpoint {
            source_path,
            content_hash,
            imported_at: Utc::now(),
        })?;

        tracing::info!(
            path = %path.display(),
            evaluations = counts.evaluations_inserted,
            tasks = counts.tasks,
            "Imported fact file"
        );
        Ok(FileImport::Imported(counts))
    }

    /// Import every file, collecting per-file errors instead of stopping.
    pub fn import_paths(&self, paths: &[PathBuf]) -> Result<ImportResult> {
        self.import_paths_with_progress(paths, |_, _, _| {})
    }

    /// Like [`Self::import_paths`], calling `on_progress(index, total, path)`
    /// before each file.
    pub fn import_paths_with_progress<F>(
        &self,
        paths: &[PathBuf],
        mut on_progress: F,
    ) -> Result<ImportResult>
    where
        F: FnMut(usize, usize, &Path),
    {
        let mut result = ImportResult::default();
        let total = paths.len();

        for (i, path) in paths.iter().enumerate() {
            on_progress(i, total, path);
            match self.import_file(path) {
                Ok(FileImport::Imported(counts)) => {
                    result.files_imported += 1;
                    result.counts.add(&counts);
                }
                Ok(FileImport::Unchanged) => result.files_skipped += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Fact import failed");
                    result.errors.push((path.clone(), e.to_string()));
                }
            }
        }

        Ok(result)
    }

    /// Bundle files in a directory (`*.json`, sorted), or the path itself when
    /// it is a file.
    pub fn discover(path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let pattern = path.join("*.json");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| Error::Import {
            path: path.to_path_buf(),
            message: format!("Invalid glob pattern: {}", e),
        })?;

        let mut files: Vec<PathBuf> = entries.flatten().filter(|p| p.is_file()).collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUNDLE: &str = r#"{
        "companies": [{"id": "c1", "name": "Acme"}],
        "journeys": [{"id": "j1", "slug": "financeira", "name": "Financeira", "position": 2}],
        "processes": [
            {"id": "p1", "journey_id": "j1", "company_id": "c1"},
            {"id": "p2", "journey_id": "j1", "company_id": "c1", "is_active": false}
        ],
        "evaluations": [
            {"process_id": "p1", "company_id": "c1", "evaluated_at": "2024-01-10T09:00:00Z", "is_mature": true},
            {"process_id": "p1", "company_id": "c1", "evaluated_at": "2024-01-10T09:00:00Z", "is_mature": true}
        ],
        "tasks": [
            {"id": "t1", "company_id": "c1", "status": "completed",
             "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-05T00:00:00Z"}
        ]
    }"#;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_import_bundle_counts() {
        let db = db();
        let bundle = FactBundle::from_json(BUNDLE).unwrap();
        let counts = FactImporter::new(&db).import_bundle(&bundle).unwrap();

        assert_eq!(counts.companies, 1);
        assert_eq!(counts.processes, 2);
        assert_eq!(counts.evaluations_inserted, 1);
        assert_eq!(counts.evaluations_skipped, 1);
        assert_eq!(counts.tasks, 1);

        let active = db.list_active_processes("c1", Some("j1")).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].process_id, "p1");
    }

    #[test]
    fn test_partial_bundle_defaults() {
        let bundle = FactBundle::from_json(r#"{"companies": [{"id": "c2", "name": "Beta"}]}"#).unwrap();
        assert_eq!(bundle.companies.len(), 1);
        assert!(bundle.tasks.is_empty());
        assert!(FactBundle::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn test_unchanged_file_is_skipped() {
        let db = db();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("facts.json");
        std::fs::write(&path, BUNDLE).unwrap();

        let importer = FactImporter::new(&db);
        assert!(matches!(importer.import_file(&path).unwrap(), FileImport::Imported(_)));
        assert!(matches!(importer.import_file(&path).unwrap(), FileImport::Unchanged));

        std::fs::write(&path, r#"{"companies": [{"id": "c1", "name": "Acme Ltda"}]}"#).unwrap();
        assert!(matches!(importer.import_file(&path).unwrap(), FileImport::Imported(_)));
        assert_eq!(db.get_company("c1").unwrap().unwrap().name, "Acme Ltda");
    }

    #[test]
    fn test_import_paths_collects_errors() {
        let db = db();
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), BUNDLE).unwrap();
        std::fs::write(dir.path().join("b.json"), "not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = FactImporter::discover(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let result = FactImporter::new(&db).import_paths(&files).unwrap();
        assert_eq!(result.files_imported, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].0.ends_with("b.json"));
        assert_eq!(result.counts.evaluations_inserted, 1);
    }
}
