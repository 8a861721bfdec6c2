//! Database repository layer
//!
//! Provides query and insert operations for fact tables, the snapshot store
//! and import checkpoints.

use crate::db::traits::{FactSource, SnapshotFilter, SnapshotStore, TaskFilter};
use crate::error::{Error, Result};
use crate::ingest::{BundleCounts, FactBundle};
use crate::types::*;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Last recorded import of a fact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCheckpoint {
    pub source_path: String,
    /// Hex SHA-256 of the file content
    pub content_hash: String,
    pub imported_at: DateTime<Utc>,
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamp so lexical order equals chronological order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{}': {}", value, e)))
}

fn parse_date(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, format!("bad date '{}': {}", value, e)))
}

/// Exclusive upper bound covering the whole of `date`.
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt()
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================
    // Company / journey operations
    // ============================================

    /// Insert or update a company
    pub fn upsert_company(&self, company: &Company) -> Result<()> {
        let conn = self.connection();
        Self::upsert_company_on(&conn, company)?;
        Ok(())
    }

    fn upsert_company_on(conn: &Connection, company: &Company) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO companies (id, name) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
            params![company.id, company.name],
        )
    }

    /// Get a company by ID
    pub fn get_company(&self, id: &str) -> Result<Option<Company>> {
        let conn = self.connection();
        conn.query_row("SELECT id, name FROM companies WHERE id = ?", [id], |row| {
            Ok(Company {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .optional()
        .map_err(Error::from)
    }

    /// Insert or update a journey
    pub fn upsert_journey(&self, journey: &Journey) -> Result<()> {
        let conn = self.connection();
        Self::upsert_journey_on(&conn, journey)?;
        Ok(())
    }

    fn upsert_journey_on(conn: &Connection, journey: &Journey) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO journeys (id, slug, name, position) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                slug = excluded.slug,
                name = excluded.name,
                position = excluded.position
            "#,
            params![journey.id, journey.slug, journey.name, journey.position],
        )
    }

    /// The journey catalog in display order
    pub fn list_journeys(&self) -> Result<Vec<Journey>> {
        let conn = self.connection();
        let mut stmt =
            conn.prepare("SELECT id, slug, name, position FROM journeys ORDER BY position, slug")?;
        let journeys = stmt
            .query_map([], Self::row_to_journey)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(journeys)
    }

    /// Find a journey by id or slug
    pub fn find_journey(&self, id_or_slug: &str) -> Result<Option<Journey>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT id, slug, name, position FROM journeys WHERE id = ?1 OR slug = ?1 LIMIT 1",
            [id_or_slug],
            Self::row_to_journey,
        )
        .optional()
        .map_err(Error::from)
    }

    fn row_to_journey(row: &Row) -> rusqlite::Result<Journey> {
        Ok(Journey {
            id: row.get(0)?,
            slug: row.get(1)?,
            name: row.get(2)?,
            position: row.get(3)?,
        })
    }

    // ============================================
    // Process catalog / evaluation / task operations
    // ============================================

    /// Insert or update a catalog process
    pub fn upsert_process(&self, process: &ProcessCatalogEntry) -> Result<()> {
        let conn = self.connection();
        Self::upsert_process_on(&conn, process)?;
        Ok(())
    }

    fn upsert_process_on(conn: &Connection, process: &ProcessCatalogEntry) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO processes (id, journey_id, company_id, is_active) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                journey_id = excluded.journey_id,
                company_id = excluded.company_id,
                is_active = excluded.is_active
            "#,
            params![
                process.process_id,
                process.journey_id,
                process.company_id,
                process.is_active,
            ],
        )
    }

    /// Active catalog processes of a company, optionally for one journey
    pub fn list_active_processes(
        &self,
        company_id: &str,
        journey_id: Option<&str>,
    ) -> Result<Vec<ProcessCatalogEntry>> {
        let conn = self.connection();

        let mut sql = String::from(
            "SELECT id, journey_id, company_id, is_active FROM processes
             WHERE company_id = ? AND is_active = 1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(company_id.to_string())];

        if let Some(journey_id) = journey_id {
            sql.push_str(" AND journey_id = ?");
            params.push(Box::new(journey_id.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let processes = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(ProcessCatalogEntry {
                    process_id: row.get(0)?,
                    journey_id: row.get(1)?,
                    company_id: row.get(2)?,
                    is_active: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(processes)
    }

    /// Append an evaluation. Returns false if the same verdict was already
    /// recorded for `(process_id, evaluated_at)`. A conflicting verdict at
    /// the same instant is kept and wins as the later row.
    pub fn insert_evaluation(&self, evaluation: &MaturityEvaluation) -> Result<bool> {
        let conn = self.connection();
        let inserted = Self::insert_evaluation_on(&conn, evaluation)?;
        Ok(inserted > 0)
    }

    fn insert_evaluation_on(
        conn: &Connection,
        evaluation: &MaturityEvaluation,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO maturity_evaluations (process_id, company_id, evaluated_at, is_mature)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                evaluation.process_id,
                evaluation.company_id,
                format_ts(&evaluation.evaluated_at),
                evaluation.is_mature,
            ],
        )
    }

    /// Latest evaluation of a process at or before the end of `as_of`
    pub fn latest_evaluation_before(
        &self,
        process_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<MaturityEvaluation>> {
        let conn = self.connection();
        conn.query_row(
            r#"
            SELECT process_id, company_id, evaluated_at, is_mature
            FROM maturity_evaluations
            WHERE process_id = ?1 AND evaluated_at < ?2
            ORDER BY evaluated_at DESC, id DESC
            LIMIT 1
            "#,
            params![process_id, format_ts(&end_of_day(as_of))],
            |row| {
                let evaluated_at: String = row.get(2)?;
                Ok(MaturityEvaluation {
                    process_id: row.get(0)?,
                    company_id: row.get(1)?,
                    evaluated_at: parse_ts(2, &evaluated_at)?,
                    is_mature: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert or update a task
    pub fn upsert_task(&self, task: &TaskEvent) -> Result<()> {
        let conn = self.connection();
        Self::upsert_task_on(&conn, task)?;
        Ok(())
    }

    fn upsert_task_on(conn: &Connection, task: &TaskEvent) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO tasks (id, company_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                company_id = excluded.company_id,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
            params![
                task.id,
                task.company_id,
                task.status.as_str(),
                format_ts(&task.created_at),
                format_ts(&task.updated_at),
            ],
        )
    }

    /// Tasks of a company matching the filter, oldest update first
    pub fn list_tasks(&self, company_id: &str, filter: &TaskFilter) -> Result<Vec<TaskEvent>> {
        let conn = self.connection();

        let mut sql = String::from(
            "SELECT id, company_id, status, created_at, updated_at FROM tasks WHERE company_id = ?",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(company_id.to_string())];

        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(after) = &filter.updated_after {
            sql.push_str(" AND updated_at >= ?");
            params.push(Box::new(format_ts(after)));
        }

        if let Some(before) = &filter.updated_before {
            sql.push_str(" AND updated_at < ?");
            params.push(Box::new(format_ts(before)));
        }

        sql.push_str(" ORDER BY updated_at, id");

        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let status_str: String = row.get(2)?;
                let created_at: String = row.get(3)?;
                let updated_at: String = row.get(4)?;
                Ok(TaskEvent {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    status: status_str.parse().map_err(|e| conversion_error(2, e))?,
                    created_at: parse_ts(3, &created_at)?,
                    updated_at: parse_ts(4, &updated_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Write a whole fact bundle in one transaction.
    pub fn insert_fact_bundle(&self, bundle: &FactBundle) -> Result<BundleCounts> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        let mut counts = BundleCounts::default();

        for company in &bundle.companies {
            Self::upsert_company_on(&tx, company)?;
            counts.companies += 1;
        }
        for journey in &bundle.journeys {
            Self::upsert_journey_on(&tx, journey)?;
            counts.journeys += 1;
        }
        for process in &bundle.processes {
            Self::upsert_process_on(&tx, process)?;
            counts.processes += 1;
        }
        for evaluation in &bundle.evaluations {
            if Self::insert_evaluation_on(&tx, evaluation)? > 0 {
                counts.evaluations_inserted += 1;
            } else {
                counts.evaluations_skipped += 1;
            }
        }
        for task in &bundle.tasks {
            Self::upsert_task_on(&tx, task)?;
            counts.tasks += 1;
        }

        tx.commit()?;
        Ok(counts)
    }

    // ============================================
    // Snapshot store
    // ============================================

    /// Insert or overwrite the snapshot for its key
    pub fn upsert_snapshot(
        &self,
        snapshot: &JourneyMaturitySnapshot,
    ) -> Result<JourneyMaturitySnapshot> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO journey_maturity_snapshots (
                id, company_id, journey_id, snapshot_type, snapshot_date,
                total_processes, mature_processes, in_progress_processes,
                pending_processes, maturity_percentage, computed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(company_id, journey_id, snapshot_type, snapshot_date) DO UPDATE SET
                total_processes = excluded.total_processes,
                mature_processes = excluded.mature_processes,
                in_progress_processes = excluded.in_progress_processes,
                pending_processes = excluded.pending_processes,
                maturity_percentage = excluded.maturity_percentage,
                computed_at = excluded.computed_at
            "#,
            params![
                snapshot.id,
                snapshot.company_id,
                snapshot.journey_id,
                snapshot.snapshot_type.as_str(),
                format_date(snapshot.snapshot_date),
                snapshot.total_processes,
                snapshot.mature_processes,
                snapshot.in_progress_processes,
                snapshot.pending_processes,
                snapshot.maturity_percentage,
                format_ts(&snapshot.computed_at),
            ],
        )?;

        let stored = tx.query_row(
            r#"
            SELECT * FROM journey_maturity_snapshots
            WHERE company_id = ?1 AND journey_id = ?2 AND snapshot_type = ?3 AND snapshot_date = ?4
            "#,
            params![
                snapshot.company_id,
                snapshot.journey_id,
                snapshot.snapshot_type.as_str(),
                format_date(snapshot.snapshot_date),
            ],
            Self::row_to_snapshot,
        )?;

        tx.commit()?;
        Ok(stored)
    }

    /// Range select over the snapshot store
    pub fn select_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<JourneyMaturitySnapshot>> {
        let conn = self.connection();

        let mut sql = String::from("SELECT * FROM journey_maturity_snapshots WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(company_id) = &filter.company_id {
            sql.push_str(" AND company_id = ?");
            params.push(Box::new(company_id.clone()));
        }

        if let Some(journey_id) = &filter.journey_id {
            sql.push_str(" AND journey_id = ?");
            params.push(Box::new(journey_id.clone()));
        }

        if let Some(snapshot_type) = &filter.snapshot_type {
            sql.push_str(" AND snapshot_type = ?");
            params.push(Box::new(snapshot_type.as_str().to_string()));
        }

        if let Some(start) = filter.start {
            sql.push_str(" AND snapshot_date >= ?");
            params.push(Box::new(format_date(start)));
        }

        if let Some(end) = filter.end {
            sql.push_str(" AND snapshot_date <= ?");
            params.push(Box::new(format_date(end)));
        }

        sql.push_str(" ORDER BY snapshot_date ASC, snapshot_type ASC, journey_id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let snapshots = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter()),
                Self::row_to_snapshot,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snapshots)
    }

    /// Delete snapshots dated strictly before `cutoff`
    pub fn delete_snapshots_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let conn = self.connection();
        let deleted = conn.execute(
            "DELETE FROM journey_maturity_snapshots WHERE snapshot_date < ?",
            [format_date(cutoff)],
        )?;
        Ok(deleted)
    }

    /// Total number of stored snapshots
    pub fn count_snapshots(&self) -> Result<i64> {
        let conn = self.connection();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM journey_maturity_snapshots",
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn row_to_snapshot(row: &Row) -> rusqlite::Result<JourneyMaturitySnapshot> {
        let snapshot_type: String = row.get("snapshot_type")?;
        let snapshot_date: String = row.get("snapshot_date")?;
        let computed_at: String = row.get("computed_at")?;

        Ok(JourneyMaturitySnapshot {
            id: row.get("id")?,
            company_id: row.get("company_id")?,
            journey_id: row.get("journey_id")?,
            snapshot_type: snapshot_type.parse().map_err(|e| conversion_error(3, e))?,
            snapshot_date: parse_date(4, &snapshot_date)?,
            total_processes: row.get("total_processes")?,
            mature_processes: row.get("mature_processes")?,
            in_progress_processes: row.get("in_progress_processes")?,
            pending_processes: row.get("pending_processes")?,
            maturity_percentage: row.get("maturity_percentage")?,
            computed_at: parse_ts(10, &computed_at)?,
        })
    }

    // ============================================
    // Import checkpoints
    // ============================================

    /// Get the last import checkpoint for a fact file
    pub fn get_import_checkpoint(&self, source_path: &str) -> Result<Option<ImportCheckpoint>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT source_path, content_hash, imported_at FROM import_checkpoints WHERE source_path = ?",
            [source_path],
            |row| {
                let imported_at: String = row.get(2)?;
                Ok(ImportCheckpoint {
                    source_path: row.get(0)?,
                    content_hash: row.get(1)?,
                    imported_at: parse_ts(2, &imported_at)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Record that a fact file was imported with the given content hash
    pub fn set_import_checkpoint(&self, checkpoint: &ImportCheckpoint) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO import_checkpoints (source_path, content_hash, imported_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(source_path) DO UPDATE SET
                content_hash = excluded.content_hash,
                imported_at = excluded.imported_at
            "#,
            params![
                checkpoint.source_path,
                checkpoint.content_hash,
                format_ts(&checkpoint.imported_at),
            ],
        )?;
        Ok(())
    }
}

impl FactSource for Database {
    fn list_active_processes(
        &self,
        company_id: &str,
        journey_id: Option<&str>,
    ) -> Result<Vec<ProcessCatalogEntry>> {
        Database::list_active_processes(self, company_id, journey_id)
    }

    fn latest_evaluation_before(
        &self,
        process_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<MaturityEvaluation>> {
        Database::latest_evaluation_before(self, process_id, as_of)
    }

    fn list_tasks(&self, company_id: &str, filter: &TaskFilter) -> Result<Vec<TaskEvent>> {
        Database::list_tasks(self, company_id, filter)
    }

    fn list_journeys(&self) -> Result<Vec<Journey>> {
        Database::list_journeys(self)
    }

    fn get_company(&self, company_id: &str) -> Result<Option<Company>> {
        Database::get_company(self, company_id)
    }
}

impl SnapshotStore for Database {
    fn upsert_snapshot(
        &self,
        snapshot: &JourneyMaturitySnapshot,
    ) -> Result<JourneyMaturitySnapshot> {
        Database::upsert_snapshot(self, snapshot)
    }

    fn select_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<JourneyMaturitySnapshot>> {
        Database::select_snapshots(self, filter)
    }

    fn delete_snapshots_before(&self, cutoff: NaiveDate) -> Result<usize> {
        Database::delete_snapshots_before(self, cutoff)
    }
}
