//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//!
//! Dates are stored as `YYYY-MM-DD` and timestamps as fixed-width RFC 3339
//! UTC strings, so lexical order in SQL equals calendar order.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: fact tables and the snapshot store
    r#"
    -- ============================================
    -- FACTS (owned by other services, read-only to analytics)
    -- ============================================

    CREATE TABLE IF NOT EXISTS companies (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS journeys (
        id               TEXT PRIMARY KEY,
        slug             TEXT NOT NULL UNIQUE,
        name             TEXT NOT NULL,
        position         INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS processes (
        id               TEXT PRIMARY KEY,
        journey_id       TEXT NOT NULL,
        company_id       TEXT NOT NULL,
        is_active        INTEGER NOT NULL DEFAULT 1
    );

    CREATE INDEX IF NOT EXISTS idx_processes_company_journey
        ON processes(company_id, journey_id) WHERE is_active = 1;

    -- Append-only; latest evaluated_at per process wins, then latest id
    CREATE TABLE IF NOT EXISTS maturity_evaluations (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        process_id       TEXT NOT NULL,
        company_id       TEXT NOT NULL,
        evaluated_at     DATETIME NOT NULL,
        is_mature        INTEGER NOT NULL,

        UNIQUE(process_id, evaluated_at, is_mature)
    );

    CREATE INDEX IF NOT EXISTS idx_evaluations_process_ts
        ON maturity_evaluations(process_id, evaluated_at DESC);

    CREATE TABLE IF NOT EXISTS tasks (
        id               TEXT PRIMARY KEY,
        company_id       TEXT NOT NULL,
        status           TEXT NOT NULL,      -- 'pending', 'in_progress', 'completed'
        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_company_status_updated
        ON tasks(company_id, status, updated_at);

    -- ============================================
    -- DERIVED (regenerable)
    -- ============================================

    CREATE TABLE IF NOT EXISTS journey_maturity_snapshots (
        id                     TEXT PRIMARY KEY,
        company_id             TEXT NOT NULL,
        journey_id             TEXT NOT NULL,
        snapshot_type          TEXT NOT NULL,  -- 'weekly', 'monthly', 'quarterly', 'yearly'
        snapshot_date          DATE NOT NULL,  -- bucket start
        total_processes        INTEGER NOT NULL DEFAULT 0,
        mature_processes       INTEGER NOT NULL DEFAULT 0,
        in_progress_processes  INTEGER NOT NULL DEFAULT 0,
        pending_processes      INTEGER NOT NULL DEFAULT 0,
        maturity_percentage    REAL NOT NULL DEFAULT 0,
        computed_at            DATETIME NOT NULL,

        UNIQUE(company_id, journey_id, snapshot_type, snapshot_date),
        CHECK(mature_processes BETWEEN 0 AND total_processes),
        CHECK(maturity_percentage BETWEEN 0 AND 100)
    );

    CREATE INDEX IF NOT EXISTS idx_snapshots_company_range
        ON journey_maturity_snapshots(company_id, snapshot_type, snapshot_date);
    CREATE INDEX IF NOT EXISTS idx_snapshots_date
        ON journey_maturity_snapshots(snapshot_date);
    "#,
    // Version 2: import checkpoints so unchanged fact files are skipped
    r#"
    CREATE TABLE IF NOT EXISTS import_checkpoints (
        source_path      TEXT PRIMARY KEY,
        content_hash     TEXT NOT NULL,
        imported_at      DATETIME NOT NULL
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
