//! Snapshot builder
//!
//! Turns the current fact state of one journey into a stored
//! [`JourneyMaturitySnapshot`] for one bucket:
//!
//! 1. active catalog processes of (company, journey) → `total`
//! 2. latest evaluation per process at or before the bucket date → `mature`
//! 3. completed company tasks updated in the bucket window → `in_progress`
//! 4. `pending = total - mature`, percentage rounded to two decimals
//!
//! The row is upserted under its bucket key, so rebuilding a bucket replaces
//! its aggregate instead of adding a row. A company or journey without
//! catalog entries yields a zero snapshot, which is a valid state for new
//! tenants.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use super::AnalyticsContext;
use crate::db::TaskFilter;
use crate::error::Result;
use crate::types::{JourneyMaturitySnapshot, SnapshotKey, SnapshotType, TaskStatus};

/// A journey whose snapshot could not be built during a fan-out build.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyBuildFailure {
    pub journey_id: String,
    pub journey_slug: String,
    pub error: String,
}

/// Outcome of building every journey of a company for one bucket.
#[derive(Debug, Clone, Serialize)]
pub struct BuildAllResult {
    pub company_id: String,
    pub snapshot_type: SnapshotType,
    pub snapshot_date: NaiveDate,
    pub snapshots: Vec<JourneyMaturitySnapshot>,
    pub failures: Vec<JourneyBuildFailure>,
}

impl BuildAllResult {
    /// True when every journey produced a snapshot.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolve the bucket a build targets: the given date (or `now`'s date),
/// normalized to its bucket start.
pub fn resolve_snapshot_date(
    snapshot_type: SnapshotType,
    snapshot_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> NaiveDate {
    snapshot_type.bucket_start(snapshot_date.unwrap_or_else(|| now.date_naive()))
}

/// Compute and upsert the snapshot of one journey for one bucket.
pub fn build_snapshot(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    journey_id: &str,
    snapshot_type: SnapshotType,
    snapshot_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<JourneyMaturitySnapshot> {
    let snapshot = compute_snapshot(ctx, company_id, journey_id, snapshot_type, snapshot_date, now)?;
    let stored = ctx.store.upsert_snapshot(&snapshot)?;

    tracing::debug!(
        company_id,
        journey_id,
        snapshot_type = %snapshot_type,
        snapshot_date = %stored.snapshot_date,
        total = stored.total_processes,
        mature = stored.mature_processes,
        percentage = stored.maturity_percentage,
        "Snapshot stored"
    );

    Ok(stored)
}

/// Compute a snapshot without storing it.
pub fn compute_snapshot(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    journey_id: &str,
    snapshot_type: SnapshotType,
    snapshot_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<JourneyMaturitySnapshot> {
    let snapshot_date = resolve_snapshot_date(snapshot_type, snapshot_date, now);

    let processes = ctx
        .facts
        .list_active_processes(company_id, Some(journey_id))?;
    let total = processes.len() as i64;

    let mut mature = 0i64;
    for process in &processes {
        let latest = ctx
            .facts
            .latest_evaluation_before(&process.process_id, snapshot_date)?;
        if latest.is_some_and(|evaluation| evaluation.is_mature) {
            mature += 1;
        }
    }

    let in_progress = completed_tasks_in_window(ctx, company_id, snapshot_type, snapshot_date)?;

    Ok(JourneyMaturitySnapshot::from_counts(
        SnapshotKey {
            company_id: company_id.to_string(),
            journey_id: journey_id.to_string(),
            snapshot_type,
            snapshot_date,
        },
        total,
        mature,
        in_progress,
        now,
    ))
}

/// Completed tasks of the company updated within the bucket window ending at
/// `snapshot_date`. Company-wide, so every journey of a bucket shares it.
fn completed_tasks_in_window(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    snapshot_type: SnapshotType,
    snapshot_date: NaiveDate,
) -> Result<i64> {
    let window = snapshot_type.bucket_window(snapshot_date);
    let after = window.start.and_time(NaiveTime::MIN).and_utc();
    let before = window
        .end
        .succ_opt()
        .unwrap_or(window.end)
        .and_time(NaiveTime::MIN)
        .and_utc();

    let tasks = ctx.facts.list_tasks(
        company_id,
        &TaskFilter {
            status: Some(TaskStatus::Completed),
            updated_after: Some(after),
            updated_before: Some(before),
        },
    )?;
    Ok(tasks.len() as i64)
}

/// Build the snapshot of every catalog journey for one bucket.
///
/// Journeys are independent: a failure is recorded in
/// [`BuildAllResult::failures`] and the remaining journeys still run. Only a
/// failure to read the journey catalog itself is returned as an error.
pub fn build_all_snapshots(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    snapshot_type: SnapshotType,
    snapshot_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<BuildAllResult> {
    let snapshot_date = resolve_snapshot_date(snapshot_type, snapshot_date, now);
    let journeys = ctx.facts.list_journeys()?;

    let mut result = BuildAllResult {
        company_id: company_id.to_string(),
        snapshot_type,
        snapshot_date,
        snapshots: Vec::with_capacity(journeys.len()),
        failures: Vec::new(),
    };

    for journey in &journeys {
        match build_snapshot(
            ctx,
            company_id,
            &journey.id,
            snapshot_type,
            Some(snapshot_date),
            now,
        ) {
            Ok(snapshot) => result.snapshots.push(snapshot),
            Err(e) => {
                tracing::warn!(
                    company_id,
                    journey_id = %journey.id,
                    journey_slug = %journey.slug,
                    error = %e,
                    "Snapshot build failed for journey"
                );
                result.failures.push(JourneyBuildFailure {
                    journey_id: journey.id.clone(),
                    journey_slug: journey.slug.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        company_id,
        snapshot_type = %snapshot_type,
        snapshot_date = %snapshot_date,
        built = result.snapshots.len(),
        failed = result.failures.len(),
        "Built journey snapshots"
    );

    Ok(result)
}

/// Build every bucket between `start` and `end` (capped at `now`'s bucket),
/// oldest first.
pub fn backfill_snapshots(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    snapshot_type: SnapshotType,
    start: NaiveDate,
    end: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<BuildAllResult>> {
    backfill_dates(snapshot_type, start, end, now)
        .into_iter()
        .map(|date| build_all_snapshots(ctx, company_id, snapshot_type, Some(date), now))
        .collect()
}

/// Bucket dates a backfill over `[start, end]` would build.
pub fn backfill_dates(
    snapshot_type: SnapshotType,
    start: NaiveDate,
    end: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<NaiveDate> {
    let end = end.min(now.date_naive());
    snapshot_type.bucket_dates(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, FactSource};
    use crate::error::Error;
    use crate::types::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn journey(id: &str, slug: &str, position: i64) -> Journey {
        Journey {
            id: id.to_string(),
            slug: slug.to_string(),
            name: format!("Jornada {}", slug),
            position,
        }
    }

    fn process(id: &str, journey_id: &str) -> ProcessCatalogEntry {
        ProcessCatalogEntry {
            process_id: id.to_string(),
            journey_id: journey_id.to_string(),
            company_id: "c1".to_string(),
            is_active: true,
        }
    }

    fn evaluate(db: &Database, process_id: &str, ts: DateTime<Utc>, is_mature: bool) {
        db.insert_evaluation(&MaturityEvaluation {
            process_id: process_id.to_string(),
            company_id: "c1".to_string(),
            evaluated_at: ts,
            is_mature,
        })
        .unwrap();
    }

    /// Company c1 with journey j1 (4 processes) and j2 (no processes).
    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.upsert_company(&Company {
            id: "c1".to_string(),
            name: "Acme".to_string(),
        })
        .unwrap();
        db.upsert_journey(&journey("j1", "estrategica", 1)).unwrap();
        db.upsert_journey(&journey("j2", "financeira", 2)).unwrap();
        for id in ["p1", "p2", "p3", "p4"] {
            db.upsert_process(&process(id, "j1")).unwrap();
        }
        db
    }

    #[test]
    fn test_build_counts_latest_evaluations() {
        let db = seeded_db();
        evaluate(&db, "p1", at(2024, 1, 5), true);
        evaluate(&db, "p2", at(2024, 1, 5), true);
        // p2 regressed later in the month, after the bucket date
        evaluate(&db, "p2", at(2024, 2, 20), false);
        evaluate(&db, "p3", at(2024, 1, 5), false);

        let snapshot = build_snapshot(
            AnalyticsContext::new(&db),
            "c1",
            "j1",
            SnapshotType::Monthly,
            Some(date(2024, 2, 14)),
            at(2024, 3, 1),
        )
        .unwrap();

        assert_eq!(snapshot.snapshot_date, date(2024, 2, 1));
        assert_eq!(snapshot.total_processes, 4);
        assert_eq!(snapshot.mature_processes, 2);
        assert_eq!(snapshot.pending_processes, 2);
        assert_eq!(snapshot.maturity_percentage, 50.0);
    }

    #[test]
    fn test_default_date_is_current_bucket() {
        let db = seeded_db();
        let snapshot = build_snapshot(
            AnalyticsContext::new(&db),
            "c1",
            "j1",
            SnapshotType::Quarterly,
            None,
            at(2024, 5, 17),
        )
        .unwrap();
        assert_eq!(snapshot.snapshot_date, date(2024, 4, 1));
        assert_eq!(snapshot.computed_at, at(2024, 5, 17));
    }

    #[test]
    fn test_rebuild_overwrites_single_row() {
        let db = seeded_db();
        let ctx = AnalyticsContext::new(&db);

        let first = build_snapshot(ctx, "c1", "j1", SnapshotType::Monthly, Some(date(2024, 3, 1)), at(2024, 3, 2)).unwrap();
        assert_eq!(first.mature_processes, 0);

        evaluate(&db, "p1", at(2024, 2, 10), true);
        let second = build_snapshot(ctx, "c1", "j1", SnapshotType::Monthly, Some(date(2024, 3, 1)), at(2024, 3, 3)).unwrap();

        assert_eq!(db.count_snapshots().unwrap(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.mature_processes, 1);
        assert_eq!(second.maturity_percentage, 25.0);
        assert_eq!(second.computed_at, at(2024, 3, 3));
    }

    #[test]
    fn test_zero_state_for_unknown_company_and_empty_journey() {
        let db = seeded_db();
        let ctx = AnalyticsContext::new(&db);

        let empty = build_snapshot(ctx, "c1", "j2", SnapshotType::Monthly, None, at(2024, 3, 2)).unwrap();
        assert_eq!(empty.total_processes, 0);
        assert_eq!(empty.mature_processes, 0);
        assert_eq!(empty.maturity_percentage, 0.0);

        let unknown = build_snapshot(ctx, "nobody", "nothing", SnapshotType::Yearly, None, at(2024, 3, 2)).unwrap();
        assert_eq!(unknown.total_processes, 0);
        assert_eq!(unknown.pending_processes, 0);
        assert_eq!(unknown.maturity_percentage, 0.0);
    }

    #[test]
    fn test_in_progress_counts_completed_tasks_in_window() {
        let db = seeded_db();
        let task = |id: &str, status: TaskStatus, updated: DateTime<Utc>| TaskEvent {
            id: id.to_string(),
            company_id: "c1".to_string(),
            status,
            created_at: at(2024, 1, 1),
            updated_at: updated,
        };
        // Window for the 2024-03-01 monthly bucket: 2024-02-01 ..= 2024-03-01
        db.upsert_task(&task("t1", TaskStatus::Completed, at(2024, 2, 1))).unwrap();
        db.upsert_task(&task("t2", TaskStatus::Completed, at(2024, 3, 1))).unwrap();
        db.upsert_task(&task("t3", TaskStatus::InProgress, at(2024, 2, 10))).unwrap();
        db.upsert_task(&task("t4", TaskStatus::Completed, at(2024, 1, 31))).unwrap();
        db.upsert_task(&task("t5", TaskStatus::Completed, at(2024, 3, 2))).unwrap();

        let snapshot = build_snapshot(
            AnalyticsContext::new(&db),
            "c1",
            "j1",
            SnapshotType::Monthly,
            Some(date(2024, 3, 1)),
            at(2024, 3, 5),
        )
        .unwrap();
        assert_eq!(snapshot.in_progress_processes, 2);
        // Unrelated to maturity counts
        assert_eq!(snapshot.pending_processes, 4);
    }

    /// Fact source that fails for one journey.
    struct FailingJourney<'a> {
        inner: &'a Database,
        failing_journey: &'a str,
    }

    impl FactSource for FailingJourney<'_> {
        fn list_active_processes(
            &self,
            company_id: &str,
            journey_id: Option<&str>,
        ) -> crate::Result<Vec<ProcessCatalogEntry>> {
            if journey_id == Some(self.failing_journey) {
                return Err(Error::Database(rusqlite::Error::InvalidQuery));
            }
            self.inner.list_active_processes(company_id, journey_id)
        }

        fn latest_evaluation_before(
            &self,
            process_id: &str,
            as_of: NaiveDate,
        ) -> crate::Result<Option<MaturityEvaluation>> {
            self.inner.latest_evaluation_before(process_id, as_of)
        }

        fn list_tasks(&self, company_id: &str, filter: &TaskFilter) -> crate::Result<Vec<TaskEvent>> {
            self.inner.list_tasks(company_id, filter)
        }

        fn list_journeys(&self) -> crate::Result<Vec<Journey>> {
            self.inner.list_journeys()
        }

        fn get_company(&self, company_id: &str) -> crate::Result<Option<Company>> {
            self.inner.get_company(company_id)
        }
    }

    #[test]
    fn test_build_all_collects_failures_and_continues() {
        let db = seeded_db();
        db.upsert_journey(&journey("j3", "pessoas", 3)).unwrap();
        let facts = FailingJourney {
            inner: &db,
            failing_journey: "j2",
        };
        let ctx = AnalyticsContext::with_parts(&facts, &db);

        let result = build_all_snapshots(ctx, "c1", SnapshotType::Monthly, None, at(2024, 3, 9)).unwrap();

        assert!(!result.is_complete());
        assert_eq!(result.snapshot_date, date(2024, 3, 1));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].journey_slug, "financeira");
        let built: Vec<_> = result.snapshots.iter().map(|s| s.journey_id.as_str()).collect();
        assert_eq!(built, vec!["j1", "j3"]);
        assert_eq!(db.count_snapshots().unwrap(), 2);
    }

    #[test]
    fn test_backfill_builds_each_bucket_up_to_now() {
        let db = seeded_db();
        let results = backfill_snapshots(
            AnalyticsContext::new(&db),
            "c1",
            SnapshotType::Monthly,
            date(2024, 1, 10),
            date(2024, 12, 31),
            at(2024, 4, 15),
        )
        .unwrap();

        let dates: Vec<_> = results.iter().map(|r| r.snapshot_date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]
        );
        // two journeys per bucket
        assert_eq!(db.count_snapshots().unwrap(), 8);
    }
}
