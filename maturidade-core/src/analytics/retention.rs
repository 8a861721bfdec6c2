//! Explicit snapshot cleanup.

use chrono::{Days, NaiveDate};

use super::AnalyticsContext;
use crate::error::Result;

/// Delete every snapshot dated strictly before `before`, across all
/// companies, journeys and types. Rows dated `before` are kept.
pub fn delete_old_snapshots(ctx: AnalyticsContext<'_>, before: NaiveDate) -> Result<usize> {
    let deleted = ctx.store.delete_snapshots_before(before)?;
    tracing::info!(cutoff = %before, deleted, "Deleted old snapshots");
    Ok(deleted)
}

/// Cutoff that keeps the last `days` days ending at `today`.
pub fn retention_cutoff(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::types::{JourneyMaturitySnapshot, SnapshotKey, SnapshotType};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store(db: &Database, company_id: &str, snapshot_type: SnapshotType, snapshot_date: NaiveDate) {
        let snapshot = JourneyMaturitySnapshot::from_counts(
            SnapshotKey {
                company_id: company_id.to_string(),
                journey_id: "j1".to_string(),
                snapshot_type,
                snapshot_date,
            },
            4,
            1,
            0,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        );
        db.upsert_snapshot(&snapshot).unwrap();
    }

    #[test]
    fn test_cutoff_is_exclusive() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        store(&db, "c1", SnapshotType::Monthly, date(2023, 12, 1));
        store(&db, "c2", SnapshotType::Weekly, date(2023, 12, 25));
        store(&db, "c1", SnapshotType::Monthly, date(2024, 1, 1));
        store(&db, "c1", SnapshotType::Monthly, date(2024, 2, 1));

        let deleted = delete_old_snapshots(AnalyticsContext::new(&db), date(2024, 1, 1)).unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(db.count_snapshots().unwrap(), 2);

        // Nothing left to delete on a second run
        let again = delete_old_snapshots(AnalyticsContext::new(&db), date(2024, 1, 1)).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn test_retention_cutoff() {
        assert_eq!(retention_cutoff(date(2024, 3, 1), 29), date(2024, 2, 1));
        assert_eq!(retention_cutoff(date(2024, 3, 1), 0), date(2024, 3, 1));
    }
}
