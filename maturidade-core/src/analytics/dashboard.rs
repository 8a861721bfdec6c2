//! Everything the maturity dashboard shows for one company and range.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::snapshot::{build_all_snapshots, BuildAllResult};
use super::stats::{get_company_maturity_stats_by_type, CompanyMaturityStats};
use super::timeline::{
    get_all_journey_snapshots, journey_radar, reshape_timeline, JourneySeriesMap, RadarPoint,
    TimelineChart,
};
use super::{AnalyticsContext, DateRange};
use crate::error::Result;
use crate::types::SnapshotType;

#[derive(Debug, Clone, Serialize)]
pub struct MaturityDashboard {
    pub company_id: String,
    pub range: DateRange,
    pub snapshot_type: SnapshotType,
    pub series: JourneySeriesMap,
    pub chart: TimelineChart,
    pub radar: Vec<RadarPoint>,
    pub stats: CompanyMaturityStats,
    /// Set when the range was empty and the current bucket was built on load
    pub backfilled: Option<BuildAllResult>,
}

/// Load series, chart, radar and stats for a company.
///
/// With `backfill_on_empty`, a range without snapshots triggers one build of
/// the current bucket followed by a re-read, so a new tenant sees its present
/// state instead of an empty chart.
pub fn load_dashboard(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    range: DateRange,
    snapshot_type: SnapshotType,
    now: DateTime<Utc>,
    backfill_on_empty: bool,
) -> Result<MaturityDashboard> {
    let mut series =
        get_all_journey_snapshots(ctx, company_id, range.start, range.end, snapshot_type)?;

    let mut backfilled = None;
    if series.is_empty() && backfill_on_empty {
        tracing::info!(
            company_id,
            snapshot_type = %snapshot_type,
            "No snapshots in range, building current bucket"
        );
        backfilled = Some(build_all_snapshots(ctx, company_id, snapshot_type, None, now)?);
        series = get_all_journey_snapshots(ctx, company_id, range.start, range.end, snapshot_type)?;
    }

    let stats = get_company_maturity_stats_by_type(
        ctx,
        company_id,
        range.start,
        range.end,
        snapshot_type,
    )?;

    Ok(MaturityDashboard {
        company_id: company_id.to_string(),
        range,
        snapshot_type,
        chart: reshape_timeline(&series),
        radar: journey_radar(&series),
        series,
        stats,
        backfilled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RangePreset;
    use crate::db::Database;
    use crate::types::{Company, Journey, MaturityEvaluation, ProcessCatalogEntry};
    use chrono::{NaiveDate, TimeZone};

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.upsert_company(&Company {
            id: "c1".to_string(),
            name: "Acme".to_string(),
        })
        .unwrap();
        db.upsert_journey(&Journey {
            id: "j1".to_string(),
            slug: "estrategica".to_string(),
            name: "Estratégica".to_string(),
            position: 1,
        })
        .unwrap();
        for id in ["p1", "p2"] {
            db.upsert_process(&ProcessCatalogEntry {
                process_id: id.to_string(),
                journey_id: "j1".to_string(),
                company_id: "c1".to_string(),
                is_active: true,
            })
            .unwrap();
        }
        db.insert_evaluation(&MaturityEvaluation {
            process_id: "p1".to_string(),
            company_id: "c1".to_string(),
            evaluated_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
            is_mature: true,
        })
        .unwrap();
        db
    }

    #[test]
    fn test_empty_range_builds_current_bucket() {
        let db = seeded_db();
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap();
        let range = RangePreset::SixMonths.resolve(now.date_naive());

        let dashboard = load_dashboard(
            AnalyticsContext::new(&db),
            "c1",
            range,
            SnapshotType::Monthly,
            now,
            true,
        )
        .unwrap();

        let backfilled = dashboard.backfilled.as_ref().unwrap();
        assert_eq!(backfilled.snapshot_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(dashboard.chart.rows.len(), 1);
        // Evaluation on 05-02 is after the 05-01 bucket date
        assert_eq!(dashboard.chart.rows[0].value("estrategica"), 0.0);
        assert_eq!(dashboard.stats.total_processes, 2);
        assert_eq!(dashboard.radar.len(), 1);
    }

    #[test]
    fn test_no_backfill_when_disabled_or_present() {
        let db = seeded_db();
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap();
        let range = RangePreset::ThreeMonths.resolve(now.date_naive());
        let ctx = AnalyticsContext::new(&db);

        let disabled = load_dashboard(ctx, "c1", range, SnapshotType::Monthly, now, false).unwrap();
        assert!(disabled.backfilled.is_none());
        assert!(disabled.chart.is_empty());
        assert_eq!(db.count_snapshots().unwrap(), 0);

        load_dashboard(ctx, "c1", range, SnapshotType::Monthly, now, true).unwrap();
        let second = load_dashboard(ctx, "c1", range, SnapshotType::Monthly, now, true).unwrap();
        assert!(second.backfilled.is_none());
        assert_eq!(db.count_snapshots().unwrap(), 1);
    }
}
