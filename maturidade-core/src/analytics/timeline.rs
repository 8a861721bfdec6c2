//! Timeline reader
//!
//! Reads stored snapshots back as per-journey series and reshapes them into
//! the wide layout charts and CSV export consume: one row per date, one
//! column per journey. Nothing here writes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::AnalyticsContext;
use crate::db::SnapshotFilter;
use crate::error::Result;
use crate::types::{JourneyMaturitySnapshot, SnapshotType};

/// One snapshot of one journey, as plotted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub percentage: f64,
    pub total: i64,
    pub mature: i64,
    pub in_progress: i64,
    pub pending: i64,
}

impl From<&JourneyMaturitySnapshot> for TimelinePoint {
    fn from(snapshot: &JourneyMaturitySnapshot) -> Self {
        Self {
            date: snapshot.snapshot_date,
            percentage: snapshot.maturity_percentage,
            total: snapshot.total_processes,
            mature: snapshot.mature_processes,
            in_progress: snapshot.in_progress_processes,
            pending: snapshot.pending_processes,
        }
    }
}

/// All snapshots of one journey in a range, ascending by date.
#[derive(Debug, Clone, Serialize)]
pub struct JourneySeries {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// Catalog position; journeys missing from the catalog sort last.
    pub position: i64,
    pub snapshots: Vec<JourneyMaturitySnapshot>,
}

impl JourneySeries {
    pub fn points(&self) -> Vec<TimelinePoint> {
        self.snapshots.iter().map(TimelinePoint::from).collect()
    }

    pub fn latest(&self) -> Option<&JourneyMaturitySnapshot> {
        self.snapshots.last()
    }

    pub fn earliest(&self) -> Option<&JourneyMaturitySnapshot> {
        self.snapshots.first()
    }
}

/// Journey series keyed by slug.
pub type JourneySeriesMap = BTreeMap<String, JourneySeries>;

/// Snapshot series of a single journey, ascending by calendar date.
pub fn get_journey_timeline(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    journey_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    snapshot_type: SnapshotType,
) -> Result<Vec<TimelinePoint>> {
    let filter = SnapshotFilter::company(company_id, start, end)
        .journey(journey_id)
        .snapshot_type(snapshot_type);
    let snapshots = ctx.store.select_snapshots(&filter)?;
    Ok(snapshots.iter().map(TimelinePoint::from).collect())
}

/// Snapshots of every journey of a company in a range, grouped by journey.
///
/// Snapshots whose journey is no longer in the catalog are kept, keyed and
/// named by their journey id.
pub fn get_all_journey_snapshots(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    snapshot_type: SnapshotType,
) -> Result<JourneySeriesMap> {
    let filter = SnapshotFilter::company(company_id, start, end).snapshot_type(snapshot_type);
    let snapshots = ctx.store.select_snapshots(&filter)?;
    if snapshots.is_empty() {
        return Ok(JourneySeriesMap::new());
    }

    let catalog: HashMap<String, _> = ctx
        .facts
        .list_journeys()?
        .into_iter()
        .map(|journey| (journey.id.clone(), journey))
        .collect();

    let mut series = JourneySeriesMap::new();
    for snapshot in snapshots {
        let (slug, name, position) = match catalog.get(&snapshot.journey_id) {
            Some(journey) => (journey.slug.clone(), journey.name.clone(), journey.position),
            None => (
                snapshot.journey_id.clone(),
                snapshot.journey_id.clone(),
                i64::MAX,
            ),
        };
        series
            .entry(slug.clone())
            .or_insert_with(|| JourneySeries {
                id: snapshot.journey_id.clone(),
                slug,
                name,
                position,
                snapshots: Vec::new(),
            })
            .snapshots
            .push(snapshot);
    }

    tracing::debug!(
        company_id,
        snapshot_type = %snapshot_type,
        journeys = series.len(),
        "Loaded journey snapshots"
    );

    Ok(series)
}

/// Series in catalog display order (position, then slug).
pub fn ordered_series(series: &JourneySeriesMap) -> Vec<&JourneySeries> {
    let mut ordered: Vec<_> = series.values().collect();
    ordered.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.slug.cmp(&b.slug)));
    ordered
}

/// A column of the wide timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartColumn {
    pub slug: String,
    pub name: String,
}

/// One date of the wide timeline, with a value for every column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

impl TimelineRow {
    /// `dd/mm/yyyy`, the format shown on chart axes and in exports.
    pub fn label(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }

    pub fn value(&self, slug: &str) -> f64 {
        self.values.get(slug).copied().unwrap_or(0.0)
    }
}

/// Wide timeline: one row per date, one column per journey.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimelineChart {
    pub columns: Vec<ChartColumn>,
    pub rows: Vec<TimelineRow>,
}

impl TimelineChart {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pivot per-journey series into a wide table.
///
/// Rows cover every date present in any series and are sorted by calendar
/// date. A journey with no snapshot on a row's date gets 0 for that row.
pub fn reshape_timeline(series: &JourneySeriesMap) -> TimelineChart {
    let ordered = ordered_series(series);

    let columns: Vec<ChartColumn> = ordered
        .iter()
        .map(|s| ChartColumn {
            slug: s.slug.clone(),
            name: s.name.clone(),
        })
        .collect();

    let dates: BTreeSet<NaiveDate> = ordered
        .iter()
        .flat_map(|s| s.snapshots.iter().map(|snap| snap.snapshot_date))
        .collect();

    let mut rows: Vec<TimelineRow> = dates
        .into_iter()
        .map(|date| TimelineRow {
            date,
            values: columns.iter().map(|c| (c.slug.clone(), 0.0)).collect(),
        })
        .collect();

    for s in &ordered {
        for snapshot in &s.snapshots {
            // rows are sorted by date, so binary search finds the slot
            if let Ok(idx) = rows.binary_search_by(|row| row.date.cmp(&snapshot.snapshot_date)) {
                rows[idx]
                    .values
                    .insert(s.slug.clone(), snapshot.maturity_percentage);
            }
        }
    }

    TimelineChart { columns, rows }
}

/// Per-journey comparison of the start and end of a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarPoint {
    pub slug: String,
    pub name: String,
    /// Latest percentage in the range
    pub current: f64,
    /// Earliest percentage in the range
    pub previous: f64,
}

pub fn journey_radar(series: &JourneySeriesMap) -> Vec<RadarPoint> {
    ordered_series(series)
        .into_iter()
        .map(|s| RadarPoint {
            slug: s.slug.clone(),
            name: s.name.clone(),
            current: s.latest().map(|snap| snap.maturity_percentage).unwrap_or(0.0),
            previous: s.earliest().map(|snap| snap.maturity_percentage).unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::types::{Journey, SnapshotKey};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store(db: &Database, journey_id: &str, snapshot_date: NaiveDate, mature: i64) {
        let snapshot = JourneyMaturitySnapshot::from_counts(
            SnapshotKey {
                company_id: "c1".to_string(),
                journey_id: journey_id.to_string(),
                snapshot_type: SnapshotType::Monthly,
                snapshot_date,
            },
            10,
            mature,
            0,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        );
        db.upsert_snapshot(&snapshot).unwrap();
    }

    fn db_with_journeys() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        for (id, slug, name, position) in [
            ("j1", "estrategica", "Estratégica", 1),
            ("j2", "financeira", "Financeira", 2),
        ] {
            db.upsert_journey(&Journey {
                id: id.to_string(),
                slug: slug.to_string(),
                name: name.to_string(),
                position,
            })
            .unwrap();
        }
        db
    }

    #[test]
    fn test_timeline_is_in_calendar_order() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 1, 15), 1);
        store(&db, "j1", date(2024, 3, 1), 3);
        store(&db, "j1", date(2024, 2, 1), 2);

        let points = get_journey_timeline(
            AnalyticsContext::new(&db),
            "c1",
            "j1",
            date(2024, 1, 1),
            date(2024, 12, 31),
            SnapshotType::Monthly,
        )
        .unwrap();

        let dates: Vec<_> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 15), date(2024, 2, 1), date(2024, 3, 1)]);
        assert_eq!(points[1].percentage, 20.0);
        assert_eq!(points[1].pending, 8);
    }

    #[test]
    fn test_other_types_are_excluded() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 1, 1), 5);

        let weekly = get_journey_timeline(
            AnalyticsContext::new(&db),
            "c1",
            "j1",
            date(2024, 1, 1),
            date(2024, 12, 31),
            SnapshotType::Weekly,
        )
        .unwrap();
        assert!(weekly.is_empty());
    }

    #[test]
    fn test_grouping_by_slug_with_unknown_journey() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 1, 1), 1);
        store(&db, "j2", date(2024, 1, 1), 2);
        store(&db, "retired", date(2024, 1, 1), 3);

        let series = get_all_journey_snapshots(
            AnalyticsContext::new(&db),
            "c1",
            date(2024, 1, 1),
            date(2024, 1, 31),
            SnapshotType::Monthly,
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series["financeira"].name, "Financeira");
        assert_eq!(series["retired"].id, "retired");
        let order: Vec<_> = ordered_series(&series).iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(order, vec!["estrategica", "financeira", "retired"]);
    }

    #[test]
    fn test_reshape_fills_missing_dates_with_zero() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 2, 1), 4);
        store(&db, "j1", date(2024, 1, 1), 2);
        store(&db, "j2", date(2024, 2, 1), 7);

        let series = get_all_journey_snapshots(
            AnalyticsContext::new(&db),
            "c1",
            date(2024, 1, 1),
            date(2024, 12, 31),
            SnapshotType::Monthly,
        )
        .unwrap();
        let chart = reshape_timeline(&series);

        assert_eq!(chart.columns.len(), 2);
        assert_eq!(chart.rows.len(), 2);
        assert_eq!(chart.rows[0].label(), "01/01/2024");
        assert_eq!(chart.rows[0].value("estrategica"), 20.0);
        assert_eq!(chart.rows[0].value("financeira"), 0.0);
        assert_eq!(chart.rows[0].values.len(), 2);
        assert_eq!(chart.rows[1].label(), "01/02/2024");
        assert_eq!(chart.rows[1].value("financeira"), 70.0);
    }

    #[test]
    fn test_reshape_orders_rows_by_date_not_label() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 1, 15), 1);
        store(&db, "j2", date(2024, 3, 1), 3);
        store(&db, "j1", date(2024, 2, 1), 2);

        let series = get_all_journey_snapshots(
            AnalyticsContext::new(&db),
            "c1",
            date(2024, 1, 1),
            date(2024, 12, 31),
            SnapshotType::Monthly,
        )
        .unwrap();
        let chart = reshape_timeline(&series);

        let labels: Vec<_> = chart.rows.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["15/01/2024", "01/02/2024", "01/03/2024"]);

        let csv = crate::export::timeline_csv(&chart);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Data,Estratégica,Financeira",
                "15/01/2024,10,0",
                "01/02/2024,20,0",
                "01/03/2024,0,30",
            ]
        );
    }

    #[test]
    fn test_empty_and_inverted_ranges() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 2, 1), 4);

        let series = get_all_journey_snapshots(
            AnalyticsContext::new(&db),
            "c1",
            date(2024, 12, 31),
            date(2024, 1, 1),
            SnapshotType::Monthly,
        )
        .unwrap();
        assert!(series.is_empty());
        assert!(reshape_timeline(&series).is_empty());
        assert!(journey_radar(&series).is_empty());
    }

    #[test]
    fn test_radar_uses_first_and_last_snapshot() {
        let db = db_with_journeys();
        store(&db, "j1", date(2024, 1, 1), 2);
        store(&db, "j1", date(2024, 2, 1), 3);
        store(&db, "j1", date(2024, 3, 1), 6);

        let series = get_all_journey_snapshots(
            AnalyticsContext::new(&db),
            "c1",
            date(2024, 1, 1),
            date(2024, 3, 31),
            SnapshotType::Monthly,
        )
        .unwrap();
        let radar = journey_radar(&series);

        assert_eq!(radar.len(), 1);
        assert_eq!(radar[0].current, 60.0);
        assert_eq!(radar[0].previous, 20.0);
    }
}
