//! Company-wide maturity statistics over a date range.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::AnalyticsContext;
use crate::db::SnapshotFilter;
use crate::error::Result;
use crate::types::{round2, JourneyMaturitySnapshot, SnapshotType};

/// Direction of change between two percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

impl Trend {
    /// Trend from the sign of a delta.
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Trend::Up
        } else if delta < 0.0 {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `100 * (current - base) / base`, or 0 when `base` is not positive.
pub fn growth_rate(base: f64, current: f64) -> f64 {
    if base > 0.0 {
        100.0 * (current - base) / base
    } else {
        0.0
    }
}

/// Summary statistics of a company over a date range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMaturityStats {
    pub average_maturity: f64,
    /// Sum over all returned rows, so a process counts once per snapshot.
    pub total_processes: i64,
    pub mature_processes: i64,
    pub journey_count: usize,
    pub trend: Trend,
    pub growth_rate: f64,
}

/// Aggregate a set of snapshot rows.
///
/// Oldest and latest are taken by `snapshot_date`; among rows sharing the
/// extreme date the first and last in the given order win.
pub fn compute_stats(snapshots: &[JourneyMaturitySnapshot]) -> CompanyMaturityStats {
    if snapshots.is_empty() {
        return CompanyMaturityStats::default();
    }

    let total_processes = snapshots.iter().map(|s| s.total_processes).sum();
    let mature_processes = snapshots.iter().map(|s| s.mature_processes).sum();
    let average_maturity =
        snapshots.iter().map(|s| s.maturity_percentage).sum::<f64>() / snapshots.len() as f64;
    let journey_count = snapshots
        .iter()
        .map(|s| s.journey_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let oldest = snapshots
        .iter()
        .reduce(|best, s| if s.snapshot_date < best.snapshot_date { s } else { best });
    let latest = snapshots
        .iter()
        .reduce(|best, s| if s.snapshot_date >= best.snapshot_date { s } else { best });

    let growth_rate = match (oldest, latest) {
        (Some(oldest), Some(latest)) => {
            growth_rate(oldest.maturity_percentage, latest.maturity_percentage)
        }
        _ => 0.0,
    };

    CompanyMaturityStats {
        average_maturity,
        total_processes,
        mature_processes,
        journey_count,
        trend: Trend::from_delta(growth_rate),
        growth_rate,
    }
}

/// Statistics over every snapshot of the company in range, all types mixed.
pub fn get_company_maturity_stats(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CompanyMaturityStats> {
    let snapshots = ctx
        .store
        .select_snapshots(&SnapshotFilter::company(company_id, start, end))?;
    Ok(compute_stats(&snapshots))
}

/// Statistics restricted to one snapshot type.
pub fn get_company_maturity_stats_by_type(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    snapshot_type: SnapshotType,
) -> Result<CompanyMaturityStats> {
    let filter = SnapshotFilter::company(company_id, start, end).snapshot_type(snapshot_type);
    let snapshots = ctx.store.select_snapshots(&filter)?;
    Ok(compute_stats(&snapshots))
}

impl CompanyMaturityStats {
    /// Copy with averages and rates rounded for display.
    pub fn rounded(&self) -> Self {
        Self {
            average_maturity: round2(self.average_maturity),
            growth_rate: round2(self.growth_rate),
            ..self.clone()
        }
    }
}
