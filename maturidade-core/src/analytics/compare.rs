//! Maturity of one journey in two arbitrary periods.

use chrono::NaiveDate;
use serde::Serialize;

use super::stats::{growth_rate, Trend};
use super::{AnalyticsContext, DateRange};
use crate::db::SnapshotFilter;
use crate::error::Result;
use crate::types::JourneyMaturitySnapshot;

/// The snapshot that represents one period.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodMaturity {
    pub range: DateRange,
    /// Percentage of the latest snapshot in the period, 0 when there is none
    pub percentage: f64,
    pub snapshot: Option<JourneyMaturitySnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaturityDelta {
    pub difference: f64,
    pub growth_rate: f64,
    pub trend: Trend,
}

impl MaturityDelta {
    pub fn between(before: f64, after: f64) -> Self {
        let difference = after - before;
        Self {
            difference,
            growth_rate: growth_rate(before, after),
            trend: Trend::from_delta(difference),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodComparison {
    pub period1: PeriodMaturity,
    pub period2: PeriodMaturity,
    pub comparison: MaturityDelta,
}

/// Compare the latest snapshot of a journey in each period.
///
/// Periods may overlap or be given in either order.
pub fn compare_maturity_periods(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    journey_id: &str,
    start1: NaiveDate,
    end1: NaiveDate,
    start2: NaiveDate,
    end2: NaiveDate,
) -> Result<PeriodComparison> {
    let period1 = period_maturity(ctx, company_id, journey_id, DateRange::new(start1, end1))?;
    let period2 = period_maturity(ctx, company_id, journey_id, DateRange::new(start2, end2))?;
    let comparison = MaturityDelta::between(period1.percentage, period2.percentage);

    tracing::debug!(
        company_id,
        journey_id,
        period1 = period1.percentage,
        period2 = period2.percentage,
        difference = comparison.difference,
        "Compared maturity periods"
    );

    Ok(PeriodComparison {
        period1,
        period2,
        comparison,
    })
}

fn period_maturity(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    journey_id: &str,
    range: DateRange,
) -> Result<PeriodMaturity> {
    let filter = SnapshotFilter::company(company_id, range.start, range.end).journey(journey_id);
    // Ascending by date, so the last row is the latest
    let snapshot = ctx.store.select_snapshots(&filter)?.pop();
    Ok(PeriodMaturity {
        range,
        percentage: snapshot
            .as_ref()
            .map(|s| s.maturity_percentage)
            .unwrap_or(0.0),
        snapshot,
    })
}
