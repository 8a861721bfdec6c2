//! Analytics module for maturidade
//!
//! Provides journey maturity aggregates including:
//! - Snapshot building (one stored row per company, journey and bucket)
//! - Timeline reading and reshaping for charts
//! - Company statistics and growth trends
//! - Period comparison for a single journey
//! - Retention cleanup
//!
//! ## Snapshots
//!
//! Maturity is computed from fact tables (process catalog, evaluations,
//! tasks) and stored as [`JourneyMaturitySnapshot`](crate::JourneyMaturitySnapshot)
//! rows, one per bucket. Every read here works on stored rows only; the
//! [`dashboard`] loader is the one place that builds on demand.
//!
//! All entry points take an [`AnalyticsContext`] and an injected `now` or
//! explicit dates, never the system clock.

mod bucket;
pub mod compare;
mod context;
pub mod dashboard;
pub mod range;
pub mod retention;
pub mod snapshot;
pub mod stats;
pub mod timeline;

pub use compare::{compare_maturity_periods, MaturityDelta, PeriodComparison, PeriodMaturity};
pub use context::AnalyticsContext;
pub use dashboard::{load_dashboard, MaturityDashboard};
pub use range::{parse_date, DateRange, RangePreset};
pub use retention::{delete_old_snapshots, retention_cutoff};
pub use snapshot::{
    backfill_dates, backfill_snapshots, build_all_snapshots, build_snapshot, compute_snapshot,
    BuildAllResult, JourneyBuildFailure,
};
pub use stats::{
    compute_stats, get_company_maturity_stats, get_company_maturity_stats_by_type, growth_rate,
    CompanyMaturityStats, Trend,
};
pub use timeline::{
    get_all_journey_snapshots, get_journey_timeline, journey_radar, ordered_series,
    reshape_timeline, ChartColumn, JourneySeries, JourneySeriesMap, RadarPoint, TimelineChart,
    TimelinePoint, TimelineRow,
};
