//! Storage seams used by analytics.
//!
//! [`FactSource`] is the read-only view of facts owned by other services;
//! [`SnapshotStore`] is the only writer of snapshot rows. [`crate::Database`]
//! implements both.

use crate::error::Result;
use crate::types::{
    Company, Journey, JourneyMaturitySnapshot, MaturityEvaluation, ProcessCatalogEntry,
    SnapshotType, TaskEvent, TaskStatus,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Filter for task queries.
///
/// `updated_after` is inclusive, `updated_before` is exclusive.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

/// Filter for snapshot range selects.
///
/// Date bounds are inclusive. Results are always ordered by `snapshot_date`
/// ascending, then by snapshot type and journey id.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFilter {
    pub company_id: Option<String>,
    pub journey_id: Option<String>,
    pub snapshot_type: Option<SnapshotType>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SnapshotFilter {
    /// Snapshots of one company within `[start, end]`.
    pub fn company(company_id: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            company_id: Some(company_id.to_string()),
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn journey(mut self, journey_id: &str) -> Self {
        self.journey_id = Some(journey_id.to_string());
        self
    }

    pub fn snapshot_type(mut self, snapshot_type: SnapshotType) -> Self {
        self.snapshot_type = Some(snapshot_type);
        self
    }
}

/// Read-only access to catalog, evaluation and task facts.
pub trait FactSource {
    /// Active catalog processes of a company, optionally limited to one journey.
    fn list_active_processes(
        &self,
        company_id: &str,
        journey_id: Option<&str>,
    ) -> Result<Vec<ProcessCatalogEntry>>;

    /// Most recent evaluation of a process at or before the end of `as_of`.
    ///
    /// Ties on `evaluated_at` resolve to the evaluation recorded last.
    fn latest_evaluation_before(
        &self,
        process_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<MaturityEvaluation>>;

    /// Tasks of a company matching the filter.
    fn list_tasks(&self, company_id: &str, filter: &TaskFilter) -> Result<Vec<TaskEvent>>;

    /// The journey catalog in display order.
    fn list_journeys(&self) -> Result<Vec<Journey>>;

    /// Look up a company by id.
    fn get_company(&self, company_id: &str) -> Result<Option<Company>>;
}

/// Persistence for snapshot rows.
pub trait SnapshotStore {
    /// Insert or overwrite the row for the snapshot's key in one transaction.
    ///
    /// Returns the stored row (its `id` is the existing one on overwrite).
    fn upsert_snapshot(&self, snapshot: &JourneyMaturitySnapshot)
        -> Result<JourneyMaturitySnapshot>;

    /// Range select, ordered ascending by `snapshot_date`.
    fn select_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<JourneyMaturitySnapshot>>;

    /// Delete every row with `snapshot_date < cutoff`; returns the count removed.
    fn delete_snapshots_before(&self, cutoff: NaiveDate) -> Result<usize>;
}
