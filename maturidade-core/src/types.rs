//! Core domain types for maturidade
//!
//! These types mirror the facts owned by the surrounding business dashboard
//! (companies, journeys, processes, evaluations, tasks) and the snapshots this
//! crate derives from them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Company** | A tenant of the dashboard |
//! | **Journey** | A track of processes a company matures along (shared catalog) |
//! | **Process** | A catalog entry belonging to one journey and one company |
//! | **Evaluation** | A point-in-time verdict on whether a process is mature |
//! | **Bucket** | A calendar period (week, month, quarter, year) a snapshot summarizes |
//! | **Snapshot** | The stored maturity aggregate of one journey for one bucket |
//!
//! Facts are read-only here. Only [`JourneyMaturitySnapshot`] rows are written,
//! and only through the snapshot store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Fact types (owned by other services)
// ============================================

/// A tenant company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
}

/// A maturity journey from the shared catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    pub id: String,
    /// Stable key used for timeline columns (e.g. "financeira")
    pub slug: String,
    /// Display name (e.g. "Jornada Financeira")
    pub name: String,
    /// Display order in charts and exports
    #[serde(default)]
    pub position: i64,
}

/// A process in a company's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCatalogEntry {
    #[serde(rename = "id", alias = "process_id")]
    pub process_id: String,
    pub journey_id: String,
    pub company_id: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A maturity verdict for a process.
///
/// Evaluations are append-only; the most recent one per process is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityEvaluation {
    pub process_id: String,
    pub company_id: String,
    pub evaluated_at: DateTime<Utc>,
    pub is_mature: bool,
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(format!("unknown task status: {}", s)),
        }
    }
}

/// A task record as seen by analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: String,
    pub company_id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================
// Snapshots
// ============================================

/// Bucket granularity of a snapshot.
///
/// Bucket arithmetic (normalization, windows, iteration) is implemented in
/// the analytics module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotType {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl SnapshotType {
    pub const ALL: [SnapshotType; 4] = [
        SnapshotType::Weekly,
        SnapshotType::Monthly,
        SnapshotType::Quarterly,
        SnapshotType::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotType::Weekly => "weekly",
            SnapshotType::Monthly => "monthly",
            SnapshotType::Quarterly => "quarterly",
            SnapshotType::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SnapshotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(SnapshotType::Weekly),
            "monthly" => Ok(SnapshotType::Monthly),
            "quarterly" => Ok(SnapshotType::Quarterly),
            "yearly" => Ok(SnapshotType::Yearly),
            _ => Err(format!("unknown snapshot type: {}", s)),
        }
    }
}

/// Identity of a snapshot row: at most one row exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub company_id: String,
    pub journey_id: String,
    pub snapshot_type: SnapshotType,
    /// Bucket-aligned date
    pub snapshot_date: NaiveDate,
}

/// Stored maturity aggregate of one journey for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyMaturitySnapshot {
    /// Row id, stable across rebuilds of the same key
    pub id: String,
    pub company_id: String,
    pub journey_id: String,
    pub snapshot_type: SnapshotType,
    pub snapshot_date: NaiveDate,
    pub total_processes: i64,
    pub mature_processes: i64,
    /// Completed tasks in the bucket window. Despite the name this counts
    /// recently finished work, not processes currently in progress.
    pub in_progress_processes: i64,
    pub pending_processes: i64,
    pub maturity_percentage: f64,
    /// When the aggregate was last computed
    pub computed_at: DateTime<Utc>,
}

impl JourneyMaturitySnapshot {
    /// Assemble a snapshot from raw counts, deriving `pending` and the percentage.
    ///
    /// `mature` is clamped to `0..=total` so the stored row always satisfies
    /// `mature + pending == total`.
    pub fn from_counts(
        key: SnapshotKey,
        total: i64,
        mature: i64,
        in_progress: i64,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let total = total.max(0);
        let mature = mature.clamp(0, total);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: key.company_id,
            journey_id: key.journey_id,
            snapshot_type: key.snapshot_type,
            snapshot_date: key.snapshot_date,
            total_processes: total,
            mature_processes: mature,
            in_progress_processes: in_progress.max(0),
            pending_processes: total - mature,
            maturity_percentage: maturity_percentage(mature, total),
            computed_at,
        }
    }
}

/// `round(100 * mature / total, 2)`, or 0 when there are no processes.
pub fn maturity_percentage(mature: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(100.0 * mature as f64 / total as f64)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SnapshotKey {
        SnapshotKey {
            company_id: "c1".to_string(),
            journey_id: "j1".to_string(),
            snapshot_type: SnapshotType::Monthly,
            snapshot_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_maturity_percentage() {
        assert_eq!(maturity_percentage(0, 0), 0.0);
        assert_eq!(maturity_percentage(1, 3), 33.33);
        assert_eq!(maturity_percentage(2, 3), 66.67);
        assert_eq!(maturity_percentage(4, 4), 100.0);
    }

    #[test]
    fn test_from_counts_keeps_invariants() {
        let snapshot = JourneyMaturitySnapshot::from_counts(key(), 5, 7, 2, Utc::now());
        assert_eq!(snapshot.mature_processes, 5);
        assert_eq!(snapshot.pending_processes, 0);
        assert_eq!(snapshot.maturity_percentage, 100.0);

        let zero = JourneyMaturitySnapshot::from_counts(key(), 0, 0, 0, Utc::now());
        assert_eq!(zero.total_processes, 0);
        assert_eq!(zero.maturity_percentage, 0.0);
        assert_eq!(
            zero.mature_processes + zero.pending_processes,
            zero.total_processes
        );
    }

    #[test]
    fn test_snapshot_type_round_trip_strings() {
        for t in SnapshotType::ALL {
            assert_eq!(t.as_str().parse::<SnapshotType>().unwrap(), t);
        }
        assert!("daily".parse::<SnapshotType>().is_err());
    }

    #[test]
    fn test_task_status_parse() {
        assert_eq!(
            "in_progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert!("done".parse::<TaskStatus>().is_err());
    }
}
