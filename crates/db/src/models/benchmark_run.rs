//! Benchmark run rows and status/trigger vocabularies.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use drivewatch_core::types::{DbId, Timestamp};

/// Lifecycle status of a benchmark run.
///
/// Transitions are monotonic: `pending → running → completed | failed`.
/// Terminal rows are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Canonical string form, as stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Completed and failed runs accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// What caused a run to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Manual,
    Scheduled,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }
}

/// A row from the `benchmark_runs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BenchmarkRunRow {
    pub run_id: DbId,
    pub drive_id: DbId,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Stored as TEXT; see [`BenchmarkRunRow::run_status`].
    pub status: String,
    pub trigger_kind: String,
    pub num_points: i64,
    pub error_message: Option<String>,
}

impl BenchmarkRunRow {
    /// Typed view of the `status` column. Only the four canonical values are
    /// ever written; anything else would be external tampering and is read
    /// as `Running` so lifecycle guards refuse to mutate the row.
    pub fn run_status(&self) -> RunStatus {
        RunStatus::parse(&self.status).unwrap_or(RunStatus::Running)
    }
}
