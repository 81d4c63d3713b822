//! Benchmark schedule rows.

use serde::Serialize;
use sqlx::FromRow;

use drivewatch_core::types::{DbId, Timestamp};

/// A row from the `benchmark_schedules` table.
///
/// `drive_id == None` scopes the schedule to every connected drive at fire
/// time. An enabled schedule always has exactly one live timer registered
/// with the schedule manager; a disabled one has none.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleRow {
    pub id: DbId,
    pub drive_id: Option<DbId>,
    /// Six-field (seconds-first) cron expression.
    pub cron_expression: String,
    pub enabled: bool,
    pub num_points: i64,
    pub last_run: Option<Timestamp>,
    /// Advisory: refreshed from the live timer's next tick when known.
    pub next_run: Option<Timestamp>,
    pub created_at: Timestamp,
}
