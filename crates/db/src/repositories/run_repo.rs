//! Repository for the `benchmark_runs` table.
//!
//! Status transitions are guarded in SQL: every update names the statuses it
//! may move from, so terminal rows are immutable no matter what the caller
//! believes the current state is.

use sqlx::SqlitePool;

use drivewatch_core::types::{DbId, Timestamp};

use crate::models::benchmark_run::{BenchmarkRunRow, RunStatus, TriggerKind};

/// Column list for `benchmark_runs` queries.
const COLUMNS: &str = "\
    run_id, drive_id, started_at, completed_at, status, trigger_kind, \
    num_points, error_message";

/// CRUD operations for benchmark runs.
pub struct RunRepo;

impl RunRepo {
    /// Create a new pending run.
    pub async fn create(
        pool: &SqlitePool,
        drive_id: DbId,
        num_points: i64,
        trigger: TriggerKind,
        started_at: Timestamp,
    ) -> Result<BenchmarkRunRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO benchmark_runs (drive_id, started_at, status, trigger_kind, num_points) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BenchmarkRunRow>(&query)
            .bind(drive_id)
            .bind(started_at)
            .bind(RunStatus::Pending.as_str())
            .bind(trigger.as_str())
            .bind(num_points)
            .fetch_one(pool)
            .await
    }

    pub async fn get(
        pool: &SqlitePool,
        run_id: DbId,
    ) -> Result<Option<BenchmarkRunRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM benchmark_runs WHERE run_id = ?");
        sqlx::query_as::<_, BenchmarkRunRow>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_drive(
        pool: &SqlitePool,
        drive_id: DbId,
    ) -> Result<Vec<BenchmarkRunRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM benchmark_runs WHERE drive_id = ? ORDER BY run_id DESC"
        );
        sqlx::query_as::<_, BenchmarkRunRow>(&query)
            .bind(drive_id)
            .fetch_all(pool)
            .await
    }

    /// The drive's currently active (pending or running) run, if any.
    pub async fn active_for_drive(
        pool: &SqlitePool,
        drive_id: DbId,
    ) -> Result<Option<BenchmarkRunRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM benchmark_runs \
             WHERE drive_id = ? AND status IN (?, ?) LIMIT 1"
        );
        sqlx::query_as::<_, BenchmarkRunRow>(&query)
            .bind(drive_id)
            .bind(RunStatus::Pending.as_str())
            .bind(RunStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Advance `pending → running`. Returns whether the transition applied.
    pub async fn mark_running(pool: &SqlitePool, run_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE benchmark_runs SET status = ? WHERE run_id = ? AND status = ?",
        )
        .bind(RunStatus::Running.as_str())
        .bind(run_id)
        .bind(RunStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal transition into `completed`. Only applies from an active
    /// status; returns whether the transition applied.
    pub async fn complete(
        pool: &SqlitePool,
        run_id: DbId,
        completed_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE benchmark_runs SET status = ?, completed_at = ? \
             WHERE run_id = ? AND status IN (?, ?)",
        )
        .bind(RunStatus::Completed.as_str())
        .bind(completed_at)
        .bind(run_id)
        .bind(RunStatus::Pending.as_str())
        .bind(RunStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal transition into `failed`, storing the causal message.
    pub async fn fail(
        pool: &SqlitePool,
        run_id: DbId,
        error: &str,
        completed_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE benchmark_runs SET status = ?, error_message = ?, completed_at = ? \
             WHERE run_id = ? AND status IN (?, ?)",
        )
        .bind(RunStatus::Failed.as_str())
        .bind(error)
        .bind(completed_at)
        .bind(run_id)
        .bind(RunStatus::Pending.as_str())
        .bind(RunStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one run row. Lifecycle checks live in the engine, which also
    /// removes the run's time-series points.
    pub async fn delete(pool: &SqlitePool, run_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM benchmark_runs WHERE run_id = ?")
            .bind(run_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete every run row for a drive. Returns the number removed.
    pub async fn delete_for_drive(pool: &SqlitePool, drive_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM benchmark_runs WHERE drive_id = ?")
            .bind(drive_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
