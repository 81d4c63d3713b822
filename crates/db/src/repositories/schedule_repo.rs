//! Repository for the `benchmark_schedules` table.

use sqlx::SqlitePool;

use drivewatch_core::types::{DbId, Timestamp};

use crate::models::schedule::ScheduleRow;

/// Column list for `benchmark_schedules` queries.
const COLUMNS: &str = "\
    id, drive_id, cron_expression, enabled, num_points, last_run, next_run, \
    created_at";

/// CRUD operations for benchmark schedules.
pub struct ScheduleRepo;

impl ScheduleRepo {
    pub async fn create(
        pool: &SqlitePool,
        drive_id: Option<DbId>,
        cron_expression: &str,
        num_points: i64,
        created_at: Timestamp,
    ) -> Result<ScheduleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO benchmark_schedules (drive_id, cron_expression, enabled, num_points, created_at) \
             VALUES (?, ?, TRUE, ?, ?) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScheduleRow>(&query)
            .bind(drive_id)
            .bind(cron_expression)
            .bind(num_points)
            .bind(created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &SqlitePool, id: DbId) -> Result<Option<ScheduleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM benchmark_schedules WHERE id = ?");
        sqlx::query_as::<_, ScheduleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ScheduleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM benchmark_schedules ORDER BY id");
        sqlx::query_as::<_, ScheduleRow>(&query).fetch_all(pool).await
    }

    pub async fn list_enabled(pool: &SqlitePool) -> Result<Vec<ScheduleRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM benchmark_schedules WHERE enabled = TRUE ORDER BY id");
        sqlx::query_as::<_, ScheduleRow>(&query).fetch_all(pool).await
    }

    pub async fn set_enabled(
        pool: &SqlitePool,
        id: DbId,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE benchmark_schedules SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record that the schedule just fired.
    pub async fn touch_last_run(
        pool: &SqlitePool,
        id: DbId,
        last_run: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE benchmark_schedules SET last_run = ? WHERE id = ?")
            .bind(last_run)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Refresh the advisory next-fire column.
    pub async fn set_next_run(
        pool: &SqlitePool,
        id: DbId,
        next_run: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE benchmark_schedules SET next_run = ? WHERE id = ?")
            .bind(next_run)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM benchmark_schedules WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
