//! Repository for per-drive temperature alert thresholds.

use sqlx::SqlitePool;

use drivewatch_core::types::DbId;

use crate::models::notification::ThresholdRow;

/// CRUD operations for drive alert thresholds. A drive without a row uses
/// the global default from configuration.
pub struct ThresholdRepo;

impl ThresholdRepo {
    pub async fn get(pool: &SqlitePool, drive_id: DbId) -> Result<Option<ThresholdRow>, sqlx::Error> {
        sqlx::query_as::<_, ThresholdRow>(
            "SELECT drive_id, temperature_threshold_celsius \
             FROM drive_alert_thresholds WHERE drive_id = ?",
        )
        .bind(drive_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ThresholdRow>, sqlx::Error> {
        sqlx::query_as::<_, ThresholdRow>(
            "SELECT drive_id, temperature_threshold_celsius \
             FROM drive_alert_thresholds ORDER BY drive_id",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn set(
        pool: &SqlitePool,
        drive_id: DbId,
        threshold_celsius: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO drive_alert_thresholds (drive_id, temperature_threshold_celsius) \
             VALUES (?, ?) \
             ON CONFLICT (drive_id) DO UPDATE SET temperature_threshold_celsius = excluded.temperature_threshold_celsius",
        )
        .bind(drive_id)
        .bind(threshold_celsius)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, drive_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM drive_alert_thresholds WHERE drive_id = ?")
            .bind(drive_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
