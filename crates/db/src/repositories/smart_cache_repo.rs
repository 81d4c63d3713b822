//! Repository for the single-row-per-drive SMART snapshot cache.

use sqlx::SqlitePool;

use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::DbId;

use crate::models::smart_cache::SmartCacheRow;

/// Column list for `smart_cache` queries.
const COLUMNS: &str = "\
    drive_id, polled_at, temperature, power_on_hours, power_cycle_count, \
    reallocated_sectors, pending_sectors, uncorrectable_errors, health_passed";

/// Access to the latest-reading cache.
///
/// The poll cycle must call [`SmartCacheRepo::get`] *before*
/// [`SmartCacheRepo::upsert`] for the same drive, since the row being overwritten
/// is the "before" state for transition detection.
pub struct SmartCacheRepo;

impl SmartCacheRepo {
    pub async fn get(
        pool: &SqlitePool,
        drive_id: DbId,
    ) -> Result<Option<SmartCacheRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM smart_cache WHERE drive_id = ?");
        sqlx::query_as::<_, SmartCacheRow>(&query)
            .bind(drive_id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the cached snapshot with a new reading.
    pub async fn upsert(
        pool: &SqlitePool,
        drive_id: DbId,
        reading: &SmartReading,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO smart_cache (drive_id, polled_at, temperature, power_on_hours, \
             power_cycle_count, reallocated_sectors, pending_sectors, \
             uncorrectable_errors, health_passed) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (drive_id) DO UPDATE SET \
                 polled_at = excluded.polled_at, \
                 temperature = excluded.temperature, \
                 power_on_hours = excluded.power_on_hours, \
                 power_cycle_count = excluded.power_cycle_count, \
                 reallocated_sectors = excluded.reallocated_sectors, \
                 pending_sectors = excluded.pending_sectors, \
                 uncorrectable_errors = excluded.uncorrectable_errors, \
                 health_passed = excluded.health_passed",
        )
        .bind(drive_id)
        .bind(reading.timestamp)
        .bind(reading.temperature)
        .bind(reading.power_on_hours)
        .bind(reading.power_cycle_count)
        .bind(reading.reallocated_sectors)
        .bind(reading.pending_sectors)
        .bind(reading.uncorrectable_errors)
        .bind(reading.health_passed)
        .execute(pool)
        .await?;
        Ok(())
    }
}
