//! Repository for the `drives` table.

use sqlx::SqlitePool;

use drivewatch_core::drive::DiscoveredDrive;
use drivewatch_core::types::{DbId, Timestamp};

use crate::models::drive::DriveRow;

/// Column list for `drives` queries.
const COLUMNS: &str = "\
    drive_id, serial_number, device_path, vendor, model, firmware_revision, \
    capacity, drive_type, rpm, interface_type, logical_sector_size, \
    physical_sector_size, first_seen, last_seen, is_connected";

/// CRUD operations for the drive registry.
pub struct DriveRepo;

impl DriveRepo {
    pub async fn get(pool: &SqlitePool, drive_id: DbId) -> Result<Option<DriveRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM drives WHERE drive_id = ?");
        sqlx::query_as::<_, DriveRow>(&query)
            .bind(drive_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_serial(
        pool: &SqlitePool,
        serial_number: &str,
    ) -> Result<Option<DriveRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM drives WHERE serial_number = ?");
        sqlx::query_as::<_, DriveRow>(&query)
            .bind(serial_number)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<DriveRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM drives ORDER BY drive_id");
        sqlx::query_as::<_, DriveRow>(&query).fetch_all(pool).await
    }

    pub async fn list_connected(pool: &SqlitePool) -> Result<Vec<DriveRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM drives WHERE is_connected = TRUE ORDER BY drive_id");
        sqlx::query_as::<_, DriveRow>(&query).fetch_all(pool).await
    }

    /// Register a newly discovered drive.
    pub async fn insert_discovered(
        pool: &SqlitePool,
        d: &DiscoveredDrive,
        now: Timestamp,
    ) -> Result<DriveRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO drives (serial_number, device_path, vendor, model, \
             firmware_revision, capacity, drive_type, rpm, interface_type, \
             logical_sector_size, physical_sector_size, first_seen, last_seen, is_connected) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, TRUE) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DriveRow>(&query)
            .bind(&d.serial_number)
            .bind(&d.device_path)
            .bind(&d.vendor)
            .bind(&d.model)
            .bind(&d.firmware_revision)
            .bind(d.capacity)
            .bind(d.drive_type.as_str())
            .bind(d.rpm)
            .bind(&d.interface_type)
            .bind(d.logical_sector_size)
            .bind(d.physical_sector_size)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Refresh a known drive after a re-scan. Everything except identity and
    /// `first_seen` is overwritten; the drive is marked connected.
    pub async fn update_discovered(
        pool: &SqlitePool,
        d: &DiscoveredDrive,
        now: Timestamp,
    ) -> Result<DriveRow, sqlx::Error> {
        let query = format!(
            "UPDATE drives SET device_path = ?, vendor = ?, model = ?, \
             firmware_revision = ?, capacity = ?, drive_type = ?, rpm = ?, \
             interface_type = ?, logical_sector_size = ?, physical_sector_size = ?, \
             last_seen = ?, is_connected = TRUE \
             WHERE serial_number = ? \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DriveRow>(&query)
            .bind(&d.device_path)
            .bind(&d.vendor)
            .bind(&d.model)
            .bind(&d.firmware_revision)
            .bind(d.capacity)
            .bind(d.drive_type.as_str())
            .bind(d.rpm)
            .bind(&d.interface_type)
            .bind(d.logical_sector_size)
            .bind(d.physical_sector_size)
            .bind(now)
            .bind(&d.serial_number)
            .fetch_one(pool)
            .await
    }

    /// Flip the connected flag. Drives are never hard-deleted.
    pub async fn set_connected(
        pool: &SqlitePool,
        drive_id: DbId,
        connected: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE drives SET is_connected = ? WHERE drive_id = ?")
            .bind(connected)
            .bind(drive_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
