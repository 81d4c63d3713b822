//! Drive registry rows.

use serde::Serialize;
use sqlx::FromRow;

use drivewatch_core::drive::DriveType;
use drivewatch_core::types::{DbId, Timestamp};

/// A row from the `drives` table.
///
/// `serial_number` is the identity key across diagnostic scans. Rows are
/// never deleted; drives absent from a scan are marked disconnected.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DriveRow {
    pub drive_id: DbId,
    pub serial_number: String,
    pub device_path: String,
    pub vendor: String,
    pub model: String,
    pub firmware_revision: String,
    /// Capacity in bytes.
    pub capacity: i64,
    /// Stored as TEXT; see [`DriveRow::media_type`].
    pub drive_type: String,
    pub rpm: Option<i64>,
    pub interface_type: Option<String>,
    pub logical_sector_size: Option<i64>,
    pub physical_sector_size: Option<i64>,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub is_connected: bool,
}

impl DriveRow {
    /// Typed view of the `drive_type` column.
    pub fn media_type(&self) -> DriveType {
        DriveType::parse(&self.drive_type)
    }
}
