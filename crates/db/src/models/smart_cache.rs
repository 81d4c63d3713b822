//! Latest-SMART-snapshot cache rows.

use serde::Serialize;
use sqlx::FromRow;

use drivewatch_core::alert::SmartSnapshot;
use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::{DbId, Timestamp};

/// A row from the `smart_cache` table: the last-known diagnostic reading for
/// one drive. Overwritten on every poll; the poll cycle must read it before
/// writing the new reading, since it is the "before" state for transition
/// detection.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SmartCacheRow {
    pub drive_id: DbId,
    pub polled_at: Timestamp,
    pub temperature: Option<f64>,
    pub power_on_hours: Option<i64>,
    pub power_cycle_count: Option<i64>,
    pub reallocated_sectors: Option<i64>,
    pub pending_sectors: Option<i64>,
    pub uncorrectable_errors: Option<i64>,
    pub health_passed: Option<bool>,
}

impl SmartCacheRow {
    /// The transition-detection view of this row.
    pub fn as_snapshot(&self) -> SmartSnapshot {
        SmartSnapshot {
            temperature: self.temperature,
            health_passed: self.health_passed,
        }
    }

    /// Reconstruct a reading from the cached values. Used for new-channel
    /// catch-up, where the current cached state is re-evaluated as if it
    /// were a fresh reading. Attribute rows are not cached and come back
    /// empty.
    pub fn as_reading(&self) -> SmartReading {
        SmartReading {
            timestamp: self.polled_at,
            temperature: self.temperature,
            power_on_hours: self.power_on_hours,
            power_cycle_count: self.power_cycle_count,
            reallocated_sectors: self.reallocated_sectors,
            pending_sectors: self.pending_sectors,
            uncorrectable_errors: self.uncorrectable_errors,
            health_passed: self.health_passed,
            attributes: Vec::new(),
        }
    }
}
