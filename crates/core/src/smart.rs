//! Normalized diagnostic reading shape.
//!
//! The two vendor schemas (ATA attribute tables, NVMe health log) normalize
//! into [`SmartReading`]. Metrics a schema does not report stay `None`;
//! zero is a valid raw value and is never used as a stand-in for "absent".

use serde::{Deserialize, Serialize};

use crate::drive::{classify_health, DriveHealth};
use crate::types::Timestamp;

/// One normalized vendor attribute row.
///
/// For ATA drives this is a row of the SMART attribute table; for NVMe the
/// health-log counters are mapped into the same shape with synthetic ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartAttribute {
    pub attr_id: i64,
    pub name: String,
    pub value: i64,
    pub worst: i64,
    pub threshold: i64,
    pub raw_value: i64,
    pub failing: bool,
}

/// A point-in-time diagnostic reading for one drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartReading {
    pub timestamp: Timestamp,
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    pub power_on_hours: Option<i64>,
    pub power_cycle_count: Option<i64>,
    pub reallocated_sectors: Option<i64>,
    pub pending_sectors: Option<i64>,
    pub uncorrectable_errors: Option<i64>,
    /// Overall self-assessment result; `None` when the device does not
    /// report one.
    pub health_passed: Option<bool>,
    pub attributes: Vec<SmartAttribute>,
}

impl SmartReading {
    /// Coarse health classification for this reading.
    pub fn health(&self) -> DriveHealth {
        classify_health(
            self.health_passed,
            self.reallocated_sectors,
            self.pending_sectors,
            self.uncorrectable_errors,
        )
    }
}
