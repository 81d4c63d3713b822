//! Drive identity and health classification.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DriveType
// ---------------------------------------------------------------------------

/// Storage media category reported by the diagnostic scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "HDD")]
    Hdd,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "NVMe")]
    Nvme,
    Unknown,
}

impl DriveType {
    /// Canonical string form, as stored in the `drives` table and used as a
    /// time-series tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hdd => "HDD",
            Self::Ssd => "SSD",
            Self::Nvme => "NVMe",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse the canonical string form. Anything unrecognized maps to
    /// [`DriveType::Unknown`] rather than failing; old rows must stay
    /// readable after the set of known types grows.
    pub fn parse(s: &str) -> Self {
        match s {
            "HDD" => Self::Hdd,
            "SSD" => Self::Ssd,
            "NVMe" => Self::Nvme,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for DriveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Health classification
// ---------------------------------------------------------------------------

/// Coarse health classification derived from a SMART reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveHealth {
    Ok,
    Warning,
    Failed,
    Unknown,
}

impl DriveHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Pending sectors above this count degrade health to `warning`.
pub const PENDING_SECTORS_WARNING_THRESHOLD: i64 = 5;

/// Classify overall drive health from the self-assessment flag and the three
/// sector-error counters. `None` inputs mean the vendor schema did not
/// report the metric and are treated as neutral.
pub fn classify_health(
    passed: Option<bool>,
    reallocated: Option<i64>,
    pending: Option<i64>,
    uncorrectable: Option<i64>,
) -> DriveHealth {
    if passed == Some(false) {
        return DriveHealth::Failed;
    }
    if reallocated.is_some_and(|v| v > 0)
        || pending.is_some_and(|v| v > PENDING_SECTORS_WARNING_THRESHOLD)
        || uncorrectable.is_some_and(|v| v > 0)
    {
        return DriveHealth::Warning;
    }
    if passed == Some(true) {
        return DriveHealth::Ok;
    }
    DriveHealth::Unknown
}

// ---------------------------------------------------------------------------
// DiscoveredDrive
// ---------------------------------------------------------------------------

/// Identity record produced by a diagnostic scan, before persistence.
///
/// The serial number is the identity key across scans; every other field is
/// refreshed on re-scan.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDrive {
    pub serial_number: String,
    pub device_path: String,
    pub vendor: String,
    pub model: String,
    pub firmware_revision: String,
    /// Capacity in bytes.
    pub capacity: i64,
    pub drive_type: DriveType,
    /// Rotational speed in RPM; `None` for non-rotating media.
    pub rpm: Option<i64>,
    pub interface_type: Option<String>,
    pub logical_sector_size: Option<i64>,
    pub physical_sector_size: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
