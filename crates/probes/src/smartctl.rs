//! smartctl invocation: device scan, identity, and full diagnostics.
//!
//! smartctl exits non-zero for plenty of survivable conditions (pre-fail
//! warnings, stale self-test logs), so a parseable stdout payload is treated
//! as success regardless of exit code.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::process::Command;

use drivewatch_core::drive::{DiscoveredDrive, DriveType};
use drivewatch_core::smart::{SmartAttribute, SmartReading};

use crate::{DiagnosticReader, ProbeError};

/// ATA attribute ids carrying the sector-error counters.
const ATTR_REALLOCATED: i64 = 5;
const ATTR_PENDING: i64 = 197;
const ATTR_UNCORRECTABLE: i64 = 198;

/// How much process output to keep in error messages.
const ERROR_SNIPPET_LEN: usize = 200;

// ---------------------------------------------------------------------------
// smartctl JSON shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ScanResult {
    #[serde(default)]
    devices: Vec<ScanDevice>,
}

#[derive(Debug, Deserialize)]
struct ScanDevice {
    name: String,
    #[serde(rename = "type", default)]
    device_type: String,
}

#[derive(Debug, Deserialize)]
struct InfoResult {
    device: Option<InfoDevice>,
    model_name: Option<String>,
    model_family: Option<String>,
    serial_number: Option<String>,
    firmware_version: Option<String>,
    user_capacity: Option<Capacity>,
    rotation_rate: Option<i64>,
    interface_speed: Option<InterfaceSpeed>,
    logical_block_size: Option<i64>,
    physical_block_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InfoDevice {
    #[serde(default)]
    protocol: String,
}

#[derive(Debug, Deserialize)]
struct Capacity {
    bytes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InterfaceSpeed {
    current: Option<InterfaceSpeedEntry>,
}

#[derive(Debug, Deserialize)]
struct InterfaceSpeedEntry {
    string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XallResult {
    smart_status: Option<SmartStatus>,
    temperature: Option<Temperature>,
    power_on_time: Option<PowerOnTime>,
    power_cycle_count: Option<i64>,
    ata_smart_attributes: Option<AtaAttributes>,
    nvme_smart_health_information_log: Option<NvmeHealthLog>,
}

#[derive(Debug, Deserialize)]
struct SmartStatus {
    passed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Temperature {
    current: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PowerOnTime {
    hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AtaAttributes {
    #[serde(default)]
    table: Vec<AtaAttribute>,
}

#[derive(Debug, Deserialize)]
struct AtaAttribute {
    id: i64,
    name: String,
    value: i64,
    worst: i64,
    thresh: i64,
    raw: AtaRaw,
    #[serde(default)]
    when_failed: String,
}

#[derive(Debug, Deserialize)]
struct AtaRaw {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct NvmeHealthLog {
    media_errors: Option<i64>,
    num_err_log_entries: Option<i64>,
    available_spare: Option<i64>,
    percentage_used: Option<i64>,
    controller_busy_time: Option<i64>,
    unsafe_shutdowns: Option<i64>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn parse_ata_attributes(table: &[AtaAttribute]) -> Vec<SmartAttribute> {
    table
        .iter()
        .map(|a| SmartAttribute {
            attr_id: a.id,
            name: a.name.clone(),
            value: a.value,
            worst: a.worst,
            threshold: a.thresh,
            raw_value: a.raw.value,
            failing: !a.when_failed.is_empty() && a.when_failed != "-",
        })
        .collect()
}

/// NVMe health-log counters mapped into the attribute shape with synthetic
/// ids; the log has no worst/threshold concept so those mirror the value.
fn parse_nvme_attributes(log: &NvmeHealthLog) -> Vec<SmartAttribute> {
    let mut attrs = Vec::new();
    let mut add = |id: i64, name: &str, value: Option<i64>| {
        if let Some(v) = value {
            attrs.push(SmartAttribute {
                attr_id: id,
                name: name.to_string(),
                value: v,
                worst: v,
                threshold: 0,
                raw_value: v,
                failing: false,
            });
        }
    };
    add(1, "Available Spare %", log.available_spare);
    add(2, "Percentage Used", log.percentage_used);
    add(3, "Media Errors", log.media_errors);
    add(4, "Error Log Entries", log.num_err_log_entries);
    add(5, "Unsafe Shutdowns", log.unsafe_shutdowns);
    add(6, "Controller Busy Time (min)", log.controller_busy_time);
    attrs
}

fn ata_raw_value(attributes: &[SmartAttribute], attr_id: i64) -> Option<i64> {
    attributes
        .iter()
        .find(|a| a.attr_id == attr_id)
        .map(|a| a.raw_value)
}

/// Normalize a full smartctl report into the shared reading shape. Metrics a
/// vendor schema does not carry stay `None`.
fn normalize_reading(result: &XallResult) -> SmartReading {
    let mut reading = SmartReading {
        timestamp: Utc::now(),
        temperature: result.temperature.as_ref().and_then(|t| t.current),
        power_on_hours: result.power_on_time.as_ref().and_then(|p| p.hours),
        power_cycle_count: result.power_cycle_count,
        reallocated_sectors: None,
        pending_sectors: None,
        uncorrectable_errors: None,
        health_passed: result.smart_status.as_ref().and_then(|s| s.passed),
        attributes: Vec::new(),
    };

    if let Some(ata) = &result.ata_smart_attributes {
        reading.attributes = parse_ata_attributes(&ata.table);
        reading.reallocated_sectors = ata_raw_value(&reading.attributes, ATTR_REALLOCATED);
        reading.pending_sectors = ata_raw_value(&reading.attributes, ATTR_PENDING);
        reading.uncorrectable_errors = ata_raw_value(&reading.attributes, ATTR_UNCORRECTABLE);
    } else if let Some(nvme) = &result.nvme_smart_health_information_log {
        reading.attributes = parse_nvme_attributes(nvme);
        // NVMe has no pending-sector concept; that metric stays None.
        reading.reallocated_sectors = nvme.media_errors;
        reading.uncorrectable_errors = nvme.num_err_log_entries;
    }

    reading
}

fn detect_type(info: &InfoResult, scan_type: &str) -> DriveType {
    let protocol = info
        .device
        .as_ref()
        .map(|d| d.protocol.to_lowercase())
        .unwrap_or_default();
    if protocol == "nvme" || scan_type == "nvme" {
        return DriveType::Nvme;
    }
    match info.rotation_rate {
        Some(0) | None => DriveType::Ssd,
        Some(r) if r > 0 => DriveType::Hdd,
        Some(_) => DriveType::Unknown,
    }
}

/// Capacity fallback for drives whose identity report omits it.
/// `/sys/block/<dev>/size` is always in 512-byte units on Linux.
fn sysfs_capacity(device_path: &str) -> Option<i64> {
    let dev_name = device_path.rsplit('/').next()?;
    let raw = std::fs::read_to_string(format!("/sys/block/{dev_name}/size")).ok()?;
    let sectors: i64 = raw.trim().parse().ok()?;
    (sectors > 0).then_some(sectors * 512)
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// smartctl-backed diagnostic reader.
#[derive(Debug, Default)]
pub struct SmartctlReader;

impl SmartctlReader {
    pub fn new() -> Self {
        Self
    }

    /// Run smartctl and deserialize its stdout. A non-zero exit with a
    /// parseable payload still succeeds.
    async fn invoke<T: serde::de::DeserializeOwned>(args: &[&str]) -> Result<T, ProbeError> {
        let output = Command::new("smartctl")
            .args(args)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                tool: "smartctl",
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            tracing::warn!(
                args = ?args,
                exit_code = output.status.code(),
                "smartctl exited non-zero; trying to parse payload anyway"
            );
        }

        serde_json::from_str(&stdout).map_err(|_| ProbeError::NoPayload {
            tool: "smartctl",
            exit_code: output.status.code(),
            stdout: stdout.chars().take(ERROR_SNIPPET_LEN).collect(),
            stderr: stderr.chars().take(ERROR_SNIPPET_LEN).collect(),
        })
    }

    /// Query identity for one scanned device. `None` when the device carries
    /// no serial number (virtual/unsupported devices).
    async fn identify(device: &ScanDevice) -> Result<Option<DiscoveredDrive>, ProbeError> {
        let info: InfoResult = Self::invoke(&["--info", "--json", &device.name]).await?;

        let Some(serial) = info.serial_number.clone().filter(|s| !s.is_empty()) else {
            tracing::debug!(device = %device.name, "Skipping device without serial number");
            return Ok(None);
        };

        let drive_type = detect_type(&info, &device.device_type);
        let capacity = info
            .user_capacity
            .as_ref()
            .and_then(|c| c.bytes)
            .filter(|&b| b > 0)
            .or_else(|| sysfs_capacity(&device.name))
            .unwrap_or(0);

        Ok(Some(DiscoveredDrive {
            serial_number: serial,
            device_path: device.name.clone(),
            vendor: info.model_family.clone().unwrap_or_default(),
            model: info.model_name.clone().unwrap_or_default(),
            firmware_revision: info.firmware_version.clone().unwrap_or_default(),
            capacity,
            drive_type,
            rpm: info.rotation_rate.filter(|&r| r > 0),
            interface_type: info
                .interface_speed
                .as_ref()
                .and_then(|s| s.current.as_ref())
                .and_then(|c| c.string.clone())
                .or_else(|| Some(device.device_type.clone()).filter(|t| !t.is_empty())),
            logical_sector_size: info.logical_block_size,
            physical_sector_size: info.physical_block_size,
        }))
    }
}

#[async_trait]
impl DiagnosticReader for SmartctlReader {
    async fn scan(&self) -> Result<Vec<DiscoveredDrive>, ProbeError> {
        let scan: ScanResult = Self::invoke(&["--scan", "--json"]).await?;
        tracing::info!(count = scan.devices.len(), "smartctl scan finished");

        let mut discovered = Vec::new();
        for device in &scan.devices {
            match Self::identify(device).await {
                Ok(Some(drive)) => discovered.push(drive),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(device = %device.name, error = %e, "Skipping device; identify failed");
                }
            }
        }
        Ok(discovered)
    }

    async fn read(&self, device_path: &str) -> Result<SmartReading, ProbeError> {
        let result: XallResult = Self::invoke(&["--xall", "--json", device_path]).await?;
        Ok(normalize_reading(&result))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ATA_REPORT: &str = r#"{
        "smart_status": { "passed": true },
        "temperature": { "current": 34 },
        "power_on_time": { "hours": 12077 },
        "power_cycle_count": 542,
        "ata_smart_attributes": {
            "table": [
                { "id": 5,   "name": "Reallocated_Sector_Ct",  "value": 100, "worst": 100, "thresh": 10, "raw": { "value": 0 },  "when_failed": "" },
                { "id": 194, "name": "Temperature_Celsius",    "value": 66,  "worst": 45,  "thresh": 0,  "raw": { "value": 34 }, "when_failed": "-" },
                { "id": 197, "name": "Current_Pending_Sector", "value": 100, "worst": 100, "thresh": 0,  "raw": { "value": 2 },  "when_failed": "" },
                { "id": 198, "name": "Offline_Uncorrectable",  "value": 100, "worst": 100, "thresh": 0,  "raw": { "value": 0 },  "when_failed": "FAILING_NOW" }
            ]
        }
    }"#;

    const NVME_REPORT: &str = r#"{
        "smart_status": { "passed": true },
        "temperature": { "current": 41 },
        "power_on_time": { "hours": 3301 },
        "power_cycle_count": 77,
        "nvme_smart_health_information_log": {
            "media_errors": 0,
            "num_err_log_entries": 12,
            "available_spare": 100,
            "percentage_used": 3,
            "unsafe_shutdowns": 9
        }
    }"#;

    #[test]
    fn ata_report_normalizes_counters_from_attribute_table() {
        let result: XallResult = serde_json::from_str(ATA_REPORT).unwrap();
        let reading = normalize_reading(&result);

        assert_eq!(reading.temperature, Some(34.0));
        assert_eq!(reading.power_on_hours, Some(12077));
        assert_eq!(reading.health_passed, Some(true));
        // Zero raw values survive as Some(0), never None.
        assert_eq!(reading.reallocated_sectors, Some(0));
        assert_eq!(reading.pending_sectors, Some(2));
        assert_eq!(reading.uncorrectable_errors, Some(0));
        assert_eq!(reading.attributes.len(), 4);
        assert!(reading.attributes.iter().any(|a| a.attr_id == 198 && a.failing));
        assert!(reading.attributes.iter().all(|a| a.attr_id == 198 || !a.failing));
    }

    #[test]
    fn nvme_report_has_no_pending_sectors() {
        let result: XallResult = serde_json::from_str(NVME_REPORT).unwrap();
        let reading = normalize_reading(&result);

        assert_eq!(reading.reallocated_sectors, Some(0));
        assert_eq!(reading.uncorrectable_errors, Some(12));
        // NVMe has no pending-sector concept; the field must stay None, not 0.
        assert_eq!(reading.pending_sectors, None);
        assert_eq!(reading.attributes.len(), 5);
    }

    #[test]
    fn absent_sections_leave_everything_none() {
        let result: XallResult = serde_json::from_str("{}").unwrap();
        let reading = normalize_reading(&result);
        assert_eq!(reading.temperature, None);
        assert_eq!(reading.health_passed, None);
        assert_eq!(reading.reallocated_sectors, None);
        assert!(reading.attributes.is_empty());
    }

    #[test]
    fn nvme_protocol_wins_type_detection() {
        let info: InfoResult = serde_json::from_str(
            r#"{ "device": { "protocol": "NVMe" }, "rotation_rate": 0 }"#,
        )
        .unwrap();
        assert_eq!(detect_type(&info, "nvme"), DriveType::Nvme);
    }

    #[test]
    fn rotation_rate_separates_hdd_from_ssd() {
        let ssd: InfoResult = serde_json::from_str(r#"{ "rotation_rate": 0 }"#).unwrap();
        assert_eq!(detect_type(&ssd, "sat"), DriveType::Ssd);

        let hdd: InfoResult = serde_json::from_str(r#"{ "rotation_rate": 7200 }"#).unwrap();
        assert_eq!(detect_type(&hdd, "sat"), DriveType::Hdd);

        let unreported: InfoResult = serde_json::from_str("{}").unwrap();
        assert_eq!(detect_type(&unreported, "sat"), DriveType::Ssd);
    }
}
