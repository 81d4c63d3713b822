//! Synthetic implementations of both probe seams.
//!
//! For development and CI hosts without real disks. The mock runner keeps the
//! pacing of a real benchmark (short per-job delays) so progress streaming
//! behaves like production; measurements are type-plausible with ±15 % jitter
//! so repeated runs look distinct on a chart.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use drivewatch_core::drive::{DiscoveredDrive, DriveType};
use drivewatch_core::smart::SmartReading;

use crate::{BenchmarkRunner, DiagnosticReader, JobMetrics, JobSpec, ProbeError, RwMode};

/// Delay per size-capped curve sample.
const CURVE_SAMPLE_DELAY: Duration = Duration::from_millis(300);
/// Delay per timed profile job.
const PROFILE_DELAY: Duration = Duration::from_millis(800);

/// ±15 % multiplicative jitter.
fn jitter() -> f64 {
    rand::rng().random_range(0.85..1.15)
}

// ---------------------------------------------------------------------------
// Mock drive catalogue
// ---------------------------------------------------------------------------

fn mock_drives() -> Vec<DiscoveredDrive> {
    vec![
        DiscoveredDrive {
            serial_number: "MOCK-SSD-001".to_string(),
            device_path: "/dev/mock0".to_string(),
            vendor: "Samsung".to_string(),
            model: "860 EVO 1TB".to_string(),
            firmware_revision: "RVT21B6Q".to_string(),
            capacity: 1_000_204_886_016,
            drive_type: DriveType::Ssd,
            rpm: None,
            interface_type: Some("SATA".to_string()),
            logical_sector_size: Some(512),
            physical_sector_size: Some(512),
        },
        DiscoveredDrive {
            serial_number: "MOCK-HDD-002".to_string(),
            device_path: "/dev/mock1".to_string(),
            vendor: "Seagate".to_string(),
            model: "Barracuda 4TB".to_string(),
            firmware_revision: "CC52".to_string(),
            capacity: 4_000_787_030_016,
            drive_type: DriveType::Hdd,
            rpm: Some(7200),
            interface_type: Some("SATA".to_string()),
            logical_sector_size: Some(512),
            physical_sector_size: Some(4096),
        },
        DiscoveredDrive {
            serial_number: "MOCK-NVME-003".to_string(),
            device_path: "/dev/mock2".to_string(),
            vendor: "Western Digital".to_string(),
            model: "WD Black SN850 2TB".to_string(),
            firmware_revision: "614900WD".to_string(),
            capacity: 2_000_398_934_016,
            drive_type: DriveType::Nvme,
            rpm: None,
            interface_type: Some("NVMe".to_string()),
            logical_sector_size: Some(512),
            physical_sector_size: Some(512),
        },
    ]
}

/// Which mock device class a path refers to. Defaults to SSD for paths
/// outside the mock catalogue so ad-hoc tests still get sane numbers.
fn class_for_path(device_path: &str) -> DriveType {
    match device_path {
        p if p.ends_with('1') => DriveType::Hdd,
        p if p.ends_with('2') => DriveType::Nvme,
        _ => DriveType::Ssd,
    }
}

// ---------------------------------------------------------------------------
// MockRunner
// ---------------------------------------------------------------------------

/// Synthetic benchmark runner.
#[derive(Debug, Default)]
pub struct MockRunner;

impl MockRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Baseline metrics per (device class, job shape), before jitter.
fn baseline(class: DriveType, spec: &JobSpec) -> JobMetrics {
    // Single-job random read at QD 1 is the latency probe; multi-job random
    // read is the IOPS probe; everything else behaves like sequential read.
    let (bw_bps, iops, lat_mean_ns) = match (spec.rw_mode, spec.numjobs) {
        (RwMode::RandRead, n) if n > 1 => match class {
            DriveType::Nvme => (2_800_000_000.0, 700_000.0, 45_000.0),
            DriveType::Hdd => (600_000.0, 150.0, 7_000_000.0),
            _ => (370_000_000.0, 90_000.0, 350_000.0),
        },
        (RwMode::RandRead, _) => match class {
            DriveType::Nvme => (20_000_000.0, 5_000.0, 18_000.0),
            DriveType::Hdd => (600_000.0, 150.0, 6_500_000.0),
            _ => (20_000_000.0, 5_000.0, 180_000.0),
        },
        (RwMode::Read, _) => match class {
            DriveType::Nvme => (3_500_000_000.0, 3_500.0, 280_000.0),
            DriveType::Hdd => (160_000_000.0, 160.0, 8_000_000.0),
            _ => (550_000_000.0, 550.0, 1_200_000.0),
        },
    };

    JobMetrics {
        bw_bps,
        iops,
        lat_mean_ns,
        lat_p50_ns: lat_mean_ns * 0.93,
        lat_p95_ns: lat_mean_ns * 1.35,
        lat_p99_ns: lat_mean_ns * 2.0,
        lat_p999_ns: lat_mean_ns * 4.5,
    }
}

#[async_trait]
impl BenchmarkRunner for MockRunner {
    async fn run(&self, spec: &JobSpec) -> Result<JobMetrics, ProbeError> {
        // Keep the real pacing shape: curve samples are quick, timed
        // profiles take longer.
        let delay = if spec.runtime_secs == 0 {
            CURVE_SAMPLE_DELAY
        } else {
            PROFILE_DELAY
        };
        tokio::time::sleep(delay).await;

        let base = baseline(class_for_path(&spec.device_path), spec);
        let j = jitter();
        Ok(JobMetrics {
            bw_bps: base.bw_bps * j,
            iops: base.iops * j,
            lat_mean_ns: base.lat_mean_ns * j,
            lat_p50_ns: base.lat_p50_ns * j,
            lat_p95_ns: base.lat_p95_ns * j,
            lat_p99_ns: base.lat_p99_ns * j,
            lat_p999_ns: base.lat_p999_ns * j,
        })
    }
}

// ---------------------------------------------------------------------------
// MockReader
// ---------------------------------------------------------------------------

/// Synthetic diagnostic reader exposing three canned drives.
#[derive(Debug, Default)]
pub struct MockReader;

impl MockReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiagnosticReader for MockReader {
    async fn scan(&self) -> Result<Vec<DiscoveredDrive>, ProbeError> {
        Ok(mock_drives())
    }

    async fn read(&self, device_path: &str) -> Result<SmartReading, ProbeError> {
        let base_temp = match class_for_path(device_path) {
            DriveType::Ssd => 38.0,
            DriveType::Hdd => 32.0,
            _ => 40.0,
        };
        let mut rng = rand::rng();
        Ok(SmartReading {
            timestamp: Utc::now(),
            temperature: Some(base_temp + rng.random_range(0.0..4.0_f64).round()),
            power_on_hours: Some(8760 + rng.random_range(0..100)),
            power_cycle_count: Some(350 + rng.random_range(0..10)),
            reallocated_sectors: Some(0),
            pending_sectors: Some(0),
            uncorrectable_errors: Some(0),
            health_passed: Some(true),
            attributes: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
