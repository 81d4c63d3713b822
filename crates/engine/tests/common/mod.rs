//! Shared fixtures for engine integration tests.
//!
//! Not every test binary uses every fixture.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use drivewatch_core::drive::{DiscoveredDrive, DriveType};
use drivewatch_core::types::DbId;
use drivewatch_db::models::benchmark_run::BenchmarkRunRow;
use drivewatch_db::repositories::{DriveRepo, RunRepo};
use drivewatch_db::DbPool;
use drivewatch_probes::{BenchmarkRunner, JobMetrics, JobSpec, ProbeError};

pub async fn setup_pool() -> DbPool {
    let pool = drivewatch_db::memory_pool().await.expect("pool");
    drivewatch_db::run_migrations(&pool).await.expect("migrations");
    pool
}

pub async fn insert_drive(pool: &DbPool, serial: &str, device_path: &str) -> DbId {
    DriveRepo::insert_discovered(
        pool,
        &DiscoveredDrive {
            serial_number: serial.to_string(),
            device_path: device_path.to_string(),
            vendor: "Acme".to_string(),
            model: "Blazer 1TB".to_string(),
            firmware_revision: "1.0".to_string(),
            capacity: 1_000_204_886_016,
            drive_type: DriveType::Ssd,
            rpm: None,
            interface_type: Some("SATA".to_string()),
            logical_sector_size: Some(512),
            physical_sector_size: Some(512),
        },
        Utc::now(),
    )
    .await
    .expect("insert drive")
    .drive_id
}

pub fn metrics(bw_bps: f64) -> JobMetrics {
    JobMetrics {
        bw_bps,
        iops: 550.0,
        lat_mean_ns: 1_200_000.0,
        lat_p50_ns: 1_100_000.0,
        lat_p95_ns: 1_500_000.0,
        lat_p99_ns: 2_000_000.0,
        lat_p999_ns: 5_000_000.0,
    }
}

fn no_payload(device: &str) -> ProbeError {
    ProbeError::NoPayload {
        tool: "fio",
        exit_code: Some(1),
        stdout: format!("fio: {device}: device busy"),
        stderr: String::new(),
    }
}

/// Runner with no delays; optionally fails for a set of device paths, or for
/// every timed (profile-phase) job.
pub struct InstantRunner {
    pub fail_devices: HashSet<String>,
    pub fail_timed_jobs: bool,
}

impl InstantRunner {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail_devices: HashSet::new(),
            fail_timed_jobs: false,
        })
    }

    pub fn failing_for(device: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_devices: HashSet::from([device.to_string()]),
            fail_timed_jobs: false,
        })
    }

    pub fn failing_profiles() -> Arc<Self> {
        Arc::new(Self {
            fail_devices: HashSet::new(),
            fail_timed_jobs: true,
        })
    }
}

#[async_trait]
impl BenchmarkRunner for InstantRunner {
    async fn run(&self, spec: &JobSpec) -> Result<JobMetrics, ProbeError> {
        if self.fail_devices.contains(&spec.device_path) {
            return Err(no_payload(&spec.device_path));
        }
        if self.fail_timed_jobs && spec.runtime_secs > 0 {
            return Err(no_payload(&spec.device_path));
        }
        Ok(metrics(5.0e8))
    }
}

/// Runner that parks every job until released; used to hold a run in the
/// active state deterministically. Releasing is one-way: jobs submitted
/// afterwards pass straight through.
pub struct BlockingRunner {
    gate_tx: tokio::sync::watch::Sender<bool>,
    gate_rx: tokio::sync::watch::Receiver<bool>,
}

impl BlockingRunner {
    pub fn new() -> Arc<Self> {
        let (gate_tx, gate_rx) = tokio::sync::watch::channel(false);
        Arc::new(Self { gate_tx, gate_rx })
    }

    pub fn release_all(&self) {
        let _ = self.gate_tx.send(true);
    }
}

#[async_trait]
impl BenchmarkRunner for BlockingRunner {
    async fn run(&self, _spec: &JobSpec) -> Result<JobMetrics, ProbeError> {
        let mut gate = self.gate_rx.clone();
        gate.wait_for(|open| *open).await.expect("gate sender alive");
        Ok(metrics(5.0e8))
    }
}

/// Scripted diagnostic reader: canned readings per device path, a set of
/// failing devices, and a queue of scan results (the last entry repeats).
#[derive(Default)]
pub struct ScriptedReader {
    pub readings: std::sync::Mutex<std::collections::HashMap<String, drivewatch_core::smart::SmartReading>>,
    pub fail_devices: std::sync::Mutex<HashSet<String>>,
    pub scans: std::sync::Mutex<std::collections::VecDeque<Vec<DiscoveredDrive>>>,
}

impl ScriptedReader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reading(&self, device: &str, reading: drivewatch_core::smart::SmartReading) {
        self.readings
            .lock()
            .unwrap()
            .insert(device.to_string(), reading);
    }

    pub fn fail_device(&self, device: &str) {
        self.fail_devices.lock().unwrap().insert(device.to_string());
    }

    pub fn push_scan(&self, drives: Vec<DiscoveredDrive>) {
        self.scans.lock().unwrap().push_back(drives);
    }
}

#[async_trait]
impl drivewatch_probes::DiagnosticReader for ScriptedReader {
    async fn scan(&self) -> Result<Vec<DiscoveredDrive>, ProbeError> {
        let mut scans = self.scans.lock().unwrap();
        if scans.len() > 1 {
            Ok(scans.pop_front().unwrap())
        } else {
            Ok(scans.front().cloned().unwrap_or_default())
        }
    }

    async fn read(&self, device_path: &str) -> Result<drivewatch_core::smart::SmartReading, ProbeError> {
        if self.fail_devices.lock().unwrap().contains(device_path) {
            return Err(ProbeError::NoPayload {
                tool: "smartctl",
                exit_code: Some(2),
                stdout: String::new(),
                stderr: format!("{device_path}: Unable to detect device type"),
            });
        }
        self.readings
            .lock()
            .unwrap()
            .get(device_path)
            .cloned()
            .ok_or(ProbeError::NoPayload {
                tool: "smartctl",
                exit_code: Some(2),
                stdout: String::new(),
                stderr: format!("{device_path}: no scripted reading"),
            })
    }
}

/// A reading with everything healthy at the given temperature.
pub fn healthy_reading(temperature: f64) -> drivewatch_core::smart::SmartReading {
    drivewatch_core::smart::SmartReading {
        timestamp: Utc::now(),
        temperature: Some(temperature),
        power_on_hours: Some(8760),
        power_cycle_count: Some(350),
        reallocated_sectors: Some(0),
        pending_sectors: Some(0),
        uncorrectable_errors: Some(0),
        health_passed: Some(true),
        attributes: Vec::new(),
    }
}

/// Wait until the engine releases the drive's exclusion token. The token is
/// dropped shortly after the run row turns terminal, once the executing task
/// unwinds.
pub async fn wait_idle(engine: &drivewatch_engine::BenchmarkEngine, drive_id: DbId) {
    for _ in 0..1000 {
        if !engine.is_drive_busy(drive_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("drive {drive_id} never became idle");
}

/// Poll until the run reaches a terminal status.
pub async fn wait_terminal(pool: &DbPool, run_id: DbId) -> BenchmarkRunRow {
    for _ in 0..1000 {
        let run = RunRepo::get(pool, run_id)
            .await
            .expect("get run")
            .expect("run row");
        if run.run_status().is_terminal() {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run {run_id} never reached a terminal status");
}
