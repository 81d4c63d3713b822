//! External-utility invocation layer.
//!
//! Two seams, each an object-safe async trait selected once at startup:
//! [`BenchmarkRunner`] (fio) and [`DiagnosticReader`] (smartctl). The
//! [`mock`] module provides synthetic implementations of both for hosts
//! without real hardware; business logic never branches on which one is
//! installed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use drivewatch_core::drive::DiscoveredDrive;
use drivewatch_core::smart::SmartReading;
use drivewatch_core::CoreError;

pub mod fio;
pub mod mock;
pub mod smartctl;

pub use fio::FioRunner;
pub use mock::{MockReader, MockRunner};
pub use smartctl::SmartctlReader;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for external-utility invocations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The process could not be started at all.
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but produced no structured payload. Payload presence
    /// is the authoritative success signal; the exit code alone is not.
    #[error("{tool} exited {exit_code:?} with no JSON payload. stdout: {stdout} | stderr: {stderr}")]
    NoPayload {
        tool: &'static str,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// A payload was present but could not be interpreted.
    #[error("{tool} output parse failed: {message}")]
    Parse {
        tool: &'static str,
        message: String,
    },
}

impl From<ProbeError> for CoreError {
    fn from(err: ProbeError) -> Self {
        CoreError::Process(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Benchmark runner seam
// ---------------------------------------------------------------------------

/// I/O access pattern of a benchmark job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RwMode {
    /// Sequential read.
    Read,
    /// Random read.
    RandRead,
}

impl RwMode {
    /// The fio `--rw=` value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::RandRead => "randread",
        }
    }
}

/// Declarative description of one benchmark job. Fully determines the
/// external invocation; the runner adds nothing but the fixed safety flags.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Block device or file path (e.g. `/dev/sda`).
    pub device_path: String,
    pub rw_mode: RwMode,
    pub block_size_bytes: u64,
    /// Concurrent I/Os in flight per job.
    pub iodepth: u32,
    /// Parallel job processes; statistics merge into one aggregate.
    pub numjobs: u32,
    /// Seconds to run. 0 means run until `size_bytes` are consumed.
    pub runtime_secs: u32,
    /// Warm-up seconds excluded from results.
    pub ramp_time_secs: u32,
    /// Starting byte offset on the device. `None` starts at 0.
    pub offset_bytes: Option<u64>,
    /// Bytes to read. Required when `runtime_secs` is 0.
    pub size_bytes: Option<u64>,
}

/// Aggregate metrics of one completed job.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JobMetrics {
    /// Bytes/second.
    pub bw_bps: f64,
    pub iops: f64,
    /// Completion latencies, nanoseconds.
    pub lat_mean_ns: f64,
    pub lat_p50_ns: f64,
    pub lat_p95_ns: f64,
    pub lat_p99_ns: f64,
    pub lat_p999_ns: f64,
}

/// Executes one benchmark job per call. No shared state between calls; one
/// external process per invocation.
#[async_trait]
pub trait BenchmarkRunner: Send + Sync {
    async fn run(&self, spec: &JobSpec) -> Result<JobMetrics, ProbeError>;
}

// ---------------------------------------------------------------------------
// Diagnostic reader seam
// ---------------------------------------------------------------------------

/// Enumerates devices and reads full diagnostics.
#[async_trait]
pub trait DiagnosticReader: Send + Sync {
    /// Enumerate physical devices and their identity records. Devices that
    /// fail to identify are skipped, not fatal.
    async fn scan(&self) -> Result<Vec<DiscoveredDrive>, ProbeError>;

    /// Read the full diagnostic state of one device.
    async fn read(&self, device_path: &str) -> Result<SmartReading, ProbeError>;
}
