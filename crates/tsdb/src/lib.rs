//! Time-series store access layer.
//!
//! The engine writes curve points, profile results, and SMART readings
//! through the [`TimeSeriesStore`] trait and deletes them by run id or drive
//! serial. [`influx::InfluxStore`] talks to an InfluxDB 2.x instance;
//! [`memory::MemoryStore`] keeps everything in process for tests and
//! store-less development runs.

use async_trait::async_trait;
use thiserror::Error;

use drivewatch_core::bench::{CurvePoint, ProfileResult};
use drivewatch_core::drive::DriveType;
use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::DbId;
use drivewatch_core::CoreError;

pub mod influx;
mod line;
pub mod memory;

pub use influx::{InfluxConfig, InfluxStore};
pub use memory::MemoryStore;

/// Measurement holding position-curve samples.
pub const MEASUREMENT_POINTS: &str = "benchmark_points";
/// Measurement holding profile-suite results.
pub const MEASUREMENT_PROFILES: &str = "benchmark_profiles";
/// Measurement holding per-poll SMART health fields.
pub const MEASUREMENT_SMART: &str = "smart_readings";
/// Measurement holding per-poll normalized vendor attributes.
pub const MEASUREMENT_SMART_ATTRIBUTES: &str = "smart_attributes";

/// Error type for time-series operations.
#[derive(Debug, Error)]
pub enum TsdbError {
    /// The HTTP request itself failed (network, DNS, timeout).
    #[error("time-series request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("time-series store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<TsdbError> for CoreError {
    fn from(err: TsdbError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Tag set identifying the run a measurement belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RunTags<'a> {
    pub serial: &'a str,
    pub run_id: DbId,
    pub drive_type: DriveType,
}

/// Tag set identifying the drive a SMART reading belongs to.
#[derive(Debug, Clone, Copy)]
pub struct DriveTags<'a> {
    pub serial: &'a str,
    pub vendor: &'a str,
    pub model: &'a str,
    pub device: &'a str,
}

/// Append-only writes and predicate deletes against the time-series store.
///
/// Writes are batched per phase; deletion by run id or serial must remove
/// exactly the matching points across both benchmark measurements.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Append the position-curve points of one run, in offset order.
    /// `start_ms` anchors the synthetic per-point timestamps.
    async fn write_curve_points(
        &self,
        tags: RunTags<'_>,
        start_ms: i64,
        points: &[CurvePoint],
    ) -> Result<(), TsdbError>;

    /// Append the profile results of one run, in catalogue order.
    async fn write_profile_results(
        &self,
        tags: RunTags<'_>,
        start_ms: i64,
        results: &[ProfileResult],
    ) -> Result<(), TsdbError>;

    /// Append one SMART reading (health fields plus one point per vendor
    /// attribute). Absent metrics are omitted, not written as zero.
    async fn write_smart_reading(
        &self,
        tags: DriveTags<'_>,
        reading: &SmartReading,
    ) -> Result<(), TsdbError>;

    /// Remove every benchmark point and profile result tagged with `run_id`.
    async fn delete_run_data(&self, run_id: DbId) -> Result<(), TsdbError>;

    /// Remove every benchmark point and profile result tagged with `serial`.
    async fn delete_drive_data(&self, serial: &str) -> Result<(), TsdbError>;
}
