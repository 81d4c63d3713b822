//! Wire shape of live-feed events.
//!
//! Serializes as `{"type": "...", ...}` so observers can dispatch on the
//! tag without knowing the full union.

use serde::Serialize;

use drivewatch_core::drive::{DriveHealth, DriveType};
use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::DbId;

/// Which benchmark phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkPhase {
    /// Position-curve sampling.
    Curve,
    /// Fixed profile suite.
    Profiles,
}

/// Drive identity payload for detection events.
#[derive(Debug, Clone, Serialize)]
pub struct DriveInfo {
    pub drive_id: DbId,
    pub serial_number: String,
    pub model: String,
    pub drive_type: DriveType,
    pub capacity: i64,
}

/// An event pushed to live-feed observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Acknowledgement sent to every new connection.
    Connected { client_count: usize },

    /// A drive appeared in a diagnostic scan for the first time (or came
    /// back after being disconnected).
    DriveDetected { drive: DriveInfo },

    /// A known drive was absent from the latest scan.
    DriveRemoved { drive_id: DbId },

    /// A diagnostic poll finished; carries the health classification and
    /// the full reading so observers skip a round-trip.
    SmartUpdated {
        drive_id: DbId,
        health: DriveHealth,
        temperature: Option<f64>,
        reading: SmartReading,
    },

    BenchmarkStarted {
        run_id: DbId,
        drive_id: DbId,
        num_points: i64,
    },

    BenchmarkProgress {
        run_id: DbId,
        point_index: usize,
        total_points: usize,
        speed_bps: f64,
        phase: BenchmarkPhase,
        /// Human label for the current profile; only set in the profile
        /// phase.
        #[serde(skip_serializing_if = "Option::is_none")]
        phase_label: Option<String>,
    },

    BenchmarkCompleted { run_id: DbId, drive_id: DbId },

    BenchmarkFailed { run_id: DbId, error: String },
}

impl FeedEvent {
    /// Whether this event is a benchmark progress update, the only event
    /// class the hub retains for late-joiner replay.
    pub fn is_progress(&self) -> bool {
        matches!(self, Self::BenchmarkProgress { .. })
    }

    /// Whether this event terminates an in-flight benchmark.
    pub fn is_benchmark_terminal(&self) -> bool {
        matches!(
            self,
            Self::BenchmarkCompleted { .. } | Self::BenchmarkFailed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
