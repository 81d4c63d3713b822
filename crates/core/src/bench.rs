//! Benchmark measurement value types.

use serde::{Deserialize, Serialize};

/// Identifier for each profile in the fixed benchmark suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileId {
    SeqRead,
    RandRead4k,
    Latency,
}

impl ProfileId {
    /// Canonical string form, used as the time-series `profile` tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SeqRead => "seq_read",
            Self::RandRead4k => "rand_read_4k",
            Self::Latency => "latency",
        }
    }
}

/// One (position, speed) sample on the position-throughput curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Byte offset on the device.
    pub position: i64,
    /// Measured sequential-read speed in bytes/second.
    pub speed_bps: f64,
}

/// Aggregated metrics for one profile of the fixed suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResult {
    pub profile: ProfileId,
    /// Bandwidth in bytes/second.
    pub bw_bps: f64,
    pub iops: f64,
    /// Completion latencies in nanoseconds.
    pub lat_mean_ns: f64,
    pub lat_p50_ns: f64,
    pub lat_p95_ns: f64,
    pub lat_p99_ns: f64,
    pub lat_p999_ns: f64,
}
