//! Ordered catalogue of benchmark profiles.
//!
//! Add an entry here to extend the suite; the engine iterates the catalogue
//! in order and persists one result row per profile.

use drivewatch_core::bench::ProfileId;
use drivewatch_probes::{JobSpec, RwMode};

/// One named, fixed-parameter workload of the profile suite.
pub struct ProfileConfig {
    pub profile: ProfileId,
    /// Human label shown in progress events.
    pub label: &'static str,
    pub description: &'static str,
    pub rw_mode: RwMode,
    pub block_size_bytes: u64,
    pub iodepth: u32,
    pub numjobs: u32,
    pub runtime_secs: u32,
    pub ramp_time_secs: u32,
}

impl ProfileConfig {
    /// Concrete job spec for a target device.
    pub fn job_spec(&self, device_path: &str) -> JobSpec {
        JobSpec {
            device_path: device_path.to_string(),
            rw_mode: self.rw_mode,
            block_size_bytes: self.block_size_bytes,
            iodepth: self.iodepth,
            numjobs: self.numjobs,
            runtime_secs: self.runtime_secs,
            ramp_time_secs: self.ramp_time_secs,
            offset_bytes: None,
            size_bytes: None,
        }
    }
}

/// The fixed suite, in execution order.
pub const BENCHMARK_PROFILES: [ProfileConfig; 3] = [
    ProfileConfig {
        profile: ProfileId::SeqRead,
        label: "Sequential Read",
        description: "Sustained sequential throughput: 1 MiB blocks, 1 job, 30 s",
        rw_mode: RwMode::Read,
        block_size_bytes: 1024 * 1024,
        iodepth: 1,
        numjobs: 1,
        runtime_secs: 30,
        ramp_time_secs: 5,
    },
    ProfileConfig {
        profile: ProfileId::RandRead4k,
        label: "4K Random Read",
        // psync parallelism comes from numjobs, not iodepth.
        description: "Random IOPS: 4 KiB blocks, 8 parallel jobs, 30 s",
        rw_mode: RwMode::RandRead,
        block_size_bytes: 4096,
        iodepth: 1,
        numjobs: 8,
        runtime_secs: 30,
        ramp_time_secs: 5,
    },
    ProfileConfig {
        profile: ProfileId::Latency,
        label: "Idle Latency",
        description: "True device latency: 4 KiB blocks, single job, QD 1, 30 s",
        rw_mode: RwMode::RandRead,
        block_size_bytes: 4096,
        iodepth: 1,
        numjobs: 1,
        runtime_secs: 30,
        ramp_time_secs: 5,
    },
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
