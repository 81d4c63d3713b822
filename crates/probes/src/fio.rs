//! fio invocation: argument grammar, payload extraction, result parsing.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::{BenchmarkRunner, JobMetrics, JobSpec, ProbeError};

/// fio job name; shows up in fio's own logging only.
const JOB_NAME: &str = "drivewatch";

/// How much process output to keep in error messages.
const ERROR_SNIPPET_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Argument grammar
// ---------------------------------------------------------------------------

/// Build the fio CLI argument list for a job spec.
///
/// Invariants: the target is always opened read-only with direct I/O
/// (page-cache bypass), the engine is psync (plain pread() works on every
/// kernel/device/container combination where async engines return EINVAL),
/// and multi-job statistics merge into one row via group reporting.
pub fn build_args(spec: &JobSpec) -> Vec<String> {
    let mut args = vec![
        format!("--name={JOB_NAME}"),
        format!("--filename={}", spec.device_path),
        format!("--rw={}", spec.rw_mode.as_str()),
        format!("--bs={}", spec.block_size_bytes),
        format!("--iodepth={}", spec.iodepth),
        format!("--numjobs={}", spec.numjobs),
        "--direct=1".to_string(),
        "--ioengine=psync".to_string(),
        "--readonly".to_string(),
        "--output-format=json".to_string(),
        "--group_reporting".to_string(),
    ];

    if spec.runtime_secs > 0 {
        args.push("--time_based".to_string());
        args.push(format!("--runtime={}", spec.runtime_secs));
    }
    if spec.ramp_time_secs > 0 {
        args.push(format!("--ramp_time={}", spec.ramp_time_secs));
    }
    if let Some(offset) = spec.offset_bytes {
        args.push(format!("--offset={offset}"));
    }
    if let Some(size) = spec.size_bytes {
        args.push(format!("--size={size}"));
    }

    args
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

// fio's JSON output, reduced to the read-side stats we consume. Percentile
// distributions live under clat_ns (completion latency); lat_ns carries
// only mean/min/max.

#[derive(Debug, Deserialize)]
struct FioOutput {
    #[serde(default)]
    jobs: Vec<FioJob>,
}

#[derive(Debug, Deserialize)]
struct FioJob {
    read: FioReadStats,
}

#[derive(Debug, Deserialize)]
struct FioReadStats {
    /// KiB/s.
    #[serde(default)]
    bw: f64,
    #[serde(default)]
    iops: f64,
    clat_ns: Option<FioLatStats>,
    lat_ns: Option<FioLatMean>,
}

#[derive(Debug, Deserialize)]
struct FioLatStats {
    #[serde(default)]
    mean: f64,
    percentile: Option<FioPercentiles>,
}

#[derive(Debug, Deserialize)]
struct FioLatMean {
    #[serde(default)]
    mean: f64,
}

#[derive(Debug, Deserialize)]
struct FioPercentiles {
    #[serde(rename = "50.000000", default)]
    p50: f64,
    #[serde(rename = "95.000000", default)]
    p95: f64,
    #[serde(rename = "99.000000", default)]
    p99: f64,
    #[serde(rename = "99.900000", default)]
    p999: f64,
}

/// Locate the structured payload inside fio's combined output. fio sometimes
/// prints warning/error lines before the JSON blob; everything before the
/// first `{` is diagnostic noise.
pub fn extract_payload(stdout: &str) -> Option<&str> {
    stdout.find('{').map(|start| &stdout[start..])
}

/// Parse a fio JSON payload into aggregate metrics.
pub fn parse_output(payload: &str) -> Result<JobMetrics, ProbeError> {
    let output: FioOutput = serde_json::from_str(payload).map_err(|e| ProbeError::Parse {
        tool: "fio",
        message: e.to_string(),
    })?;

    // With group reporting the first (and only) entry holds aggregated stats.
    let read = match output.jobs.first() {
        Some(job) => &job.read,
        None => {
            return Err(ProbeError::Parse {
                tool: "fio",
                message: "JSON output contained no job entries".to_string(),
            })
        }
    };

    let clat = read.clat_ns.as_ref();
    let pct = clat.and_then(|c| c.percentile.as_ref());
    let lat_mean_ns = clat
        .map(|c| c.mean)
        .filter(|&m| m > 0.0)
        .or_else(|| read.lat_ns.as_ref().map(|l| l.mean))
        .unwrap_or(0.0);

    Ok(JobMetrics {
        bw_bps: read.bw * 1024.0, // KiB/s → bytes/s
        iops: read.iops,
        lat_mean_ns,
        lat_p50_ns: pct.map_or(0.0, |p| p.p50),
        lat_p95_ns: pct.map_or(0.0, |p| p.p95),
        lat_p99_ns: pct.map_or(0.0, |p| p.p99),
        lat_p999_ns: pct.map_or(0.0, |p| p.p999),
    })
}

fn snippet(s: &str) -> String {
    s.chars().take(ERROR_SNIPPET_LEN).collect()
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Spawns one fio process per job and parses its JSON output.
#[derive(Debug, Default)]
pub struct FioRunner;

impl FioRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BenchmarkRunner for FioRunner {
    async fn run(&self, spec: &JobSpec) -> Result<JobMetrics, ProbeError> {
        let args = build_args(spec);
        tracing::debug!(device = %spec.device_path, rw = spec.rw_mode.as_str(), "Spawning fio");

        let output = Command::new("fio")
            .args(&args)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn { tool: "fio", source })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let payload = extract_payload(&stdout).ok_or_else(|| ProbeError::NoPayload {
            tool: "fio",
            exit_code: output.status.code(),
            stdout: snippet(&stdout),
            stderr: snippet(&stderr),
        })?;

        parse_output(payload)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::RwMode;

    use super::*;

    fn curve_spec() -> JobSpec {
        JobSpec {
            device_path: "/dev/sda".to_string(),
            rw_mode: RwMode::Read,
            block_size_bytes: 1024 * 1024,
            iodepth: 1,
            numjobs: 1,
            runtime_secs: 0,
            ramp_time_secs: 0,
            offset_bytes: Some(4096),
            size_bytes: Some(128 * 1024 * 1024),
        }
    }

    // -- argument grammar -----------------------------------------------------

    #[test]
    fn args_always_carry_safety_flags() {
        let args = build_args(&curve_spec());
        for required in ["--readonly", "--direct=1", "--ioengine=psync", "--group_reporting", "--output-format=json"] {
            assert!(args.iter().any(|a| a == required), "missing {required}");
        }
    }

    #[test]
    fn size_capped_job_omits_runtime_flags() {
        let args = build_args(&curve_spec());
        assert!(args.contains(&"--offset=4096".to_string()));
        assert!(args.contains(&"--size=134217728".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--runtime")));
        assert!(!args.iter().any(|a| a == "--time_based"));
        assert!(!args.iter().any(|a| a.starts_with("--ramp_time")));
    }

    #[test]
    fn timed_job_omits_offset_and_size() {
        let spec = JobSpec {
            rw_mode: RwMode::RandRead,
            block_size_bytes: 4096,
            numjobs: 8,
            runtime_secs: 30,
            ramp_time_secs: 5,
            offset_bytes: None,
            size_bytes: None,
            ..curve_spec()
        };
        let args = build_args(&spec);
        assert!(args.contains(&"--rw=randread".to_string()));
        assert!(args.contains(&"--time_based".to_string()));
        assert!(args.contains(&"--runtime=30".to_string()));
        assert!(args.contains(&"--ramp_time=5".to_string()));
        assert!(args.contains(&"--numjobs=8".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--offset")));
        assert!(!args.iter().any(|a| a.starts_with("--size")));
    }

    // -- payload extraction ---------------------------------------------------

    #[test]
    fn payload_extraction_skips_diagnostic_noise() {
        let stdout = "fio: warning: cache invalidation failed\n{\"jobs\": []}";
        assert_eq!(extract_payload(stdout), Some("{\"jobs\": []}"));
    }

    #[test]
    fn missing_payload_is_none() {
        assert_eq!(extract_payload("fio: device busy\n"), None);
    }

    // -- output parsing -------------------------------------------------------

    const SAMPLE: &str = r#"{
        "jobs": [{
            "read": {
                "bw": 524288,
                "iops": 512.5,
                "clat_ns": {
                    "mean": 1900000.0,
                    "percentile": {
                        "50.000000": 1800000,
                        "95.000000": 2500000,
                        "99.000000": 3200000,
                        "99.900000": 8100000
                    }
                },
                "lat_ns": { "mean": 1950000.0 }
            }
        }]
    }"#;

    #[test]
    fn parses_aggregate_stats() {
        let m = parse_output(SAMPLE).expect("parse");
        // KiB/s → bytes/s
        assert_eq!(m.bw_bps, 524288.0 * 1024.0);
        assert_eq!(m.iops, 512.5);
        // Percentiles come from clat_ns, not lat_ns.
        assert_eq!(m.lat_mean_ns, 1900000.0);
        assert_eq!(m.lat_p50_ns, 1800000.0);
        assert_eq!(m.lat_p999_ns, 8100000.0);
    }

    #[test]
    fn empty_job_list_is_a_parse_error() {
        let err = parse_output(r#"{"jobs": []}"#).unwrap_err();
        assert_matches!(err, ProbeError::Parse { tool: "fio", .. });
    }

    #[test]
    fn missing_percentiles_default_to_zero() {
        let payload = r#"{"jobs":[{"read":{"bw":1024,"iops":10,"lat_ns":{"mean":500.0}}}]}"#;
        let m = parse_output(payload).expect("parse");
        assert_eq!(m.bw_bps, 1024.0 * 1024.0);
        assert_eq!(m.lat_mean_ns, 500.0);
        assert_eq!(m.lat_p99_ns, 0.0);
    }
}
