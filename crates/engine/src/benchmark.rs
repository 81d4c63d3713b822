//! Two-phase benchmark execution.
//!
//! State machine per run: `pending → running → completed | failed`. Phase 1
//! samples the position curve at planned offsets; phase 2 executes the fixed
//! profile suite. Progress streams through the live feed after every point
//! and before every profile; each phase persists its results to the
//! time-series store when it finishes. Any runner error marks the run
//! `failed` with the causal message; results persisted by earlier phases
//! are retained, not rolled back.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;

use drivewatch_core::bench::{CurvePoint, ProfileResult};
use drivewatch_core::offsets::{plan_offsets, CURVE_SAMPLE_BYTES};
use drivewatch_core::types::DbId;
use drivewatch_core::CoreError;
use drivewatch_db::models::benchmark_run::{BenchmarkRunRow, TriggerKind};
use drivewatch_db::models::drive::DriveRow;
use drivewatch_db::repositories::{DriveRepo, RunRepo};
use drivewatch_db::{into_core, DbPool};
use drivewatch_events::{BenchmarkPhase, FeedEvent, LiveFeed};
use drivewatch_probes::{BenchmarkRunner, JobSpec, RwMode};
use drivewatch_tsdb::{RunTags, TimeSeriesStore};

use crate::guard::{ActiveRuns, RunToken};
use crate::profiles::BENCHMARK_PROFILES;

/// Points per run when the trigger does not specify a count.
pub const DEFAULT_NUM_POINTS: i64 = 11;

/// Resolve the block-device path suitable for benchmark jobs.
///
/// The diagnostic scan reports NVMe controllers as character devices
/// (`/dev/nvme0`); jobs must target the namespace block device
/// (`/dev/nvme0n1`). SATA/SAS paths pass through unchanged.
pub fn resolve_device_path(device_path: &str) -> String {
    static NVME_CONTROLLER: OnceLock<Regex> = OnceLock::new();
    let re = NVME_CONTROLLER
        .get_or_init(|| Regex::new(r"^/dev/nvme\d+$").expect("valid device-path pattern"));
    if re.is_match(device_path) {
        format!("{device_path}n1")
    } else {
        device_path.to_string()
    }
}

/// One sequential read of [`CURVE_SAMPLE_BYTES`] at a fixed offset.
fn curve_job(device_path: &str, offset: u64) -> JobSpec {
    JobSpec {
        device_path: device_path.to_string(),
        rw_mode: RwMode::Read,
        block_size_bytes: 1024 * 1024,
        iodepth: 1,
        numjobs: 1,
        runtime_secs: 0,
        ramp_time_secs: 0,
        offset_bytes: Some(offset),
        size_bytes: Some(CURVE_SAMPLE_BYTES),
    }
}

/// Executes benchmark runs against one store/runner/feed wiring.
pub struct BenchmarkEngine {
    pool: DbPool,
    store: Arc<dyn TimeSeriesStore>,
    runner: Arc<dyn BenchmarkRunner>,
    feed: Arc<LiveFeed>,
    active: ActiveRuns,
}

impl BenchmarkEngine {
    pub fn new(
        pool: DbPool,
        store: Arc<dyn TimeSeriesStore>,
        runner: Arc<dyn BenchmarkRunner>,
        feed: Arc<LiveFeed>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            store,
            runner,
            feed,
            active: ActiveRuns::new(),
        })
    }

    /// Whether a run currently holds the drive's exclusion token.
    pub fn is_drive_busy(&self, drive_id: DbId) -> bool {
        self.active.is_active(drive_id)
    }

    /// Create a run and execute it in the background.
    ///
    /// Claims the drive's exclusion token before creating the row: a second
    /// start while a run is active on the drive is rejected with
    /// [`CoreError::Conflict`], never queued. Returns the new run id
    /// immediately; the eventual outcome is recorded on the row and
    /// broadcast, not returned.
    pub async fn start_run(
        self: &Arc<Self>,
        drive_id: DbId,
        num_points: Option<i64>,
        trigger: TriggerKind,
    ) -> Result<DbId, CoreError> {
        let num_points = num_points.unwrap_or(DEFAULT_NUM_POINTS);
        if num_points < 1 {
            return Err(CoreError::Validation(format!(
                "num_points must be at least 1, got {num_points}"
            )));
        }

        DriveRepo::get(&self.pool, drive_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("drive", drive_id))?;

        let token = self.active.acquire(drive_id)?;
        let run = RunRepo::create(&self.pool, drive_id, num_points, trigger, Utc::now())
            .await
            .map_err(into_core)?;

        let engine = Arc::clone(self);
        let run_id = run.run_id;
        tokio::spawn(async move {
            if let Err(e) = engine.execute(run_id, token).await {
                tracing::warn!(run_id, error = %e, "Benchmark run failed");
            }
        });

        Ok(run_id)
    }

    /// Drive a created run to its terminal state, holding the drive claim
    /// for the duration. Normally invoked through [`Self::start_run`].
    pub async fn execute(self: &Arc<Self>, run_id: DbId, token: RunToken) -> Result<(), CoreError> {
        let _claim = token;

        let run = RunRepo::get(&self.pool, run_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("benchmark run", run_id))?;
        let drive = DriveRepo::get(&self.pool, run.drive_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("drive", run.drive_id))?;

        RunRepo::mark_running(&self.pool, run_id)
            .await
            .map_err(into_core)?;
        self.feed
            .broadcast(&FeedEvent::BenchmarkStarted {
                run_id,
                drive_id: run.drive_id,
                num_points: run.num_points,
            })
            .await;
        tracing::info!(
            run_id,
            serial = %drive.serial_number,
            capacity = drive.capacity,
            num_points = run.num_points,
            "Benchmark run started"
        );

        match self.run_phases(&run, &drive).await {
            Ok(()) => {
                RunRepo::complete(&self.pool, run_id, Utc::now())
                    .await
                    .map_err(into_core)?;
                self.feed
                    .broadcast(&FeedEvent::BenchmarkCompleted {
                        run_id,
                        drive_id: run.drive_id,
                    })
                    .await;
                tracing::info!(run_id, "Benchmark run completed");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(db_err) = RunRepo::fail(&self.pool, run_id, &message, Utc::now()).await {
                    tracing::error!(run_id, error = %db_err, "Failed to record run failure");
                }
                self.feed
                    .broadcast(&FeedEvent::BenchmarkFailed {
                        run_id,
                        error: message,
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Phase 1 (position curve) then phase 2 (profile suite), strictly in
    /// offset/catalogue order.
    async fn run_phases(&self, run: &BenchmarkRunRow, drive: &DriveRow) -> Result<(), CoreError> {
        let device = resolve_device_path(&drive.device_path);
        let start_ms = run.started_at.timestamp_millis();
        let tags = RunTags {
            serial: &drive.serial_number,
            run_id: run.run_id,
            drive_type: drive.media_type(),
        };

        // -- Phase 1: position curve ------------------------------------------
        let offsets = plan_offsets(drive.capacity.max(0) as u64, run.num_points.max(1) as u32);
        let mut points: Vec<CurvePoint> = Vec::with_capacity(offsets.len());
        for (i, &offset) in offsets.iter().enumerate() {
            let metrics = self.runner.run(&curve_job(&device, offset)).await?;
            points.push(CurvePoint {
                position: offset as i64,
                speed_bps: metrics.bw_bps,
            });
            self.feed
                .broadcast(&FeedEvent::BenchmarkProgress {
                    run_id: run.run_id,
                    point_index: i,
                    total_points: offsets.len(),
                    speed_bps: metrics.bw_bps,
                    phase: BenchmarkPhase::Curve,
                    phase_label: None,
                })
                .await;
        }
        self.store
            .write_curve_points(tags, start_ms, &points)
            .await?;

        // -- Phase 2: profile suite -------------------------------------------
        let mut results: Vec<ProfileResult> = Vec::with_capacity(BENCHMARK_PROFILES.len());
        for (i, profile) in BENCHMARK_PROFILES.iter().enumerate() {
            self.feed
                .broadcast(&FeedEvent::BenchmarkProgress {
                    run_id: run.run_id,
                    point_index: i,
                    total_points: BENCHMARK_PROFILES.len(),
                    speed_bps: 0.0,
                    phase: BenchmarkPhase::Profiles,
                    phase_label: Some(profile.label.to_string()),
                })
                .await;

            let metrics = self.runner.run(&profile.job_spec(&device)).await?;
            tracing::debug!(
                run_id = run.run_id,
                profile = profile.profile.as_str(),
                bw_bps = metrics.bw_bps,
                iops = metrics.iops,
                "Profile finished"
            );
            results.push(ProfileResult {
                profile: profile.profile,
                bw_bps: metrics.bw_bps,
                iops: metrics.iops,
                lat_mean_ns: metrics.lat_mean_ns,
                lat_p50_ns: metrics.lat_p50_ns,
                lat_p95_ns: metrics.lat_p95_ns,
                lat_p99_ns: metrics.lat_p99_ns,
                lat_p999_ns: metrics.lat_p999_ns,
            });
        }
        // Offset the profile timestamps past the curve block so the two
        // measurements never collide on (tag set, time).
        let profile_start_ms = start_ms + points.len() as i64 + 1000;
        self.store
            .write_profile_results(tags, profile_start_ms, &results)
            .await?;

        Ok(())
    }

    /// Delete a terminal run: its relational row and every time-series point
    /// tagged with its id. Active runs are refused.
    pub async fn delete_run(&self, run_id: DbId) -> Result<(), CoreError> {
        let run = RunRepo::get(&self.pool, run_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("benchmark run", run_id))?;
        if !run.run_status().is_terminal() {
            return Err(CoreError::Conflict(
                "cannot delete a benchmark run that is still active".to_string(),
            ));
        }

        // Time-series first: if that fails the relational row survives and
        // the delete can be retried without orphaning points.
        self.store.delete_run_data(run_id).await?;
        RunRepo::delete(&self.pool, run_id).await.map_err(into_core)
    }

    /// Delete every run for a drive, relational rows and time-series points
    /// both. Refused while any run is active on the drive.
    pub async fn purge_runs(&self, drive_id: DbId) -> Result<u64, CoreError> {
        let drive = DriveRepo::get(&self.pool, drive_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("drive", drive_id))?;

        let active_row = RunRepo::active_for_drive(&self.pool, drive_id)
            .await
            .map_err(into_core)?;
        if active_row.is_some() || self.active.is_active(drive_id) {
            return Err(CoreError::Conflict(
                "cannot purge runs while a benchmark is active".to_string(),
            ));
        }

        self.store.delete_drive_data(&drive.serial_number).await?;
        RunRepo::delete_for_drive(&self.pool, drive_id)
            .await
            .map_err(into_core)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
