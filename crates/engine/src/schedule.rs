//! Cron schedule reconciliation and the periodic diagnostic poller.
//!
//! Invariant: an enabled schedule has exactly one live timer, a disabled or
//! deleted one has none. Registration validates the cron expression before
//! touching any existing timer; firing fans out across the drive scope with
//! per-drive error isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use drivewatch_core::types::DbId;
use drivewatch_core::CoreError;
use drivewatch_db::models::benchmark_run::TriggerKind;
use drivewatch_db::repositories::{DriveRepo, ScheduleRepo};
use drivewatch_db::{into_core, DbPool};

use crate::benchmark::BenchmarkEngine;
use crate::monitor::SmartMonitor;

fn scheduler_error(e: JobSchedulerError) -> CoreError {
    CoreError::Internal(format!("scheduler error: {e}"))
}

/// Reconciles persisted schedules with live cron timers.
pub struct ScheduleManager {
    scheduler: JobScheduler,
    /// schedule id → live timer id.
    jobs: Mutex<HashMap<DbId, Uuid>>,
    pool: DbPool,
    engine: Arc<BenchmarkEngine>,
}

impl ScheduleManager {
    /// Create and start the underlying timer wheel.
    pub async fn start(pool: DbPool, engine: Arc<BenchmarkEngine>) -> Result<Self, CoreError> {
        let mut scheduler = JobScheduler::new().await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;
        Ok(Self {
            scheduler,
            jobs: Mutex::new(HashMap::new()),
            pool,
            engine,
        })
    }

    /// Validate the cron expression and install the live timer for a
    /// schedule, cancelling any previous timer for the same id.
    ///
    /// The new job is built before the old timer is touched, so an invalid
    /// expression is rejected with [`CoreError::Validation`] and leaves the
    /// existing registration intact.
    pub async fn register(
        &self,
        schedule_id: DbId,
        cron_expression: &str,
        drive_scope: Option<DbId>,
        num_points: i64,
    ) -> Result<(), CoreError> {
        let pool = self.pool.clone();
        let engine = Arc::clone(&self.engine);
        let job = Job::new_async(cron_expression, move |job_id, mut scheduler| {
            let pool = pool.clone();
            let engine = Arc::clone(&engine);
            Box::pin(async move {
                fire_schedule(&pool, &engine, schedule_id, drive_scope, num_points).await;
                // Refresh the advisory next-fire column.
                match scheduler.next_tick_for_job(job_id).await {
                    Ok(next) => {
                        if let Err(e) = ScheduleRepo::set_next_run(&pool, schedule_id, next).await {
                            tracing::debug!(schedule_id, error = %e, "Could not record next run");
                        }
                    }
                    Err(e) => {
                        tracing::debug!(schedule_id, error = %e, "Could not query next tick");
                    }
                }
            })
        })
        .map_err(|e| {
            CoreError::Validation(format!("invalid cron expression {cron_expression:?}: {e}"))
        })?;

        let mut jobs = self.jobs.lock().await;
        if let Some(previous) = jobs.remove(&schedule_id) {
            if let Err(e) = self.scheduler.clone().remove(&previous).await {
                tracing::warn!(schedule_id, error = %e, "Failed to cancel replaced timer");
            }
        }
        let job_id = self.scheduler.clone().add(job).await.map_err(scheduler_error)?;
        jobs.insert(schedule_id, job_id);
        drop(jobs);

        if let Ok(next) = self.scheduler.clone().next_tick_for_job(job_id).await {
            if let Err(e) = ScheduleRepo::set_next_run(&self.pool, schedule_id, next).await {
                tracing::debug!(schedule_id, error = %e, "Could not record next run");
            }
        }

        tracing::info!(schedule_id, cron = cron_expression, "Schedule registered");
        Ok(())
    }

    /// Cancel and remove the live timer for a schedule. Unknown ids are a
    /// no-op so disable/delete flows stay idempotent.
    pub async fn unregister(&self, schedule_id: DbId) -> Result<(), CoreError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job_id) = jobs.remove(&schedule_id) {
            self.scheduler
                .clone()
                .remove(&job_id)
                .await
                .map_err(scheduler_error)?;
            tracing::info!(schedule_id, "Schedule unregistered");
        }
        Ok(())
    }

    /// Register every enabled persisted schedule. Called at startup.
    pub async fn load_enabled(&self) -> Result<usize, CoreError> {
        let schedules = ScheduleRepo::list_enabled(&self.pool)
            .await
            .map_err(into_core)?;
        let mut count = 0;
        for schedule in &schedules {
            match self
                .register(
                    schedule.id,
                    &schedule.cron_expression,
                    schedule.drive_id,
                    schedule.num_points,
                )
                .await
            {
                Ok(()) => count += 1,
                Err(e) => {
                    tracing::warn!(schedule_id = schedule.id, error = %e, "Skipping schedule");
                }
            }
        }
        tracing::info!(count, "Schedules initialized");
        Ok(count)
    }

    /// Number of live timers.
    pub async fn timer_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Stop the timer wheel. In-flight benchmark runs finish on their own.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.scheduler
            .clone()
            .shutdown()
            .await
            .map_err(scheduler_error)
    }
}

/// One schedule firing: resolve the drive scope and submit a run per drive,
/// fire-and-forget. One drive's failure never aborts its siblings; the
/// last-run stamp is updated after the fan-out either way.
async fn fire_schedule(
    pool: &DbPool,
    engine: &Arc<BenchmarkEngine>,
    schedule_id: DbId,
    drive_scope: Option<DbId>,
    num_points: i64,
) {
    tracing::info!(schedule_id, "Schedule fired");

    let drive_ids: Vec<DbId> = match drive_scope {
        Some(drive_id) => vec![drive_id],
        None => match DriveRepo::list_connected(pool).await {
            Ok(rows) => rows.into_iter().map(|r| r.drive_id).collect(),
            Err(e) => {
                tracing::error!(schedule_id, error = %e, "Could not resolve schedule scope");
                return;
            }
        },
    };

    for drive_id in drive_ids {
        match engine
            .start_run(drive_id, Some(num_points), TriggerKind::Scheduled)
            .await
        {
            Ok(run_id) => {
                tracing::info!(schedule_id, drive_id, run_id, "Scheduled run submitted");
            }
            Err(e) => {
                tracing::warn!(schedule_id, drive_id, error = %e, "Could not start scheduled run");
            }
        }
    }

    if let Err(e) = ScheduleRepo::touch_last_run(pool, schedule_id, Utc::now()).await {
        tracing::error!(schedule_id, error = %e, "Failed to update last-run stamp");
    }
}

/// Periodic diagnostic poll across all connected drives.
///
/// Deliberately independent of the cron schedules: a plain fixed interval,
/// stopped by the cancellation token. The immediate first tick is skipped so
/// the loop does not race startup discovery.
pub async fn run_poll_loop(
    monitor: Arc<SmartMonitor>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "SMART poll loop started");
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("SMART poll loop stopping");
                break;
            }
            _ = ticker.tick() => {
                monitor.poll_all().await;
            }
        }
    }
}
