//! Diagnostic poll cycle.
//!
//! Per drive and per cycle: read diagnostics, load the previous cached
//! snapshot, evaluate transition alerts, overwrite the snapshot, archive the
//! reading, dispatch alerts, broadcast the update. The read-snapshot →
//! evaluate → write-snapshot sequence runs under a per-drive mutex: the
//! previous snapshot must be observed before the new reading overwrites it,
//! even if two polls of the same drive ever overlap.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use drivewatch_core::alert::{evaluate, AlertDrive};
use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::DbId;
use drivewatch_core::CoreError;
use drivewatch_db::repositories::{DriveRepo, SmartCacheRepo};
use drivewatch_db::{into_core, DbPool};
use drivewatch_events::{FeedEvent, LiveFeed};
use drivewatch_notify::Dispatcher;
use drivewatch_probes::DiagnosticReader;
use drivewatch_tsdb::{DriveTags, TimeSeriesStore};

/// Polls SMART state and drives the alert pipeline.
pub struct SmartMonitor {
    pool: DbPool,
    store: Arc<dyn TimeSeriesStore>,
    reader: Arc<dyn DiagnosticReader>,
    feed: Arc<LiveFeed>,
    dispatcher: Arc<Dispatcher>,
    /// One lock per drive serializing the read-evaluate-write sequence.
    locks: Mutex<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl SmartMonitor {
    pub fn new(
        pool: DbPool,
        store: Arc<dyn TimeSeriesStore>,
        reader: Arc<dyn DiagnosticReader>,
        feed: Arc<LiveFeed>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            pool,
            store,
            reader,
            feed,
            dispatcher,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn drive_lock(&self, drive_id: DbId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(drive_id).or_default())
    }

    /// Poll one drive and run the full evaluation pipeline.
    pub async fn poll_drive(&self, drive_id: DbId) -> Result<SmartReading, CoreError> {
        let drive = DriveRepo::get(&self.pool, drive_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("drive", drive_id))?;

        let lock = self.drive_lock(drive_id).await;
        let _serialized = lock.lock().await;

        let reading = self.reader.read(&drive.device_path).await?;

        // The cached row is the "before" state; it must be read before the
        // upsert below replaces it.
        let previous = SmartCacheRepo::get(&self.pool, drive_id)
            .await
            .map_err(into_core)?;
        let threshold = self.dispatcher.threshold_for(drive_id).await?;
        let snapshot = previous.as_ref().map(|row| row.as_snapshot());
        let alerts = evaluate(
            &AlertDrive {
                drive_id,
                serial: drive.serial_number.clone(),
                model: drive.model.clone(),
            },
            &reading,
            snapshot.as_ref(),
            threshold,
        );

        SmartCacheRepo::upsert(&self.pool, drive_id, &reading)
            .await
            .map_err(into_core)?;

        self.store
            .write_smart_reading(
                DriveTags {
                    serial: &drive.serial_number,
                    vendor: &drive.vendor,
                    model: &drive.model,
                    device: &drive.device_path,
                },
                &reading,
            )
            .await?;

        if !alerts.is_empty() {
            tracing::info!(
                serial = %drive.serial_number,
                count = alerts.len(),
                "Alert transitions fired"
            );
            self.dispatcher.dispatch_all(&alerts).await;
        }

        self.feed
            .broadcast(&FeedEvent::SmartUpdated {
                drive_id,
                health: reading.health(),
                temperature: reading.temperature,
                reading: reading.clone(),
            })
            .await;

        Ok(reading)
    }

    /// Poll every connected drive. One drive's failure is logged and never
    /// prevents the others from being polled.
    pub async fn poll_all(&self) {
        let drives = match DriveRepo::list_connected(&self.pool).await {
            Ok(drives) => drives,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list drives for SMART poll");
                return;
            }
        };

        for drive in drives {
            if let Err(e) = self.poll_drive(drive.drive_id).await {
                tracing::warn!(
                    drive_id = drive.drive_id,
                    device = %drive.device_path,
                    error = %e,
                    "SMART poll failed"
                );
            }
        }
    }
}
