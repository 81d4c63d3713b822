//! Disk discovery and registry reconciliation.
//!
//! One scan cycle: enumerate devices through the diagnostic reader, upsert
//! each by serial number, then mark known drives that vanished from the scan
//! as disconnected. Detection and removal are broadcast on the live feed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use drivewatch_core::CoreError;
use drivewatch_db::models::drive::DriveRow;
use drivewatch_db::repositories::DriveRepo;
use drivewatch_db::{into_core, DbPool};
use drivewatch_events::{DriveInfo, FeedEvent, LiveFeed};
use drivewatch_probes::DiagnosticReader;

/// Scans for devices and reconciles the drive registry.
pub struct Discovery {
    pool: DbPool,
    reader: Arc<dyn DiagnosticReader>,
    feed: Arc<LiveFeed>,
}

fn drive_info(row: &DriveRow) -> DriveInfo {
    DriveInfo {
        drive_id: row.drive_id,
        serial_number: row.serial_number.clone(),
        model: row.model.clone(),
        drive_type: row.media_type(),
        capacity: row.capacity,
    }
}

impl Discovery {
    pub fn new(pool: DbPool, reader: Arc<dyn DiagnosticReader>, feed: Arc<LiveFeed>) -> Self {
        Self { pool, reader, feed }
    }

    /// Run one scan cycle. Returns the drives present in this scan.
    pub async fn scan_and_register(&self) -> Result<Vec<DriveRow>, CoreError> {
        let discovered = self.reader.scan().await?;
        let now = Utc::now();
        let mut seen: HashSet<String> = HashSet::with_capacity(discovered.len());
        let mut registered = Vec::with_capacity(discovered.len());

        for d in &discovered {
            seen.insert(d.serial_number.clone());
            let existing = DriveRepo::get_by_serial(&self.pool, &d.serial_number)
                .await
                .map_err(into_core)?;

            let row = match existing {
                Some(previous) => {
                    let row = DriveRepo::update_discovered(&self.pool, d, now)
                        .await
                        .map_err(into_core)?;
                    // Reappearing after an absence counts as a detection.
                    if !previous.is_connected {
                        self.feed
                            .broadcast(&FeedEvent::DriveDetected {
                                drive: drive_info(&row),
                            })
                            .await;
                    }
                    row
                }
                None => {
                    let row = DriveRepo::insert_discovered(&self.pool, d, now)
                        .await
                        .map_err(into_core)?;
                    tracing::info!(
                        serial = %row.serial_number,
                        device = %row.device_path,
                        drive_type = %row.drive_type,
                        "New drive registered"
                    );
                    self.feed
                        .broadcast(&FeedEvent::DriveDetected {
                            drive: drive_info(&row),
                        })
                        .await;
                    row
                }
            };
            registered.push(row);
        }

        // Known drives absent from this scan are marked disconnected, never
        // deleted.
        for row in DriveRepo::list_all(&self.pool).await.map_err(into_core)? {
            if row.is_connected && !seen.contains(&row.serial_number) {
                DriveRepo::set_connected(&self.pool, row.drive_id, false)
                    .await
                    .map_err(into_core)?;
                tracing::info!(serial = %row.serial_number, "Drive disconnected");
                self.feed
                    .broadcast(&FeedEvent::DriveRemoved {
                        drive_id: row.drive_id,
                    })
                    .await;
            }
        }

        Ok(registered)
    }
}
