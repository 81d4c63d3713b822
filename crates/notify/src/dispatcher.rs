//! Alert fan-out across subscribed channels.
//!
//! One channel's delivery failure must never block delivery to the others or
//! propagate into the poll cycle that produced the alert: failures here are
//! logged and dropped, not retried.

use chrono::Utc;

use drivewatch_core::alert::{evaluate, Alert, AlertDrive, AlertType};
use drivewatch_core::types::DbId;
use drivewatch_core::CoreError;
use drivewatch_db::repositories::{ChannelRepo, DriveRepo, SmartCacheRepo, ThresholdRepo};
use drivewatch_db::{into_core, DbPool};

use crate::channel::build_channel;

/// Resolves subscriptions and delivers alerts.
pub struct Dispatcher {
    pool: DbPool,
    /// Global temperature threshold, used when a drive has no override row.
    default_temperature_threshold: f64,
}

impl Dispatcher {
    pub fn new(pool: DbPool, default_temperature_threshold: f64) -> Self {
        Self {
            pool,
            default_temperature_threshold,
        }
    }

    /// Effective temperature threshold for a drive: per-drive override, or
    /// the global default.
    pub async fn threshold_for(&self, drive_id: DbId) -> Result<f64, CoreError> {
        let row = ThresholdRepo::get(&self.pool, drive_id)
            .await
            .map_err(into_core)?;
        Ok(row
            .map(|r| r.temperature_threshold_celsius)
            .unwrap_or(self.default_temperature_threshold))
    }

    /// Deliver one alert to every enabled channel subscribed to its type.
    ///
    /// Failures are isolated per channel and logged; nothing propagates to
    /// the caller.
    pub async fn dispatch(&self, alert: &Alert) {
        let subscription_type = alert.alert_type.subscription_type();
        let subscribers =
            match ChannelRepo::subscribers_for_alert(&self.pool, subscription_type.as_str()).await
            {
                Ok(subs) => subs,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load alert subscriptions");
                    return;
                }
            };

        for subscriber in subscribers {
            if !subscriber.enabled {
                tracing::debug!(channel_id = subscriber.channel_id, "Skipping disabled channel");
                continue;
            }
            let channel = match build_channel(&subscriber.kind, &subscriber.config) {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::error!(
                        channel_id = subscriber.channel_id,
                        error = %e,
                        "Channel config rejected at send time"
                    );
                    continue;
                }
            };
            if let Err(e) = channel.send(alert).await {
                tracing::error!(
                    channel_id = subscriber.channel_id,
                    alert_type = alert.alert_type.as_str(),
                    drive_serial = %alert.drive_serial,
                    error = %e,
                    "Alert delivery failed"
                );
            }
        }
    }

    /// Deliver a batch of alerts in order.
    pub async fn dispatch_all(&self, alerts: &[Alert]) {
        for alert in alerts {
            self.dispatch(alert).await;
        }
    }

    /// New-channel catch-up: re-evaluate every connected drive's cached
    /// state as if no previous snapshot existed and deliver the resulting
    /// alerts to this channel only.
    ///
    /// Lets a fresh subscriber learn about already-failing or already-hot
    /// drives immediately instead of waiting for the next transition.
    /// Returns the number of alerts delivered.
    pub async fn catch_up_channel(&self, channel_id: DbId) -> Result<usize, CoreError> {
        let channel = ChannelRepo::get(&self.pool, channel_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("notification channel", channel_id))?;
        if !channel.enabled {
            return Ok(0);
        }

        let subscribed: Vec<String> = ChannelRepo::subscriptions_for_channel(&self.pool, channel_id)
            .await
            .map_err(into_core)?
            .into_iter()
            .map(|s| s.alert_type)
            .collect();
        if subscribed.is_empty() {
            return Ok(0);
        }

        let sender = build_channel(&channel.kind, &channel.config)?;
        let drives = DriveRepo::list_connected(&self.pool)
            .await
            .map_err(into_core)?;

        let mut delivered = 0;
        for drive in drives {
            let Some(cache) = SmartCacheRepo::get(&self.pool, drive.drive_id)
                .await
                .map_err(into_core)?
            else {
                continue;
            };
            let threshold = self.threshold_for(drive.drive_id).await?;
            let alert_drive = AlertDrive {
                drive_id: drive.drive_id,
                serial: drive.serial_number.clone(),
                model: drive.model.clone(),
            };
            // No previous snapshot: any currently-violated condition counts
            // as a fresh transition.
            let alerts = evaluate(&alert_drive, &cache.as_reading(), None, threshold);

            for alert in alerts {
                let bucket = alert.alert_type.subscription_type().as_str();
                if !subscribed.iter().any(|s| s == bucket) {
                    continue;
                }
                match sender.send(&alert).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::error!(
                            channel_id,
                            drive_serial = %alert.drive_serial,
                            error = %e,
                            "Catch-up delivery failed"
                        );
                    }
                }
            }
        }

        Ok(delivered)
    }

    /// Send a synthetic sample alert through a channel so its configuration
    /// can be verified end to end. Unlike [`Dispatcher::dispatch`], the
    /// delivery error surfaces to the caller.
    pub async fn test_channel(&self, channel_id: DbId) -> Result<(), CoreError> {
        let channel = ChannelRepo::get(&self.pool, channel_id)
            .await
            .map_err(into_core)?
            .ok_or_else(|| CoreError::not_found("notification channel", channel_id))?;

        let sender = build_channel(&channel.kind, &channel.config)?;
        let sample = Alert {
            alert_type: AlertType::SmartError,
            drive_id: 0,
            drive_serial: "TEST-SERIAL-00000".to_string(),
            drive_model: "Test Drive (Sample Alert)".to_string(),
            message: "This is a test notification from drivewatch. If you see this, the channel is configured correctly.".to_string(),
            value: None,
            threshold: None,
            timestamp: Utc::now(),
        };
        sender.send(&sample).await.map_err(CoreError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use drivewatch_core::drive::{DiscoveredDrive, DriveType};
    use drivewatch_core::smart::SmartReading;

    use super::*;

    async fn setup() -> DbPool {
        let pool = drivewatch_db::memory_pool().await.expect("pool");
        drivewatch_db::run_migrations(&pool).await.expect("migrations");
        pool
    }

    async fn insert_drive(pool: &DbPool, serial: &str) -> i64 {
        DriveRepo::insert_discovered(
            pool,
            &DiscoveredDrive {
                serial_number: serial.to_string(),
                device_path: "/dev/sda".to_string(),
                vendor: "Acme".to_string(),
                model: "Blazer 1TB".to_string(),
                firmware_revision: "1.0".to_string(),
                capacity: 1_000_204_886_016,
                drive_type: DriveType::Ssd,
                rpm: None,
                interface_type: None,
                logical_sector_size: None,
                physical_sector_size: None,
            },
            Utc::now(),
        )
        .await
        .expect("insert drive")
        .drive_id
    }

    fn healthy_reading() -> SmartReading {
        SmartReading {
            timestamp: Utc::now(),
            temperature: Some(38.0),
            power_on_hours: Some(100),
            power_cycle_count: Some(10),
            reallocated_sectors: Some(0),
            pending_sectors: Some(0),
            uncorrectable_errors: Some(0),
            health_passed: Some(true),
            attributes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn threshold_override_beats_global_default() {
        let pool = setup().await;
        let drive_id = insert_drive(&pool, "S1").await;
        let dispatcher = Dispatcher::new(pool.clone(), 55.0);

        assert_eq!(dispatcher.threshold_for(drive_id).await.unwrap(), 55.0);

        ThresholdRepo::set(&pool, drive_id, 65.0).await.expect("set");
        assert_eq!(dispatcher.threshold_for(drive_id).await.unwrap(), 65.0);
    }

    #[tokio::test]
    async fn catch_up_requires_an_existing_channel() {
        let pool = setup().await;
        let dispatcher = Dispatcher::new(pool, 55.0);
        let err = dispatcher.catch_up_channel(99).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "notification channel", .. });
    }

    #[tokio::test]
    async fn catch_up_without_subscriptions_delivers_nothing() {
        let pool = setup().await;
        let drive_id = insert_drive(&pool, "S1").await;
        SmartCacheRepo::upsert(&pool, drive_id, &healthy_reading())
            .await
            .expect("cache");

        let channel = ChannelRepo::create(
            &pool,
            "hooks",
            "webhook",
            r#"{"url":"https://example.invalid/hook"}"#,
            Utc::now(),
        )
        .await
        .expect("channel");

        let dispatcher = Dispatcher::new(pool, 55.0);
        assert_eq!(dispatcher.catch_up_channel(channel.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn catch_up_skips_disabled_channels() {
        let pool = setup().await;
        let channel = ChannelRepo::create(
            &pool,
            "hooks",
            "webhook",
            r#"{"url":"https://example.invalid/hook"}"#,
            Utc::now(),
        )
        .await
        .expect("channel");
        ChannelRepo::subscribe(&pool, channel.id, "temperature").await.expect("sub");
        ChannelRepo::set_enabled(&pool, channel.id, false).await.expect("disable");

        let dispatcher = Dispatcher::new(pool, 55.0);
        assert_eq!(dispatcher.catch_up_channel(channel.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn catch_up_with_healthy_state_stays_silent() {
        // Subscribed, enabled, cached state present, but nothing violated:
        // so nothing is sent (and the invalid endpoint is never contacted).
        let pool = setup().await;
        let drive_id = insert_drive(&pool, "S1").await;
        SmartCacheRepo::upsert(&pool, drive_id, &healthy_reading())
            .await
            .expect("cache");

        let channel = ChannelRepo::create(
            &pool,
            "hooks",
            "webhook",
            r#"{"url":"https://example.invalid/hook"}"#,
            Utc::now(),
        )
        .await
        .expect("channel");
        ChannelRepo::subscribe(&pool, channel.id, "temperature").await.expect("sub");
        ChannelRepo::subscribe(&pool, channel.id, "smart_error").await.expect("sub");

        let dispatcher = Dispatcher::new(pool, 55.0);
        assert_eq!(dispatcher.catch_up_channel(channel.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fire_surfaces_bad_config_as_validation() {
        let pool = setup().await;
        let channel = ChannelRepo::create(&pool, "broken", "webhook", "not json", Utc::now())
            .await
            .expect("channel");

        let dispatcher = Dispatcher::new(pool, 55.0);
        let err = dispatcher.test_channel(channel.id).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }
}
