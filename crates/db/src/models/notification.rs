//! Notification channel, subscription, and threshold rows.

use serde::Serialize;
use sqlx::FromRow;

use drivewatch_core::types::{DbId, Timestamp};

/// A row from the `notification_channels` table.
///
/// `config` holds the variant-specific JSON blob (endpoint URL, auth); it is
/// parsed by the channel factory at send time, not here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChannelRow {
    pub id: DbId,
    pub name: String,
    /// Variant tag: `webhook` or `slack`.
    pub kind: String,
    pub config: String,
    pub enabled: bool,
    pub created_at: Timestamp,
}

/// A row from the `notification_subscriptions` table.
///
/// An alert type with no subscription for a channel is never delivered
/// there.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriptionRow {
    pub id: DbId,
    pub channel_id: DbId,
    pub alert_type: String,
}

/// A subscription joined with its channel, as consumed by the dispatcher.
#[derive(Debug, Clone, FromRow)]
pub struct SubscribedChannel {
    pub channel_id: DbId,
    pub alert_type: String,
    pub kind: String,
    pub config: String,
    pub enabled: bool,
}

/// A row from the `drive_alert_thresholds` table: per-drive override of the
/// global temperature alert threshold.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ThresholdRow {
    pub drive_id: DbId,
    pub temperature_threshold_celsius: f64,
}
