//! Repository for notification channels and their subscriptions.

use sqlx::SqlitePool;

use drivewatch_core::types::{DbId, Timestamp};

use crate::models::notification::{ChannelRow, SubscribedChannel, SubscriptionRow};

/// Column list for `notification_channels` queries.
const COLUMNS: &str = "id, name, kind, config, enabled, created_at";

/// CRUD operations for notification channels and subscriptions.
pub struct ChannelRepo;

impl ChannelRepo {
    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        kind: &str,
        config: &str,
        created_at: Timestamp,
    ) -> Result<ChannelRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_channels (name, kind, config, enabled, created_at) \
             VALUES (?, ?, ?, TRUE, ?) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChannelRow>(&query)
            .bind(name)
            .bind(kind)
            .bind(config)
            .bind(created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &SqlitePool, id: DbId) -> Result<Option<ChannelRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_channels WHERE id = ?");
        sqlx::query_as::<_, ChannelRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ChannelRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_channels ORDER BY id");
        sqlx::query_as::<_, ChannelRow>(&query).fetch_all(pool).await
    }

    pub async fn set_enabled(pool: &SqlitePool, id: DbId, enabled: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notification_channels SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete a channel; its subscriptions cascade.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM notification_channels WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    // -- subscriptions --------------------------------------------------------

    pub async fn subscribe(
        pool: &SqlitePool,
        channel_id: DbId,
        alert_type: &str,
    ) -> Result<SubscriptionRow, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRow>(
            "INSERT INTO notification_subscriptions (channel_id, alert_type) \
             VALUES (?, ?) \
             RETURNING id, channel_id, alert_type",
        )
        .bind(channel_id)
        .bind(alert_type)
        .fetch_one(pool)
        .await
    }

    pub async fn unsubscribe(pool: &SqlitePool, subscription_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM notification_subscriptions WHERE id = ?")
            .bind(subscription_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn subscriptions_for_channel(
        pool: &SqlitePool,
        channel_id: DbId,
    ) -> Result<Vec<SubscriptionRow>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, channel_id, alert_type FROM notification_subscriptions \
             WHERE channel_id = ? ORDER BY id",
        )
        .bind(channel_id)
        .fetch_all(pool)
        .await
    }

    /// All subscriptions for an alert type, joined with their channel. The
    /// dispatcher filters on `enabled` itself so disabled channels can be
    /// logged as skipped.
    pub async fn subscribers_for_alert(
        pool: &SqlitePool,
        alert_type: &str,
    ) -> Result<Vec<SubscribedChannel>, sqlx::Error> {
        sqlx::query_as::<_, SubscribedChannel>(
            "SELECT s.channel_id, s.alert_type, c.kind, c.config, c.enabled \
             FROM notification_subscriptions s \
             JOIN notification_channels c ON c.id = s.channel_id \
             WHERE s.alert_type = ? \
             ORDER BY s.id",
        )
        .bind(alert_type)
        .fetch_all(pool)
        .await
    }
}
