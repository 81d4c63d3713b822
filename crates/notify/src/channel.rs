//! Notification channel variants.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use drivewatch_core::alert::{Alert, AlertType};
use drivewatch_core::CoreError;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for channel deliveries.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("channel endpoint returned HTTP {0}")]
    Status(u16),
}

impl From<NotifyError> for CoreError {
    fn from(err: NotifyError) -> Self {
        CoreError::Delivery(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Channel kinds and configs
// ---------------------------------------------------------------------------

/// Closed set of channel variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Webhook,
    Slack,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Slack => "slack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "webhook" => Some(Self::Webhook),
            "slack" => Some(Self::Slack),
            _ => None,
        }
    }
}

/// Authentication for the generic webhook variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookAuth {
    #[default]
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// Config blob for [`ChannelKind::Webhook`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub auth: WebhookAuth,
}

/// Config blob for [`ChannelKind::Slack`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

// ---------------------------------------------------------------------------
// Trait and variants
// ---------------------------------------------------------------------------

/// One delivery capability, implemented per variant.
#[async_trait]
pub trait AlertChannel: Send + Sync + std::fmt::Debug {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build reqwest HTTP client")
}

fn check_status(response: &reqwest::Response) -> Result<(), NotifyError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(NotifyError::Status(response.status().as_u16()))
    }
}

/// POSTs the alert as a structured JSON payload to a configured endpoint.
#[derive(Debug)]
pub struct WebhookChannel {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            client: http_client(),
            config,
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.config.url).json(alert);
        request = match &self.config.auth {
            WebhookAuth::None => request,
            WebhookAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            WebhookAuth::Bearer { token } => request.bearer_auth(token),
        };
        let response = request.send().await?;
        check_status(&response)
    }
}

/// POSTs a Block Kit message to a fixed Slack webhook URL.
#[derive(Debug)]
pub struct SlackChannel {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackChannel {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            client: http_client(),
            config,
        }
    }
}

/// Build the Block Kit payload for an alert.
pub(crate) fn slack_payload(alert: &Alert) -> serde_json::Value {
    let (emoji, label) = match alert.alert_type {
        AlertType::Temperature => ("\u{1f321}\u{fe0f}", "Temperature Alert"),
        AlertType::TemperatureRecovery => ("\u{2705}", "Temperature Recovered"),
        AlertType::SmartError => ("\u{26a0}\u{fe0f}", "SMART Health Error"),
    };

    let mut fields = vec![
        serde_json::json!({ "type": "mrkdwn", "text": format!("*Drive:*\n{}", alert.drive_model) }),
        serde_json::json!({ "type": "mrkdwn", "text": format!("*Serial:*\n{}", alert.drive_serial) }),
        serde_json::json!({ "type": "mrkdwn", "text": format!("*Message:*\n{}", alert.message) }),
    ];
    if let Some(value) = alert.value {
        let text = match alert.threshold {
            Some(threshold) => format!("*Value:*\n{value} (threshold: {threshold})"),
            None => format!("*Value:*\n{value}"),
        };
        fields.push(serde_json::json!({ "type": "mrkdwn", "text": text }));
    }

    serde_json::json!({
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": format!("{emoji} {label}"), "emoji": true },
            },
            { "type": "section", "fields": fields },
            {
                "type": "context",
                "elements": [{ "type": "mrkdwn", "text": format!("Timestamp: {}", alert.timestamp.to_rfc3339()) }],
            },
        ],
    })
}

#[async_trait]
impl AlertChannel for SlackChannel {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&slack_payload(alert))
            .send()
            .await?;
        check_status(&response)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Construct the channel implementation for a stored (kind, config) pair.
///
/// Malformed config is a [`CoreError::Validation`]; callers persisting new
/// channels run this first so bad config never reaches the database.
pub fn build_channel(kind: &str, config_json: &str) -> Result<Box<dyn AlertChannel>, CoreError> {
    let kind = ChannelKind::parse(kind)
        .ok_or_else(|| CoreError::Validation(format!("unknown channel kind: {kind}")))?;

    match kind {
        ChannelKind::Webhook => {
            let config: WebhookConfig = serde_json::from_str(config_json)
                .map_err(|e| CoreError::Validation(format!("malformed webhook config: {e}")))?;
            Ok(Box::new(WebhookChannel::new(config)))
        }
        ChannelKind::Slack => {
            let config: SlackConfig = serde_json::from_str(config_json)
                .map_err(|e| CoreError::Validation(format!("malformed slack config: {e}")))?;
            Ok(Box::new(SlackChannel::new(config)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
