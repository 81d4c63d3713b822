//! InfluxDB 2.x implementation of [`TimeSeriesStore`].
//!
//! Uses the plain HTTP API: line protocol against `/api/v2/write` and the
//! predicate endpoint `/api/v2/delete`. No SDK dependency.

use std::time::Duration;

use async_trait::async_trait;

use drivewatch_core::bench::{CurvePoint, ProfileResult};
use drivewatch_core::smart::SmartReading;
use drivewatch_core::types::DbId;

use crate::line::Line;
use crate::{
    DriveTags, RunTags, TimeSeriesStore, TsdbError, MEASUREMENT_POINTS, MEASUREMENT_PROFILES,
    MEASUREMENT_SMART, MEASUREMENT_SMART_ATTRIBUTES,
};

/// HTTP request timeout for a single write or delete.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delete predicates cover all time; the predicate itself selects the points.
const DELETE_RANGE_START: &str = "1970-01-01T00:00:00Z";
const DELETE_RANGE_STOP: &str = "2099-12-31T00:00:00Z";

/// Connection settings for an InfluxDB 2.x instance.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

/// InfluxDB-backed time-series store.
pub struct InfluxStore {
    client: reqwest::Client,
    config: InfluxConfig,
}

impl InfluxStore {
    pub fn new(config: InfluxConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    /// POST a batch of rendered lines to the write endpoint.
    async fn write_lines(&self, lines: &[Line]) -> Result<(), TsdbError> {
        if lines.is_empty() {
            return Ok(());
        }
        let body = lines
            .iter()
            .map(Line::render)
            .collect::<Vec<_>>()
            .join("\n");
        tracing::debug!(lines = lines.len(), bucket = %self.config.bucket, "Writing points");

        let response = self
            .client
            .post(format!("{}/api/v2/write", self.config.url))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        check_status(response).await
    }

    /// Delete every point matching the predicate, across all time.
    async fn delete_where(&self, predicate: String) -> Result<(), TsdbError> {
        let response = self
            .client
            .post(format!("{}/api/v2/delete", self.config.url))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .json(&serde_json::json!({
                "start": DELETE_RANGE_START,
                "stop": DELETE_RANGE_STOP,
                "predicate": predicate,
            }))
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), TsdbError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(TsdbError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl TimeSeriesStore for InfluxStore {
    async fn write_curve_points(
        &self,
        tags: RunTags<'_>,
        start_ms: i64,
        points: &[CurvePoint],
    ) -> Result<(), TsdbError> {
        let run_id = tags.run_id.to_string();
        let lines: Vec<Line> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                // One millisecond apart so every point keeps a distinct timestamp.
                Line::new(MEASUREMENT_POINTS, start_ms + i as i64)
                    .tag("serial", tags.serial)
                    .tag("run_id", &run_id)
                    .tag("drive_type", tags.drive_type.as_str())
                    .int_field("position", p.position)
                    .float_field("speed_bps", p.speed_bps)
            })
            .collect();
        self.write_lines(&lines).await
    }

    async fn write_profile_results(
        &self,
        tags: RunTags<'_>,
        start_ms: i64,
        results: &[ProfileResult],
    ) -> Result<(), TsdbError> {
        let run_id = tags.run_id.to_string();
        let lines: Vec<Line> = results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Line::new(MEASUREMENT_PROFILES, start_ms + i as i64)
                    .tag("serial", tags.serial)
                    .tag("run_id", &run_id)
                    .tag("drive_type", tags.drive_type.as_str())
                    .tag("profile", r.profile.as_str())
                    .float_field("bw_bps", r.bw_bps)
                    .float_field("iops", r.iops)
                    .float_field("lat_mean_ns", r.lat_mean_ns)
                    .float_field("lat_p50_ns", r.lat_p50_ns)
                    .float_field("lat_p95_ns", r.lat_p95_ns)
                    .float_field("lat_p99_ns", r.lat_p99_ns)
                    .float_field("lat_p999_ns", r.lat_p999_ns)
            })
            .collect();
        self.write_lines(&lines).await
    }

    async fn write_smart_reading(
        &self,
        tags: DriveTags<'_>,
        reading: &SmartReading,
    ) -> Result<(), TsdbError> {
        let ts = reading.timestamp.timestamp_millis();
        let mut lines = Vec::with_capacity(1 + reading.attributes.len());

        let mut health = Line::new(MEASUREMENT_SMART, ts)
            .tag("serial", tags.serial)
            .tag("vendor", tags.vendor)
            .tag("model", tags.model)
            .tag("device", tags.device);
        if let Some(v) = reading.temperature {
            health = health.float_field("temperature", v);
        }
        if let Some(v) = reading.power_on_hours {
            health = health.int_field("power_on_hours", v);
        }
        if let Some(v) = reading.power_cycle_count {
            health = health.int_field("power_cycle_count", v);
        }
        if let Some(v) = reading.reallocated_sectors {
            health = health.int_field("reallocated_sectors", v);
        }
        if let Some(v) = reading.pending_sectors {
            health = health.int_field("pending_sectors", v);
        }
        if let Some(v) = reading.uncorrectable_errors {
            health = health.int_field("uncorrectable_errors", v);
        }
        if let Some(v) = reading.health_passed {
            health = health.bool_field("health_passed", v);
        }
        if health.has_fields() {
            lines.push(health);
        }

        for attr in &reading.attributes {
            lines.push(
                Line::new(MEASUREMENT_SMART_ATTRIBUTES, ts)
                    .tag("serial", tags.serial)
                    .tag("attr_id", &attr.attr_id.to_string())
                    .tag("attr_name", &attr.name)
                    .int_field("value", attr.value)
                    .int_field("worst", attr.worst)
                    .int_field("threshold", attr.threshold)
                    .int_field("raw_value", attr.raw_value)
                    .bool_field("failing", attr.failing),
            );
        }

        self.write_lines(&lines).await
    }

    async fn delete_run_data(&self, run_id: DbId) -> Result<(), TsdbError> {
        self.delete_where(format!(
            "_measurement=\"{MEASUREMENT_POINTS}\" AND run_id=\"{run_id}\""
        ))
        .await?;
        self.delete_where(format!(
            "_measurement=\"{MEASUREMENT_PROFILES}\" AND run_id=\"{run_id}\""
        ))
        .await
    }

    async fn delete_drive_data(&self, serial: &str) -> Result<(), TsdbError> {
        self.delete_where(format!(
            "_measurement=\"{MEASUREMENT_POINTS}\" AND serial=\"{serial}\""
        ))
        .await?;
        self.delete_where(format!(
            "_measurement=\"{MEASUREMENT_PROFILES}\" AND serial=\"{serial}\""
        ))
        .await
    }
}
