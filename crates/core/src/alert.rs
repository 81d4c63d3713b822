//! Transition-gated alert evaluation.
//!
//! Pure logic, no database access. The caller fetches the previous cached
//! snapshot and the effective temperature threshold and passes them in; the
//! evaluator decides which alerts fire for the new reading. Each rule fires
//! once per transition into the condition, not on every poll while the
//! condition persists.

use serde::{Deserialize, Serialize};

use crate::smart::SmartReading;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

/// Kind of alert condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// SMART self-assessment flipped to failing. Has no recovery
    /// counterpart: a drive that starts passing again stays silent.
    SmartError,
    /// Temperature rose above the configured threshold.
    Temperature,
    /// Temperature fell back to or below the threshold.
    TemperatureRecovery,
}

impl AlertType {
    /// Canonical string form, as stored in `notification_subscriptions`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmartError => "smart_error",
            Self::Temperature => "temperature",
            Self::TemperatureRecovery => "temperature_recovery",
        }
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "smart_error" => Some(Self::SmartError),
            "temperature" => Some(Self::Temperature),
            "temperature_recovery" => Some(Self::TemperatureRecovery),
            _ => None,
        }
    }

    /// Subscription bucket this alert is delivered through. Recovery notices
    /// ride the same subscription as the alert they clear, so subscribers of
    /// `temperature` get both edges.
    pub fn subscription_type(self) -> AlertType {
        match self {
            Self::TemperatureRecovery => Self::Temperature,
            other => other,
        }
    }
}

/// A fired alert, ready for channel delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub drive_id: DbId,
    pub drive_serial: String,
    pub drive_model: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub timestamp: Timestamp,
}

/// Minimal drive identity carried into alert payloads.
#[derive(Debug, Clone)]
pub struct AlertDrive {
    pub drive_id: DbId,
    pub serial: String,
    pub model: String,
}

/// The previous cached reading, used as the "before" state for transition
/// detection. `None` fields mean the metric was absent from the last poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartSnapshot {
    pub temperature: Option<f64>,
    pub health_passed: Option<bool>,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate which alerts fire for `reading` given the previous snapshot.
///
/// With `previous == None` (first poll, or a new channel catching up) any
/// currently-violated condition counts as a fresh transition and fires
/// immediately, except temperature recovery which requires a prior
/// above-threshold state to make sense.
pub fn evaluate(
    drive: &AlertDrive,
    reading: &SmartReading,
    previous: Option<&SmartSnapshot>,
    temperature_threshold: f64,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    // Health: fires on the transition into failing. A snapshot without a
    // self-assessment result counts as "was passing".
    let was_failing = previous.is_some_and(|p| p.health_passed == Some(false));
    if reading.health_passed == Some(false) && !was_failing {
        alerts.push(Alert {
            alert_type: AlertType::SmartError,
            drive_id: drive.drive_id,
            drive_serial: drive.serial.clone(),
            drive_model: drive.model.clone(),
            message: "SMART self-assessment test reported FAILURE. Drive health check failed."
                .to_string(),
            value: None,
            threshold: None,
            timestamp: reading.timestamp,
        });
    }

    if let Some(temp) = reading.temperature {
        let was_above = previous
            .and_then(|p| p.temperature)
            .is_some_and(|t| t > temperature_threshold);

        // Temperature: fires when the reading crosses above the threshold.
        if temp > temperature_threshold && !was_above {
            alerts.push(Alert {
                alert_type: AlertType::Temperature,
                drive_id: drive.drive_id,
                drive_serial: drive.serial.clone(),
                drive_model: drive.model.clone(),
                message: format!(
                    "Drive temperature {temp}\u{b0}C exceeds threshold of {temperature_threshold}\u{b0}C."
                ),
                value: Some(temp),
                threshold: Some(temperature_threshold),
                timestamp: reading.timestamp,
            });
        }

        // Recovery: fires when the reading drops back to or below the
        // threshold, and only if a prior snapshot was above it.
        if temp <= temperature_threshold && was_above {
            alerts.push(Alert {
                alert_type: AlertType::TemperatureRecovery,
                drive_id: drive.drive_id,
                drive_serial: drive.serial.clone(),
                drive_model: drive.model.clone(),
                message: format!(
                    "Drive temperature {temp}\u{b0}C is back at or below threshold of {temperature_threshold}\u{b0}C."
                ),
                value: Some(temp),
                threshold: Some(temperature_threshold),
                timestamp: reading.timestamp,
            });
        }
    }

    alerts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn drive() -> AlertDrive {
        AlertDrive {
            drive_id: 1,
            serial: "S1".to_string(),
            model: "Test Drive".to_string(),
        }
    }

    fn reading(temperature: Option<f64>, health_passed: Option<bool>) -> SmartReading {
        SmartReading {
            timestamp: chrono::Utc::now(),
            temperature,
            power_on_hours: None,
            power_cycle_count: None,
            reallocated_sectors: None,
            pending_sectors: None,
            uncorrectable_errors: None,
            health_passed,
            attributes: Vec::new(),
        }
    }

    fn snapshot(temperature: Option<f64>, health_passed: Option<bool>) -> SmartSnapshot {
        SmartSnapshot {
            temperature,
            health_passed,
        }
    }

    // -- health transitions ---------------------------------------------------

    #[test]
    fn health_failure_fires_once_per_transition() {
        let d = drive();
        // healthy → failing: one alert.
        let first = evaluate(&d, &reading(None, Some(false)), Some(&snapshot(None, Some(true))), 55.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].alert_type, AlertType::SmartError);

        // failing → still failing: silent.
        let repeat = evaluate(&d, &reading(None, Some(false)), Some(&snapshot(None, Some(false))), 55.0);
        assert!(repeat.is_empty());

        // failing → healthy again: no recovery alert for health, by design.
        let recovered = evaluate(&d, &reading(None, Some(true)), Some(&snapshot(None, Some(false))), 55.0);
        assert!(recovered.is_empty());
    }

    #[test]
    fn health_failure_fires_without_prior_snapshot() {
        let alerts = evaluate(&drive(), &reading(None, Some(false)), None, 55.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::SmartError);
    }

    // -- temperature transitions ----------------------------------------------

    #[test]
    fn temperature_sequence_fires_exactly_two_alerts() {
        let d = drive();
        let threshold = 55.0;
        let temps = [50.0, 60.0, 70.0, 50.0];

        let mut fired = Vec::new();
        let mut prev: Option<SmartSnapshot> = None;
        for t in temps {
            let r = reading(Some(t), Some(true));
            fired.extend(evaluate(&d, &r, prev.as_ref(), threshold));
            prev = Some(snapshot(Some(t), Some(true)));
        }

        let kinds: Vec<_> = fired.iter().map(|a| a.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::Temperature, AlertType::TemperatureRecovery]);
        assert_eq!(fired[0].value, Some(60.0));
        assert_eq!(fired[1].value, Some(50.0));
    }

    #[test]
    fn no_recovery_without_prior_snapshot() {
        // First-ever poll at a cool temperature must stay silent.
        let alerts = evaluate(&drive(), &reading(Some(50.0), Some(true)), None, 55.0);
        assert!(alerts.is_empty());
    }

    #[test]
    fn hot_reading_without_snapshot_fires_immediately() {
        // New-channel catch-up: a currently-violated condition counts as a
        // fresh transition.
        let alerts = evaluate(&drive(), &reading(Some(70.0), Some(false)), None, 55.0);
        let kinds: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::SmartError, AlertType::Temperature]);
    }

    #[test]
    fn snapshot_without_temperature_counts_as_below_threshold() {
        let alerts = evaluate(
            &drive(),
            &reading(Some(70.0), Some(true)),
            Some(&snapshot(None, Some(true))),
            55.0,
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Temperature);
    }

    #[test]
    fn reading_without_temperature_is_silent_on_temperature_rules() {
        let alerts = evaluate(
            &drive(),
            &reading(None, Some(true)),
            Some(&snapshot(Some(90.0), Some(true))),
            55.0,
        );
        assert!(alerts.is_empty());
    }

    // -- subscription routing -------------------------------------------------

    #[test]
    fn recovery_routes_through_the_temperature_subscription() {
        assert_eq!(
            AlertType::TemperatureRecovery.subscription_type(),
            AlertType::Temperature
        );
        assert_eq!(AlertType::SmartError.subscription_type(), AlertType::SmartError);
    }
}
