// Alert domain models - tiers, per-metric alerts, correlated clinical alerts
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Alert severity. Derived ordering gives WARNING < URGENT < CRITICAL,
/// which is the ordering used for correlation and escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertTier {
    Warning,
    Urgent,
    Critical,
}

impl AlertTier {
    /// One escalation step. CRITICAL is the ceiling and stays put.
    pub fn escalated(self) -> AlertTier {
        match self {
            AlertTier::Warning => AlertTier::Urgent,
            AlertTier::Urgent => AlertTier::Critical,
            AlertTier::Critical => AlertTier::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertTier::Warning => "WARNING",
            AlertTier::Urgent => "URGENT",
            AlertTier::Critical => "CRITICAL",
        }
    }
}

/// Which physiological signal a metric alert came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Spo2,
    PulseRate,
}

/// Pulse-rate breach direction within a single window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PulseRateBreach {
    #[serde(rename = "PR_HIGH")]
    High,
    #[serde(rename = "PR_LOW")]
    Low,
    #[serde(rename = "PR_BOTH")]
    Both,
}

/// A single-metric threshold breach for one device in one evaluation cycle.
/// `threshold` is the breached tier's own boundary, for downstream display.
#[derive(Debug, Clone, Serialize)]
pub struct MetricAlert {
    pub device_id: String,
    pub tier: AlertTier,
    pub metric: MetricKind,
    pub value: f64,
    pub threshold: f64,
    pub observed_at: DateTime<Utc>,
    /// Breach direction, pulse-rate alerts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_breach: Option<PulseRateBreach>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Spo2Low,
    PrAbnormal,
    MultiMetric,
}

/// Care location attached to every clinical alert. When no encounter
/// location resolves, the configured default site is used and `fallback`
/// is set so the dashboard can flag it.
#[derive(Debug, Clone, Serialize)]
pub struct AlertLocation {
    pub name: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    pub fallback: bool,
}

/// Correlated, enriched alert for one device in one evaluation cycle.
/// Created fresh each cycle and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicalAlert {
    pub alert_id: String,
    pub device_id: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub tier: AlertTier,
    pub alert_type: AlertType,
    pub spo2: Option<f64>,
    pub pulse_rate: Option<i32>,
    pub qualifying_conditions: Vec<String>,
    pub escalated: bool,
    pub location: AlertLocation,
    pub message: String,
    pub alert_time: DateTime<Utc>,
}

/// Build the human-readable alert message. Display only - it must be fully
/// reproducible from the other alert fields.
pub fn compose_message(
    tier: AlertTier,
    escalated: bool,
    patient_name: Option<&str>,
    device_id: &str,
    spo2: Option<f64>,
    pulse_rate: Option<i32>,
    qualifying_conditions: &[String],
) -> String {
    let mut message = tier.as_str().to_string();
    if escalated {
        message.push_str(" (ESCALATED)");
    }

    let name = patient_name.unwrap_or("Unknown");
    let spo2_text = spo2
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string());
    let pr_text = pulse_rate
        .map(|v| format!("{} bpm", v))
        .unwrap_or_else(|| "n/a".to_string());

    message.push_str(&format!(
        ": {} [{}] SpO2 {} PR {}",
        name, device_id, spo2_text, pr_text
    ));

    if !qualifying_conditions.is_empty() {
        message.push_str(&format!(
            " (conditions: {})",
            qualifying_conditions.join(", ")
        ));
    }

    message
}
