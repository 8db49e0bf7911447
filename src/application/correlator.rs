// Alert correlation - merge per-metric alerts into one alert per device
use crate::domain::alert::{AlertTier, AlertType, MetricAlert};
use crate::domain::reading::TelemetryReading;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// A per-device merge of the metric alerts from one evaluation cycle,
/// before enrichment. Exists only for devices with at least one breach.
#[derive(Debug, Clone)]
pub struct CorrelatedAlert {
    pub device_id: String,
    pub tier: AlertTier,
    pub alert_type: AlertType,
    /// Display vitals from the most recent raw reading in the window,
    /// not the window aggregate.
    pub spo2: Option<f64>,
    pub pulse_rate: Option<i32>,
    pub observed_at: DateTime<Utc>,
}

/// Merge SpO2 and pulse-rate alerts per device. Overall tier is the maximum
/// across contributing metrics; MULTI_METRIC iff both metrics breached in
/// the same cycle. Devices with no breach produce nothing.
pub fn correlate(
    spo2_alerts: &[MetricAlert],
    pulse_rate_alerts: &[MetricAlert],
    snapshots: &HashMap<String, TelemetryReading>,
) -> Vec<CorrelatedAlert> {
    let mut per_device: BTreeMap<&str, (Option<&MetricAlert>, Option<&MetricAlert>)> =
        BTreeMap::new();
    for alert in spo2_alerts {
        per_device.entry(alert.device_id.as_str()).or_default().0 = Some(alert);
    }
    for alert in pulse_rate_alerts {
        per_device.entry(alert.device_id.as_str()).or_default().1 = Some(alert);
    }

    let mut correlated: Vec<CorrelatedAlert> = per_device
        .into_iter()
        .map(|(device_id, (spo2, pr))| {
            let tier = spo2
                .map(|a| a.tier)
                .max(pr.map(|a| a.tier))
                .unwrap_or(AlertTier::Warning);
            let alert_type = match (spo2, pr) {
                (Some(_), Some(_)) => AlertType::MultiMetric,
                (Some(_), None) => AlertType::Spo2Low,
                (None, _) => AlertType::PrAbnormal,
            };

            let snapshot = snapshots.get(device_id);
            let observed_at = snapshot
                .map(|r| r.observed_at)
                .or_else(|| spo2.or(pr).map(|a| a.observed_at))
                .unwrap_or_else(Utc::now);

            CorrelatedAlert {
                device_id: device_id.to_string(),
                tier,
                alert_type,
                spo2: snapshot.and_then(|r| r.spo2),
                pulse_rate: snapshot.and_then(|r| r.pulse_rate),
                observed_at,
            }
        })
        .collect();

    correlated.sort_by(|a, b| {
        b.tier
            .cmp(&a.tier)
            .then_with(|| a.device_id.cmp(&b.device_id))
    });
    correlated
}
