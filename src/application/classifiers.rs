// Metric classifiers - tiered per-metric alerts from window statistics
use crate::domain::alert::{AlertTier, MetricAlert, MetricKind, PulseRateBreach};
use crate::domain::reading::DeviceWindowStats;
use crate::domain::thresholds::AlertThresholds;

/// The two independent metric classifiers, sharing one injected threshold
/// configuration.
#[derive(Debug, Clone)]
pub struct MetricClassifiers {
    thresholds: AlertThresholds,
}

impl MetricClassifiers {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// SpO2 alerts: fires iff `min_spo2` breached the warning boundary.
    /// The attached threshold is the fired tier's own boundary, for display.
    /// Ordered most severe first, then lowest SpO2 first.
    pub fn spo2_alerts(&self, stats: &[DeviceWindowStats]) -> Vec<MetricAlert> {
        let t = &self.thresholds;
        let mut alerts: Vec<MetricAlert> = stats
            .iter()
            .filter_map(|s| {
                let min_spo2 = s.min_spo2?;
                let (tier, threshold) = if min_spo2 < t.spo2_critical {
                    (AlertTier::Critical, t.spo2_critical)
                } else if min_spo2 < t.spo2_urgent {
                    (AlertTier::Urgent, t.spo2_urgent)
                } else if min_spo2 < t.spo2_warning {
                    (AlertTier::Warning, t.spo2_warning)
                } else {
                    return None;
                };

                Some(MetricAlert {
                    device_id: s.device_id.clone(),
                    tier,
                    metric: MetricKind::Spo2,
                    value: min_spo2,
                    threshold,
                    observed_at: s.last_reading_time,
                    pr_breach: None,
                })
            })
            .collect();

        alerts.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| a.value.total_cmp(&b.value))
        });
        alerts
    }

    /// Pulse-rate alerts: fires iff the window max breached the tachycardia
    /// boundary or the window min breached the bradycardia boundary. When
    /// both sides breach in the same window the breach kind is PR_BOTH and
    /// the dominant side (highest tier, tie to tachycardia) supplies the
    /// reported value and threshold.
    pub fn pulse_rate_alerts(&self, stats: &[DeviceWindowStats]) -> Vec<MetricAlert> {
        let mut alerts: Vec<MetricAlert> = stats
            .iter()
            .filter_map(|s| self.classify_pulse_rate(s))
            .collect();

        alerts.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        alerts
    }

    fn classify_pulse_rate(&self, stats: &DeviceWindowStats) -> Option<MetricAlert> {
        let t = &self.thresholds;
        let max_pr = stats.max_pulse_rate?;
        let min_pr = stats.min_pulse_rate?;

        let high_tier = if max_pr > t.pr_high_critical {
            Some(AlertTier::Critical)
        } else if max_pr > t.pr_high_urgent {
            Some(AlertTier::Urgent)
        } else if max_pr > t.pr_high_warning {
            Some(AlertTier::Warning)
        } else {
            None
        };
        let low_tier = if min_pr < t.pr_low_critical {
            Some(AlertTier::Critical)
        } else if min_pr < t.pr_low_urgent {
            Some(AlertTier::Urgent)
        } else if min_pr < t.pr_low_warning {
            Some(AlertTier::Warning)
        } else {
            None
        };

        let breach = match (high_tier, low_tier) {
            (Some(_), Some(_)) => PulseRateBreach::Both,
            (Some(_), None) => PulseRateBreach::High,
            (None, Some(_)) => PulseRateBreach::Low,
            (None, None) => return None,
        };

        let high_dominates = high_tier.is_some() && high_tier >= low_tier;
        let tier = high_tier.max(low_tier).unwrap_or(AlertTier::Warning);
        let (value, threshold) = if high_dominates {
            let boundary = match tier {
                AlertTier::Critical => t.pr_high_critical,
                AlertTier::Urgent => t.pr_high_urgent,
                AlertTier::Warning => t.pr_high_warning,
            };
            (max_pr, boundary)
        } else {
            let boundary = match tier {
                AlertTier::Critical => t.pr_low_critical,
                AlertTier::Urgent => t.pr_low_urgent,
                AlertTier::Warning => t.pr_low_warning,
            };
            (min_pr, boundary)
        };

        Some(MetricAlert {
            device_id: stats.device_id.clone(),
            tier,
            metric: MetricKind::PulseRate,
            value: value as f64,
            threshold: threshold as f64,
            observed_at: stats.last_reading_time,
            pr_breach: Some(breach),
        })
    }
}
