// Alert threshold configuration
use serde::Deserialize;

/// Tier boundaries for both metric classifiers.
///
/// Immutable once constructed; injected into the classifiers so tests can
/// vary boundaries without touching classification logic. Defaults match
/// standard pulse-oximetry monitoring practice.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertThresholds {
    /// SpO2 below this fires a WARNING.
    pub spo2_warning: f64,
    /// SpO2 below this fires an URGENT alert.
    pub spo2_urgent: f64,
    /// SpO2 below this fires a CRITICAL alert.
    pub spo2_critical: f64,
    /// Pulse rate above this fires a WARNING (tachycardia side).
    pub pr_high_warning: i32,
    pub pr_high_urgent: i32,
    pub pr_high_critical: i32,
    /// Pulse rate below this fires a WARNING (bradycardia side).
    pub pr_low_warning: i32,
    pub pr_low_urgent: i32,
    pub pr_low_critical: i32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            spo2_warning: 94.0,
            spo2_urgent: 90.0,
            spo2_critical: 85.0,
            pr_high_warning: 110,
            pr_high_urgent: 130,
            pr_high_critical: 150,
            pr_low_warning: 50,
            pr_low_urgent: 45,
            pr_low_critical: 40,
        }
    }
}
