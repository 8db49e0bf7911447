// Telemetry reading domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reading reported by a pulse oximeter device.
///
/// Readings are immutable once ingested. Per-device arrival order is not
/// guaranteed; `observed_at` provides the ordering used for windowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub device_id: String,
    pub observed_at: DateTime<Utc>,
    pub spo2: Option<f64>,
    pub pulse_rate: Option<i32>,
    pub perfusion_index: Option<f64>,
    pub pleth_variability_index: Option<i32>,
    pub total_hemoglobin: Option<f64>,
    pub signal_quality: Option<i32>,
}

impl TelemetryReading {
    /// SpO2 value if present and physiologically plausible.
    /// Values outside (0, 100) are sensor glitches and are discarded,
    /// never treated as zero.
    pub fn valid_spo2(&self) -> Option<f64> {
        self.spo2.filter(|v| *v > 0.0 && *v < 100.0)
    }
}

/// Rolling statistics for one device over a trailing window.
/// Recomputed fresh each evaluation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceWindowStats {
    pub device_id: String,
    pub reading_count: usize,
    pub min_spo2: Option<f64>,
    pub avg_spo2: Option<f64>,
    pub max_spo2: Option<f64>,
    pub min_pulse_rate: Option<i32>,
    pub avg_pulse_rate: Option<f64>,
    pub max_pulse_rate: Option<i32>,
    pub last_reading_time: DateTime<Utc>,
}

/// Device connectivity classification, independent of the alerting pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityState {
    Online,
    Stale,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub state: ConnectivityState,
    pub last_reading_time: DateTime<Utc>,
    pub seconds_since_last: i64,
}
