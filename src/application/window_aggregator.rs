// Window aggregation - per-device rolling statistics over a trailing window
use crate::domain::reading::{DeviceWindowStats, TelemetryReading};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Compute per-device statistics over the trailing window (T-W, T].
///
/// Stateless: recomputed fresh from the raw readings each evaluation cycle,
/// so the same inputs at a given instant always produce the same stats.
/// Devices with zero in-window readings produce no row. SpO2 values outside
/// (0, 100) and missing values are discarded per field, never zero-filled.
pub fn aggregate_window(
    readings: &[TelemetryReading],
    window_end: DateTime<Utc>,
    window: Duration,
) -> Vec<DeviceWindowStats> {
    let window_start = window_end - window;

    // BTreeMap keeps the output deterministically ordered by device id.
    let mut by_device: BTreeMap<&str, Vec<&TelemetryReading>> = BTreeMap::new();
    for reading in readings {
        if reading.observed_at > window_start && reading.observed_at <= window_end {
            by_device
                .entry(reading.device_id.as_str())
                .or_default()
                .push(reading);
        }
    }

    by_device
        .into_iter()
        .map(|(device_id, rows)| {
            let spo2_values: Vec<f64> = rows.iter().filter_map(|r| r.valid_spo2()).collect();
            let pr_values: Vec<i32> = rows.iter().filter_map(|r| r.pulse_rate).collect();
            let last_reading_time = rows
                .iter()
                .map(|r| r.observed_at)
                .max()
                .unwrap_or(window_end);

            DeviceWindowStats {
                device_id: device_id.to_string(),
                reading_count: rows.len(),
                min_spo2: spo2_values.iter().copied().reduce(f64::min),
                avg_spo2: mean_f64(&spo2_values),
                max_spo2: spo2_values.iter().copied().reduce(f64::max),
                min_pulse_rate: pr_values.iter().copied().min(),
                avg_pulse_rate: mean_i32(&pr_values),
                max_pulse_rate: pr_values.iter().copied().max(),
                last_reading_time,
            }
        })
        .collect()
}

/// Most recent raw reading per device within the window, used by the
/// correlator for display vitals (the snapshot, not the aggregate).
pub fn latest_snapshot(
    readings: &[TelemetryReading],
    window_end: DateTime<Utc>,
    window: Duration,
) -> HashMap<String, TelemetryReading> {
    let window_start = window_end - window;
    let mut latest: HashMap<String, TelemetryReading> = HashMap::new();

    for reading in readings {
        if reading.observed_at <= window_start || reading.observed_at > window_end {
            continue;
        }
        match latest.get(&reading.device_id) {
            Some(current) if current.observed_at >= reading.observed_at => {}
            _ => {
                latest.insert(reading.device_id.clone(), reading.clone());
            }
        }
    }

    latest
}

fn mean_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn mean_i32(values: &[i32]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64)
    }
}
