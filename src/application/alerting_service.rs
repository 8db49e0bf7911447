// Alerting service - cycle-based evaluation entry points
use crate::application::alert_sink::AlertHistorySink;
use crate::application::classifiers::MetricClassifiers;
use crate::application::correlator::{correlate, CorrelatedAlert};
use crate::application::enrichment::ContextEnricher;
use crate::application::reading_repository::ReadingRepository;
use crate::application::window_aggregator::{aggregate_window, latest_snapshot};
use crate::domain::alert::{AlertTier, ClinicalAlert, MetricAlert};
use crate::domain::reading::{ConnectivityState, DeviceStatus, DeviceWindowStats, TelemetryReading};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Connectivity boundaries for DeviceStatus, in seconds since last reading.
#[derive(Debug, Clone, Copy)]
pub struct StatusThresholds {
    pub online_secs: i64,
    pub stale_secs: i64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            online_secs: 30,
            stale_secs: 120,
        }
    }
}

/// One pin on the spatial alert display. Every alert maps to a pin; the
/// fallback site guarantees coordinates are always present.
#[derive(Debug, Clone, Serialize)]
pub struct AlertMapPin {
    pub alert_id: String,
    pub device_id: String,
    pub patient: String,
    pub tier: AlertTier,
    pub location_name: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    pub fallback: bool,
    pub message: String,
}

/// The evaluation engine. Each call recomputes the full pipeline from the
/// current trailing window; no state is carried between cycles, so the same
/// window and reference data always yield the same alert set.
#[derive(Clone)]
pub struct AlertingService {
    readings: Arc<dyn ReadingRepository>,
    classifiers: MetricClassifiers,
    enricher: Arc<ContextEnricher>,
    sink: Arc<dyn AlertHistorySink>,
    status_thresholds: StatusThresholds,
}

impl AlertingService {
    pub fn new(
        readings: Arc<dyn ReadingRepository>,
        classifiers: MetricClassifiers,
        enricher: Arc<ContextEnricher>,
        sink: Arc<dyn AlertHistorySink>,
        status_thresholds: StatusThresholds,
    ) -> Self {
        Self {
            readings,
            classifiers,
            enricher,
            sink,
            status_thresholds,
        }
    }

    /// Per-device rolling statistics over the trailing window.
    pub async fn vitals_trend(
        &self,
        window_minutes: i64,
    ) -> anyhow::Result<Vec<DeviceWindowStats>> {
        let readings = self.readings.readings_in_window(window_minutes).await?;
        Ok(aggregate_window(
            &readings,
            Utc::now(),
            Duration::minutes(window_minutes),
        ))
    }

    /// Most recent reading per device, ordered by device id.
    pub async fn latest_readings(&self) -> anyhow::Result<Vec<TelemetryReading>> {
        let mut readings = self.readings.latest_per_device().await?;
        readings.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(readings)
    }

    /// Connectivity classification per device, independent of alerting.
    pub async fn device_status(&self) -> anyhow::Result<Vec<DeviceStatus>> {
        let now = Utc::now();
        let mut statuses: Vec<DeviceStatus> = self
            .readings
            .latest_per_device()
            .await?
            .into_iter()
            .map(|reading| {
                let age = (now - reading.observed_at).num_seconds();
                let state = if age < self.status_thresholds.online_secs {
                    ConnectivityState::Online
                } else if age < self.status_thresholds.stale_secs {
                    ConnectivityState::Stale
                } else {
                    ConnectivityState::Offline
                };
                DeviceStatus {
                    device_id: reading.device_id,
                    state,
                    last_reading_time: reading.observed_at,
                    seconds_since_last: age,
                }
            })
            .collect();

        statuses.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(statuses)
    }

    /// Tiered SpO2 alerts for the window.
    pub async fn spo2_alerts(&self, window_minutes: i64) -> anyhow::Result<Vec<MetricAlert>> {
        let stats = self.vitals_trend(window_minutes).await?;
        Ok(self.classifiers.spo2_alerts(&stats))
    }

    /// Tiered pulse-rate alerts for the window.
    pub async fn pulse_rate_alerts(&self, window_minutes: i64) -> anyhow::Result<Vec<MetricAlert>> {
        let stats = self.vitals_trend(window_minutes).await?;
        Ok(self.classifiers.pulse_rate_alerts(&stats))
    }

    /// The full pipeline: aggregate, classify, correlate, enrich, then hand
    /// each alert to the history sink fire-and-forget.
    pub async fn clinical_alerts(&self, window_minutes: i64) -> anyhow::Result<Vec<ClinicalAlert>> {
        let correlated = self.evaluate_correlated(window_minutes).await?;
        let alerts = self.enricher.enrich_all(correlated).await;

        tracing::debug!(
            "evaluation cycle produced {} clinical alerts over {}m window",
            alerts.len(),
            window_minutes
        );

        for alert in &alerts {
            let sink = self.sink.clone();
            let alert = alert.clone();
            // At-least-once; the sink owns retries, the engine never blocks
            // on acknowledgement.
            tokio::spawn(async move {
                if let Err(e) = sink.append(&alert).await {
                    tracing::warn!("history sink write failed for {}: {:#}", alert.alert_id, e);
                }
            });
        }

        Ok(alerts)
    }

    /// Clinical alerts projected onto the spatial display.
    pub async fn alert_location_map(
        &self,
        window_minutes: i64,
    ) -> anyhow::Result<Vec<AlertMapPin>> {
        let alerts = self.clinical_alerts(window_minutes).await?;
        Ok(alerts
            .into_iter()
            .map(|alert| AlertMapPin {
                alert_id: alert.alert_id,
                device_id: alert.device_id,
                patient: alert
                    .patient_name
                    .unwrap_or_else(|| "(not linked)".to_string()),
                tier: alert.tier,
                location_name: alert.location.name,
                city: alert.location.city,
                state: alert.location.state,
                lat: alert.location.lat,
                lon: alert.location.lon,
                fallback: alert.location.fallback,
                message: alert.message,
            })
            .collect())
    }

    async fn evaluate_correlated(
        &self,
        window_minutes: i64,
    ) -> anyhow::Result<Vec<CorrelatedAlert>> {
        let readings = self.readings.readings_in_window(window_minutes).await?;
        let now = Utc::now();
        let window = Duration::minutes(window_minutes);

        let stats = aggregate_window(&readings, now, window);
        let spo2 = self.classifiers.spo2_alerts(&stats);
        let pulse_rate = self.classifiers.pulse_rate_alerts(&stats);
        let snapshots = latest_snapshot(&readings, now, window);

        Ok(correlate(&spo2, &pulse_rate, &snapshots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::enrichment::FallbackSite;
    use crate::application::record_store::ClinicalRecordStore;
    use crate::domain::alert::{AlertType, PulseRateBreach};
    use crate::domain::reference::{Condition, LocationRef, PatientDisplay};
    use crate::domain::thresholds::AlertThresholds;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    struct FakeReadings {
        readings: Vec<TelemetryReading>,
    }

    #[async_trait]
    impl ReadingRepository for FakeReadings {
        async fn readings_in_window(&self, _minutes: i64) -> anyhow::Result<Vec<TelemetryReading>> {
            Ok(self.readings.clone())
        }

        async fn latest_per_device(&self) -> anyhow::Result<Vec<TelemetryReading>> {
            let mut latest: HashMap<String, TelemetryReading> = HashMap::new();
            for r in &self.readings {
                match latest.get(&r.device_id) {
                    Some(cur) if cur.observed_at >= r.observed_at => {}
                    _ => {
                        latest.insert(r.device_id.clone(), r.clone());
                    }
                }
            }
            Ok(latest.into_values().collect())
        }
    }

    #[derive(Default)]
    struct FakeRecords {
        associations: HashMap<String, String>,
        names: HashMap<String, String>,
        conditions: HashMap<String, Vec<Condition>>,
        locations: HashMap<String, LocationRef>,
    }

    #[async_trait]
    impl ClinicalRecordStore for FakeRecords {
        async fn resolve_device_association(
            &self,
            device_id: &str,
        ) -> anyhow::Result<Option<String>> {
            Ok(self.associations.get(device_id).cloned())
        }

        async fn patient_display(&self, patient_id: &str) -> anyhow::Result<Option<PatientDisplay>> {
            Ok(self.names.get(patient_id).map(|n| PatientDisplay {
                patient_id: patient_id.to_string(),
                name: n.clone(),
            }))
        }

        async fn qualifying_conditions(&self, patient_id: &str) -> anyhow::Result<Vec<Condition>> {
            Ok(self.conditions.get(patient_id).cloned().unwrap_or_default())
        }

        async fn latest_location(&self, patient_id: &str) -> anyhow::Result<Option<LocationRef>> {
            Ok(self.locations.get(patient_id).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        appended: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AlertHistorySink for RecordingSink {
        async fn append(&self, alert: &ClinicalAlert) -> anyhow::Result<()> {
            self.appended.lock().unwrap().push(alert.alert_id.clone());
            Ok(())
        }
    }

    fn reading(device_id: &str, seconds_ago: i64, spo2: Option<f64>, pr: Option<i32>) -> TelemetryReading {
        TelemetryReading {
            device_id: device_id.to_string(),
            observed_at: Utc::now() - Duration::seconds(seconds_ago),
            spo2,
            pulse_rate: pr,
            perfusion_index: Some(2.8),
            pleth_variability_index: Some(14),
            total_hemoglobin: Some(12.1),
            signal_quality: Some(96),
        }
    }

    fn service(readings: Vec<TelemetryReading>, records: FakeRecords) -> AlertingService {
        AlertingService::new(
            Arc::new(FakeReadings { readings }),
            MetricClassifiers::new(AlertThresholds::default()),
            Arc::new(ContextEnricher::new(
                Arc::new(records),
                FallbackSite::default(),
                StdDuration::from_millis(200),
                4,
            )),
            Arc::new(RecordingSink::default()),
            StatusThresholds::default(),
        )
    }

    #[tokio::test]
    async fn test_critical_spo2_with_copd_stays_at_ceiling() {
        // Device D1: two low readings in the window, linked to a COPD patient.
        let mut records = FakeRecords::default();
        records.associations.insert("D1".to_string(), "p1".to_string());
        records.names.insert("p1".to_string(), "Ada Example".to_string());
        records.conditions.insert(
            "p1".to_string(),
            vec![Condition {
                code: "13645005".to_string(),
                display: "Chronic obstructive lung disease".to_string(),
            }],
        );

        let svc = service(
            vec![
                reading("D1", 60, Some(83.0), Some(92)),
                reading("D1", 30, Some(84.0), Some(95)),
            ],
            records,
        );

        let spo2 = svc.spo2_alerts(5).await.unwrap();
        assert_eq!(spo2.len(), 1);
        assert_eq!(spo2[0].device_id, "D1");
        assert_eq!(spo2[0].tier, AlertTier::Critical);
        assert_eq!(spo2[0].value, 83.0);

        let clinical = svc.clinical_alerts(5).await.unwrap();
        assert_eq!(clinical.len(), 1);
        assert_eq!(clinical[0].tier, AlertTier::Critical);
        assert!(!clinical[0].escalated);
        assert!(clinical[0]
            .qualifying_conditions
            .contains(&"Chronic obstructive lung disease".to_string()));
    }

    #[tokio::test]
    async fn test_pr_only_breach_is_pr_abnormal() {
        // Device D2: tachycardia only, SpO2 healthy.
        let svc = service(
            vec![
                reading("D2", 45, Some(97.0), Some(125)),
                reading("D2", 20, Some(97.5), Some(112)),
            ],
            FakeRecords::default(),
        );

        let pr = svc.pulse_rate_alerts(5).await.unwrap();
        assert_eq!(pr.len(), 1);
        assert_eq!(pr[0].pr_breach, Some(PulseRateBreach::High));
        assert_eq!(pr[0].value, 125.0);

        let clinical = svc.clinical_alerts(5).await.unwrap();
        assert_eq!(clinical.len(), 1);
        assert_eq!(clinical[0].alert_type, AlertType::PrAbnormal);
        // 125 sits between the 110 and 130 boundaries.
        assert_eq!(clinical[0].tier, AlertTier::Warning);
    }

    #[tokio::test]
    async fn test_pr_urgent_above_130() {
        let svc = service(
            vec![reading("D2", 20, Some(97.5), Some(136))],
            FakeRecords::default(),
        );
        let clinical = svc.clinical_alerts(5).await.unwrap();

        assert_eq!(clinical.len(), 1);
        assert_eq!(clinical[0].alert_type, AlertType::PrAbnormal);
        assert_eq!(clinical[0].tier, AlertTier::Urgent);
    }

    #[tokio::test]
    async fn test_warning_with_qualifying_condition_escalates() {
        // Device D3: borderline SpO2 (WARNING) with an asthmatic patient.
        let mut records = FakeRecords::default();
        records.associations.insert("D3".to_string(), "p3".to_string());
        records.names.insert("p3".to_string(), "Sam Sample".to_string());
        records.conditions.insert(
            "p3".to_string(),
            vec![Condition {
                code: "195967001".to_string(),
                display: "Asthma".to_string(),
            }],
        );

        let svc = service(vec![reading("D3", 30, Some(92.5), Some(88))], records);
        let clinical = svc.clinical_alerts(5).await.unwrap();

        assert_eq!(clinical.len(), 1);
        assert_eq!(clinical[0].tier, AlertTier::Urgent);
        assert!(clinical[0].escalated);
        assert!(clinical[0].message.contains("(ESCALATED)"));
    }

    #[tokio::test]
    async fn test_no_breach_no_clinical_alert() {
        let svc = service(
            vec![
                reading("D1", 30, Some(98.0), Some(72)),
                reading("D2", 40, Some(95.2), Some(64)),
            ],
            FakeRecords::default(),
        );

        assert!(svc.spo2_alerts(5).await.unwrap().is_empty());
        assert!(svc.pulse_rate_alerts(5).await.unwrap().is_empty());
        assert!(svc.clinical_alerts(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multi_metric_when_both_breach() {
        let svc = service(
            vec![reading("D1", 30, Some(88.0), Some(140))],
            FakeRecords::default(),
        );
        let clinical = svc.clinical_alerts(5).await.unwrap();

        assert_eq!(clinical.len(), 1);
        assert_eq!(clinical[0].alert_type, AlertType::MultiMetric);
        // max(URGENT from SpO2 88, URGENT from PR 140) = URGENT.
        assert_eq!(clinical[0].tier, AlertTier::Urgent);
    }

    #[tokio::test]
    async fn test_idempotent_for_unchanged_window() {
        let mut records = FakeRecords::default();
        records.associations.insert("D1".to_string(), "p1".to_string());
        records.names.insert("p1".to_string(), "Ada Example".to_string());

        let readings = vec![
            reading("D1", 30, Some(86.0), Some(120)),
            reading("D2", 40, Some(91.0), Some(70)),
        ];
        let svc = service(readings, records);

        let first = svc.clinical_alerts(5).await.unwrap();
        let second = svc.clinical_alerts(5).await.unwrap();

        // Identical alert sets, ignoring the per-evaluation id and timestamp.
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.device_id, b.device_id);
            assert_eq!(a.tier, b.tier);
            assert_eq!(a.alert_type, b.alert_type);
            assert_eq!(a.escalated, b.escalated);
            assert_eq!(a.qualifying_conditions, b.qualifying_conditions);
            assert_eq!(a.message, b.message);
            assert_ne!(a.alert_id, b.alert_id);
        }
    }

    #[tokio::test]
    async fn test_map_pins_always_have_coordinates() {
        let mut records = FakeRecords::default();
        records.associations.insert("D1".to_string(), "p1".to_string());
        records.locations.insert(
            "p1".to_string(),
            LocationRef {
                name: "Scottish Rite Hospital".to_string(),
                city: "Atlanta".to_string(),
                state: "GA".to_string(),
                lat: 33.909,
                lon: -84.354,
            },
        );

        let svc = service(
            vec![
                reading("D1", 30, Some(89.0), Some(80)),
                reading("D2", 25, Some(84.0), Some(75)),
            ],
            records,
        );
        let pins = svc.alert_location_map(5).await.unwrap();

        assert_eq!(pins.len(), 2);
        // D2 is unlinked: fallback pin, still plottable.
        let d2 = pins.iter().find(|p| p.device_id == "D2").unwrap();
        assert!(d2.fallback);
        assert_eq!(d2.patient, "(not linked)");
        assert_eq!(d2.location_name, "Unknown (Atlanta Default Site)");
        let d1 = pins.iter().find(|p| p.device_id == "D1").unwrap();
        assert!(!d1.fallback);
        assert_eq!(d1.location_name, "Scottish Rite Hospital");
    }

    #[tokio::test]
    async fn test_alerts_are_handed_to_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let svc = AlertingService::new(
            Arc::new(FakeReadings {
                readings: vec![reading("D1", 30, Some(86.0), Some(90))],
            }),
            MetricClassifiers::new(AlertThresholds::default()),
            Arc::new(ContextEnricher::new(
                Arc::new(FakeRecords::default()),
                FallbackSite::default(),
                StdDuration::from_millis(200),
                4,
            )),
            sink.clone(),
            StatusThresholds::default(),
        );

        let alerts = svc.clinical_alerts(5).await.unwrap();
        assert_eq!(alerts.len(), 1);

        // Writes are fire-and-forget; give the spawned task a beat.
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let appended = sink.appended.lock().unwrap();
        assert_eq!(appended.as_slice(), &[alerts[0].alert_id.clone()]);
    }

    #[tokio::test]
    async fn test_device_status_classification() {
        let svc = service(
            vec![
                reading("D1", 5, Some(98.0), Some(70)),
                reading("D2", 60, Some(98.0), Some(70)),
                reading("D3", 500, Some(98.0), Some(70)),
            ],
            FakeRecords::default(),
        );
        let statuses = svc.device_status().await.unwrap();

        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].state, ConnectivityState::Online);
        assert_eq!(statuses[1].state, ConnectivityState::Stale);
        assert_eq!(statuses[2].state, ConnectivityState::Offline);
    }

    #[tokio::test]
    async fn test_vitals_trend_excludes_silent_devices() {
        let svc = service(
            vec![
                reading("D1", 30, Some(97.0), Some(70)),
                reading("D2", 900, Some(97.0), Some(70)),
            ],
            FakeRecords::default(),
        );
        let trend = svc.vitals_trend(5).await.unwrap();

        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].device_id, "D1");
    }
}
