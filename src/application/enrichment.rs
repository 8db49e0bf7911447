// Context enrichment - patient identity, risk conditions, care location
use crate::application::correlator::CorrelatedAlert;
use crate::application::record_store::ClinicalRecordStore;
use crate::domain::alert::{compose_message, AlertLocation, ClinicalAlert};
use crate::domain::reference::{qualifying_display, LocationRef, PatientDisplay};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The single configured site every unresolvable alert falls back to, so
/// every alert stays plottable on the map.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackSite {
    pub name: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for FallbackSite {
    fn default() -> Self {
        Self {
            name: "Atlanta Default Site".to_string(),
            city: "Atlanta".to_string(),
            state: "GA".to_string(),
            lat: 33.749,
            lon: -84.388,
        }
    }
}

/// Resolves patient context and location for correlated alerts and applies
/// condition-driven severity escalation. Every lookup is bounded by a
/// timeout and degrades per alert; one failed lookup never blocks the rest
/// of the cycle.
pub struct ContextEnricher {
    records: Arc<dyn ClinicalRecordStore>,
    fallback_site: FallbackSite,
    lookup_timeout: Duration,
    max_concurrency: usize,
}

impl ContextEnricher {
    pub fn new(
        records: Arc<dyn ClinicalRecordStore>,
        fallback_site: FallbackSite,
        lookup_timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            records,
            fallback_site,
            lookup_timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Enrich all correlated alerts for the cycle. Per-device lookups run
    /// concurrently under a bounded pool; output is re-sorted afterwards
    /// (most severe first, then device id) so the alert set is
    /// deterministic for a given window and reference state.
    pub async fn enrich_all(&self, correlated: Vec<CorrelatedAlert>) -> Vec<ClinicalAlert> {
        let mut alerts: Vec<ClinicalAlert> = stream::iter(correlated)
            .map(|alert| self.enrich_one(alert))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        alerts.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        alerts
    }

    async fn enrich_one(&self, correlated: CorrelatedAlert) -> ClinicalAlert {
        let device_id = correlated.device_id.clone();

        let patient_id = self
            .bounded(
                self.records.resolve_device_association(&device_id),
                "device association",
                &device_id,
            )
            .await
            .flatten();

        let (display, conditions) = match &patient_id {
            Some(pid) => {
                let display: Option<PatientDisplay> = self
                    .bounded(self.records.patient_display(pid), "patient display", &device_id)
                    .await
                    .flatten();
                let conditions = self
                    .bounded(
                        self.records.qualifying_conditions(pid),
                        "conditions",
                        &device_id,
                    )
                    .await
                    .unwrap_or_default();
                (display, conditions)
            }
            None => (None, Vec::new()),
        };

        if let Some(d) = &display {
            tracing::debug!(
                "device {} linked to patient {} (last reading {})",
                device_id,
                d.patient_id,
                correlated.observed_at
            );
        }

        // Only conditions on the qualifying code list count; dedup and sort
        // the display names so the alert is reproducible. The store's own
        // display is preferred, the canonical name fills gaps.
        let mut qualifying: Vec<String> = conditions
            .iter()
            .filter_map(|c| {
                let canonical = qualifying_display(&c.code)?;
                Some(if c.display.is_empty() {
                    canonical.to_string()
                } else {
                    c.display.clone()
                })
            })
            .collect();
        qualifying.sort();
        qualifying.dedup();

        let base_tier = correlated.tier;
        let tier = if qualifying.is_empty() {
            base_tier
        } else {
            base_tier.escalated()
        };
        let escalated = tier != base_tier;

        let location = self.resolve_location(patient_id.as_deref(), &device_id).await;

        let message = compose_message(
            tier,
            escalated,
            display.as_ref().map(|d| d.name.as_str()),
            &device_id,
            correlated.spo2,
            correlated.pulse_rate,
            &qualifying,
        );

        ClinicalAlert {
            alert_id: uuid::Uuid::new_v4().to_string(),
            device_id,
            patient_id,
            patient_name: display.map(|d| d.name),
            tier,
            alert_type: correlated.alert_type,
            spo2: correlated.spo2,
            pulse_rate: correlated.pulse_rate,
            qualifying_conditions: qualifying,
            escalated,
            location,
            message,
            alert_time: Utc::now(),
        }
    }

    /// Latest-encounter location for the patient, or the configured
    /// fallback site. The fallback name is prefixed "Unknown (" so the
    /// dashboard can flag it; no alert is ever dropped for lack of a
    /// location.
    async fn resolve_location(&self, patient_id: Option<&str>, device_id: &str) -> AlertLocation {
        let resolved: Option<LocationRef> = match patient_id {
            Some(pid) => self
                .bounded(self.records.latest_location(pid), "location", device_id)
                .await
                .flatten(),
            None => None,
        };

        match resolved {
            Some(loc) => AlertLocation {
                name: loc.name,
                city: loc.city,
                state: loc.state,
                lat: loc.lat,
                lon: loc.lon,
                fallback: false,
            },
            None => {
                let site = &self.fallback_site;
                AlertLocation {
                    name: format!("Unknown ({})", site.name),
                    city: site.city.clone(),
                    state: site.state.clone(),
                    lat: site.lat,
                    lon: site.lon,
                    fallback: true,
                }
            }
        }
    }

    /// Run a reference lookup under the configured timeout. Failures and
    /// timeouts degrade to None; the alert is still emitted without that
    /// piece of context.
    async fn bounded<T>(
        &self,
        lookup: impl Future<Output = anyhow::Result<T>>,
        what: &str,
        device_id: &str,
    ) -> Option<T> {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!("{} lookup failed for {}: {:#}", what, device_id, e);
                None
            }
            Err(_) => {
                tracing::warn!("{} lookup timed out for {}", what, device_id);
                None
            }
        }
    }
}
