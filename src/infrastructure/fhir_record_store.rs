// FHIR-backed clinical record store adapter
use crate::application::record_store::ClinicalRecordStore;
use crate::domain::reference::{Condition, LocationRef, PatientDisplay};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Read-only adapter over a FHIR REST store holding the reference data:
/// device associations (Basic resources), patients, conditions, and
/// encounter locations. All requests carry a bounded timeout; a missing
/// resource is None/empty, never an error.
#[derive(Debug, Clone)]
pub struct FhirRecordStore {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl FhirRecordStore {
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build FHIR HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// GET a FHIR path; Ok(None) for 404, error for other failures.
    async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/fhir+json")
            .send()
            .await
            .with_context(|| format!("FHIR request failed: {}", path))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("FHIR request {} returned status {}", path, status);
        }

        let body = response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse FHIR response for {}", path))?;
        Ok(Some(body))
    }

    fn bundle_resources(bundle: &Value) -> impl Iterator<Item = &Value> {
        bundle["entry"]
            .as_array()
            .map(|entries| entries.iter())
            .unwrap_or_default()
            .filter_map(|entry| entry.get("resource"))
    }
}

/// "Given Family" from the first recorded name, matching how the loader
/// writes display names.
fn patient_name(resource: &Value) -> Option<String> {
    let name = resource["name"].as_array()?.first()?;
    let given = name["given"]
        .as_array()
        .and_then(|g| g.first())
        .and_then(|g| g.as_str())
        .unwrap_or("");
    let family = name["family"].as_str().unwrap_or("");
    let full = format!("{} {}", given, family).trim().to_string();
    if full.is_empty() { None } else { Some(full) }
}

fn location_ref(resource: &Value) -> Option<LocationRef> {
    let name = resource["name"].as_str()?.to_string();
    let lat = resource["position"]["latitude"].as_f64()?;
    let lon = resource["position"]["longitude"].as_f64()?;
    Some(LocationRef {
        name,
        city: resource["address"]["city"].as_str().unwrap_or("").to_string(),
        state: resource["address"]["state"].as_str().unwrap_or("").to_string(),
        lat,
        lon,
    })
}

#[async_trait]
impl ClinicalRecordStore for FhirRecordStore {
    async fn resolve_device_association(&self, device_id: &str) -> Result<Option<String>> {
        // Device associations are stored as Basic resources keyed by the
        // device id, with subject.reference = "Patient/{id}".
        let path = format!("Basic/device-assoc-{}", urlencoding::encode(device_id));
        let Some(resource) = self.get_json(&path).await? else {
            return Ok(None);
        };

        let patient_id = resource["subject"]["reference"]
            .as_str()
            .and_then(|r| r.strip_prefix("Patient/"))
            .map(str::to_string);

        Ok(patient_id)
    }

    async fn patient_display(&self, patient_id: &str) -> Result<Option<PatientDisplay>> {
        let path = format!("Patient/{}", urlencoding::encode(patient_id));
        let Some(resource) = self.get_json(&path).await? else {
            return Ok(None);
        };

        Ok(patient_name(&resource).map(|name| PatientDisplay {
            patient_id: patient_id.to_string(),
            name,
        }))
    }

    async fn qualifying_conditions(&self, patient_id: &str) -> Result<Vec<Condition>> {
        let path = format!(
            "Condition?patient={}&_count=100",
            urlencoding::encode(patient_id)
        );
        let Some(bundle) = self.get_json(&path).await? else {
            return Ok(Vec::new());
        };

        let conditions = Self::bundle_resources(&bundle)
            .filter(|r| r["resourceType"].as_str() == Some("Condition"))
            .filter_map(|r| {
                let coding = r["code"]["coding"].as_array()?.first()?;
                Some(Condition {
                    code: coding["code"].as_str()?.to_string(),
                    display: coding["display"].as_str().unwrap_or("").to_string(),
                })
            })
            .collect();

        Ok(conditions)
    }

    async fn latest_location(&self, patient_id: &str) -> Result<Option<LocationRef>> {
        // Most recent encounter, with its location resource included in
        // the same bundle.
        let path = format!(
            "Encounter?patient={}&_sort=-date&_count=1&_include=Encounter:location",
            urlencoding::encode(patient_id)
        );
        let Some(bundle) = self.get_json(&path).await? else {
            return Ok(None);
        };

        let location = Self::bundle_resources(&bundle)
            .filter(|r| r["resourceType"].as_str() == Some("Location"))
            .find_map(location_ref);

        Ok(location)
    }
}
