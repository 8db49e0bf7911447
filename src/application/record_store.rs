// Repository trait for the clinical record store (read-only reference data)
use crate::domain::reference::{Condition, LocationRef, PatientDisplay};
use async_trait::async_trait;

/// Keyed lookups against the clinical record store. This engine never
/// writes reference data; every lookup failure is non-fatal per alert.
#[async_trait]
pub trait ClinicalRecordStore: Send + Sync {
    /// Device assignment: which patient (if any) wears this device.
    async fn resolve_device_association(&self, device_id: &str) -> anyhow::Result<Option<String>>;

    /// Patient display name and demographics.
    async fn patient_display(&self, patient_id: &str) -> anyhow::Result<Option<PatientDisplay>>;

    /// Diagnosed conditions for a patient. The enricher filters these down
    /// to the qualifying SNOMED code list.
    async fn qualifying_conditions(&self, patient_id: &str) -> anyhow::Result<Vec<Condition>>;

    /// Care location of the patient's most recent encounter.
    async fn latest_location(&self, patient_id: &str) -> anyhow::Result<Option<LocationRef>>;
}
