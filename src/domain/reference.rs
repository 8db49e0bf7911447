// Reference data consumed from the clinical record store (read-only)
use serde::Serialize;

/// Patient display information resolved from a device association.
#[derive(Debug, Clone)]
pub struct PatientDisplay {
    pub patient_id: String,
    pub name: String,
}

/// A diagnosed condition as returned by the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub code: String,
    pub display: String,
}

/// Latest-encounter care location for a patient; may be absent.
#[derive(Debug, Clone, Serialize)]
pub struct LocationRef {
    pub name: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

/// SNOMED codes for conditions that qualify a patient for severity
/// escalation. These are the codes the record loader assigns devices by.
pub const QUALIFYING_SNOMED_CODES: &[(&str, &str)] = &[
    ("195967001", "Asthma"),
    ("44054006", "Type 2 diabetes mellitus"),
    ("59621000", "Essential hypertension"),
    ("38341003", "Hypertensive disorder"),
    ("162864005", "Body mass index 30+ - obesity"),
    ("271825005", "Respiratory distress"),
    ("840539006", "COVID-19"),
    ("233604007", "Pneumonia"),
    ("13645005", "Chronic obstructive lung disease"),
    ("84114007", "Heart failure"),
    ("22298006", "Myocardial infarction"),
    ("399211009", "History of myocardial infarction"),
    ("53741008", "Coronary arteriosclerosis"),
    ("428007007", "History of heart failure"),
];

/// Canonical display name for a qualifying SNOMED code, if it is one.
pub fn qualifying_display(code: &str) -> Option<&'static str> {
    QUALIFYING_SNOMED_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, display)| *display)
}
