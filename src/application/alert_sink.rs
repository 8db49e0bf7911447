// Append-only alert history sink contract
use crate::domain::alert::ClinicalAlert;
use async_trait::async_trait;

/// Append-only store the engine writes emitted alerts to. Writes are
/// fire-and-forget with at-least-once semantics; duplicate alert ids are
/// tolerated by the sink's retention policy, not deduplicated here.
#[async_trait]
pub trait AlertHistorySink: Send + Sync {
    async fn append(&self, alert: &ClinicalAlert) -> anyhow::Result<()>;
}
