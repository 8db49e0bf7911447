// Repository trait for the raw telemetry ingestion buffer
use crate::domain::reading::TelemetryReading;
use async_trait::async_trait;

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// All readings observed within the trailing window of `minutes`.
    /// The precise (T-W, T] boundary is re-applied during aggregation, so
    /// implementations may over-fetch slightly.
    async fn readings_in_window(&self, minutes: i64) -> anyhow::Result<Vec<TelemetryReading>>;

    /// Most recent reading per device, regardless of window.
    async fn latest_per_device(&self) -> anyhow::Result<Vec<TelemetryReading>>;
}
