// HTTP alert history sink adapter
use crate::application::alert_sink::AlertHistorySink;
use crate::domain::alert::ClinicalAlert;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// POSTs each emitted alert to the history store as JSON. The engine calls
/// this fire-and-forget; retries and retention belong to the store.
#[derive(Debug, Clone)]
pub struct HttpAlertSink {
    url: String,
    client: reqwest::Client,
}

impl HttpAlertSink {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build alert sink HTTP client")?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl AlertHistorySink for HttpAlertSink {
    async fn append(&self, alert: &ClinicalAlert) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .context("Failed to send alert to history sink")?;

        if !response.status().is_success() {
            anyhow::bail!("history sink returned status {}", response.status());
        }
        Ok(())
    }
}

/// Sink used when no history store is configured; alerts are only logged.
#[derive(Debug, Clone, Default)]
pub struct NullAlertSink;

#[async_trait]
impl AlertHistorySink for NullAlertSink {
    async fn append(&self, alert: &ClinicalAlert) -> Result<()> {
        tracing::debug!("alert {} not persisted (no sink configured)", alert.alert_id);
        Ok(())
    }
}
