// InfluxDB-backed reading repository (ingestion buffer adapter)
use crate::application::reading_repository::ReadingRepository;
use crate::domain::reading::TelemetryReading;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Reads raw device telemetry out of InfluxDB over its HTTP query API.
/// Readings are stored one point per reading in a single measurement,
/// tagged by `device_id`, with timestamps returned as RFC 3339 strings
/// that are parsed explicitly.
#[derive(Debug, Clone)]
pub struct InfluxReadingRepository {
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl InfluxReadingRepository {
    pub fn new(
        host: String,
        token: String,
        database: String,
        retention_policy: String,
        measurement: String,
    ) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
            measurement,
            client: reqwest::Client::new(),
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                anyhow::bail!("InfluxDB query error: {}", error);
            }
        }

        Ok(data)
    }

    fn collect_readings(response: &InfluxQLResponse) -> Vec<TelemetryReading> {
        let mut readings = Vec::new();
        if let Some(result) = response.results.first() {
            if let Some(series_list) = &result.series {
                for series in series_list {
                    let device_id = series
                        .tags
                        .as_ref()
                        .and_then(|t| t.get("device_id"))
                        .cloned();
                    for row in &series.values {
                        if let Some(reading) = parse_reading(&series.columns, row, device_id.as_deref())
                        {
                            readings.push(reading);
                        }
                    }
                }
            }
        }
        readings
    }
}

/// Map one result row onto a reading. Rows with an unparseable timestamp
/// or no device id are dropped; individual missing fields stay None.
fn parse_reading(
    columns: &[String],
    row: &[serde_json::Value],
    device_tag: Option<&str>,
) -> Option<TelemetryReading> {
    let col = |name: &str| columns.iter().position(|c| c == name);
    let str_at = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|v| v.as_str());
    let f64_at = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|v| v.as_f64());
    let i32_at = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
    };

    let time_str = str_at(col("time"))?;
    let observed_at = chrono::DateTime::parse_from_rfc3339(time_str)
        .ok()?
        .with_timezone(&chrono::Utc);

    let device_id = device_tag
        .map(str::to_string)
        .or_else(|| str_at(col("device_id")).map(str::to_string))?;

    Some(TelemetryReading {
        device_id,
        observed_at,
        spo2: f64_at(col("spo2")),
        pulse_rate: i32_at(col("pr")),
        perfusion_index: f64_at(col("pi")),
        pleth_variability_index: i32_at(col("pvi")),
        total_hemoglobin: f64_at(col("sphb")),
        signal_quality: i32_at(col("signal_iq")),
    })
}

#[async_trait]
impl ReadingRepository for InfluxReadingRepository {
    async fn readings_in_window(&self, minutes: i64) -> Result<Vec<TelemetryReading>> {
        let query = format!(
            "SELECT spo2, pr, pi, pvi, sphb, signal_iq FROM {} WHERE time > now() - {}m GROUP BY device_id",
            self.measurement, minutes
        );

        tracing::debug!("Executing window query: {}", query);
        let response = self.execute_query(&query).await?;
        Ok(Self::collect_readings(&response))
    }

    async fn latest_per_device(&self) -> Result<Vec<TelemetryReading>> {
        // LIMIT 1 with ORDER BY time DESC yields the newest point per
        // device_id series.
        let query = format!(
            "SELECT spo2, pr, pi, pvi, sphb, signal_iq FROM {} GROUP BY device_id ORDER BY time DESC LIMIT 1",
            self.measurement
        );

        tracing::debug!("Executing latest-per-device query: {}", query);
        let response = self.execute_query(&query).await?;
        Ok(Self::collect_readings(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<String> {
        ["time", "spo2", "pr", "pi", "pvi", "sphb", "signal_iq"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_parse_reading_full_row() {
        let row = vec![
            json!("2025-06-01T12:00:00Z"),
            json!(94.5),
            json!(72),
            json!(2.81),
            json!(14),
            json!(12.3),
            json!(97),
        ];
        let reading = parse_reading(&columns(), &row, Some("MASIMO-RADIUS7-0001")).unwrap();

        assert_eq!(reading.device_id, "MASIMO-RADIUS7-0001");
        assert_eq!(reading.spo2, Some(94.5));
        assert_eq!(reading.pulse_rate, Some(72));
        assert_eq!(reading.total_hemoglobin, Some(12.3));
        assert_eq!(reading.signal_quality, Some(97));
        assert_eq!(reading.observed_at.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_reading_nulls_stay_none() {
        let row = vec![
            json!("2025-06-01T12:00:00Z"),
            json!(null),
            json!(88),
            json!(null),
            json!(null),
            json!(null),
            json!(null),
        ];
        let reading = parse_reading(&columns(), &row, Some("D1")).unwrap();

        assert_eq!(reading.spo2, None);
        assert_eq!(reading.pulse_rate, Some(88));
    }

    #[test]
    fn test_parse_reading_bad_timestamp_dropped() {
        let row = vec![json!("not-a-time"), json!(94.5)];
        assert!(parse_reading(&columns(), &row, Some("D1")).is_none());
    }

    #[test]
    fn test_parse_reading_requires_device_id() {
        let row = vec![json!("2025-06-01T12:00:00Z"), json!(94.5)];
        assert!(parse_reading(&columns(), &row, None).is_none());
    }
}
