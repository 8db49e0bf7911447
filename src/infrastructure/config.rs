// Service configuration
use crate::application::enrichment::FallbackSite;
use crate::domain::thresholds::AlertThresholds;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub influx: InfluxSettings,
    #[serde(default)]
    pub records: RecordStoreSettings,
    #[serde(default)]
    pub sink: SinkSettings,
    #[serde(default)]
    pub alerting: AlertingSettings,
    #[serde(default)]
    pub thresholds: AlertThresholds,
    #[serde(default)]
    pub fallback_site: FallbackSite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
    pub measurement: String,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:8086".to_string(),
            token: String::new(),
            database: "telemetry".to_string(),
            retention_policy: "autogen".to_string(),
            measurement: "masimo_vitals".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordStoreSettings {
    pub base_url: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl Default for RecordStoreSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            token: String::new(),
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkSettings {
    /// Where alert history is POSTed; unset disables the sink.
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertingSettings {
    pub default_window_minutes: i64,
    pub lookup_timeout_ms: u64,
    pub max_concurrency: usize,
    pub online_secs: i64,
    pub stale_secs: i64,
}

impl Default for AlertingSettings {
    fn default() -> Self {
        Self {
            default_window_minutes: 5,
            lookup_timeout_ms: 2000,
            max_concurrency: 16,
            online_secs: 30,
            stale_secs: 120,
        }
    }
}

/// Load settings from config/service.toml when present; every section has
/// working defaults so the binary also runs without a config file.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/service").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
