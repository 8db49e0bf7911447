// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::alert_sink::AlertHistorySink;
use crate::application::alerting_service::{AlertingService, StatusThresholds};
use crate::application::classifiers::MetricClassifiers;
use crate::application::enrichment::ContextEnricher;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::fhir_record_store::FhirRecordStore;
use crate::infrastructure::http_alert_sink::{HttpAlertSink, NullAlertSink};
use crate::infrastructure::influx_reading_repository::InfluxReadingRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    alert_location_map, clinical_alerts, device_status, health_check, latest_readings,
    pulse_rate_alerts, spo2_alerts, vitals_trend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;

    // Infrastructure adapters
    let readings = Arc::new(InfluxReadingRepository::new(
        settings.influx.host,
        settings.influx.token,
        settings.influx.database,
        settings.influx.retention_policy,
        settings.influx.measurement,
    ));
    let records = Arc::new(FhirRecordStore::new(
        settings.records.base_url,
        settings.records.token,
        Duration::from_millis(settings.records.timeout_ms),
    )?);
    let sink: Arc<dyn AlertHistorySink> = match settings.sink.url {
        Some(url) => Arc::new(HttpAlertSink::new(
            url,
            Duration::from_millis(settings.sink.timeout_ms),
        )?),
        None => Arc::new(NullAlertSink),
    };

    // Application services
    let enricher = Arc::new(ContextEnricher::new(
        records,
        settings.fallback_site,
        Duration::from_millis(settings.alerting.lookup_timeout_ms),
        settings.alerting.max_concurrency,
    ));
    let alerting_service = AlertingService::new(
        readings,
        MetricClassifiers::new(settings.thresholds),
        enricher,
        sink,
        StatusThresholds {
            online_secs: settings.alerting.online_secs,
            stale_secs: settings.alerting.stale_secs,
        },
    );

    let state = Arc::new(AppState {
        alerting_service,
        default_window_minutes: settings.alerting.default_window_minutes,
    });

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/vitals/trend", get(vitals_trend))
        .route("/devices/status", get(device_status))
        .route("/readings/latest", get(latest_readings))
        .route("/alerts/spo2", get(spo2_alerts))
        .route("/alerts/pulse-rate", get(pulse_rate_alerts))
        .route("/alerts/clinical", get(clinical_alerts))
        .route("/alerts/map", get(alert_location_map))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = settings.server.bind.parse()?;
    tracing::info!("Starting vitals-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
