// HTTP request handlers
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Deserialize)]
pub struct WindowQuery {
    pub minutes: Option<i64>,
}

impl WindowQuery {
    /// Clamp to something sane: at least one minute, at most a day.
    fn minutes_or(&self, default: i64) -> i64 {
        self.minutes.unwrap_or(default).clamp(1, 24 * 60)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("upstream query failed: {0}")]
    Upstream(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("{:#}", self);
        (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Per-device rolling vitals statistics
pub async fn vitals_trend(
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let minutes = query.minutes_or(state.default_window_minutes);
    let stats = state.alerting_service.vitals_trend(minutes).await?;
    Ok(Json(stats))
}

/// Connectivity classification per device
pub async fn device_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let statuses = state.alerting_service.device_status().await?;
    Ok(Json(statuses))
}

/// Most recent reading per device
pub async fn latest_readings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let readings = state.alerting_service.latest_readings().await?;
    Ok(Json(readings))
}

/// Tiered SpO2 alerts for the window
pub async fn spo2_alerts(
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let minutes = query.minutes_or(state.default_window_minutes);
    let alerts = state.alerting_service.spo2_alerts(minutes).await?;
    Ok(Json(alerts))
}

/// Tiered pulse-rate alerts for the window
pub async fn pulse_rate_alerts(
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let minutes = query.minutes_or(state.default_window_minutes);
    let alerts = state.alerting_service.pulse_rate_alerts(minutes).await?;
    Ok(Json(alerts))
}

/// Correlated, enriched clinical alerts for the window
pub async fn clinical_alerts(
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let minutes = query.minutes_or(state.default_window_minutes);
    let alerts = state.alerting_service.clinical_alerts(minutes).await?;
    Ok(Json(alerts))
}

/// Clinical alerts projected for the spatial display
pub async fn alert_location_map(
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let minutes = query.minutes_or(state.default_window_minutes);
    let pins = state.alerting_service.alert_location_map(minutes).await?;
    Ok(Json(pins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_query_clamps() {
        assert_eq!(WindowQuery { minutes: None }.minutes_or(5), 5);
        assert_eq!(WindowQuery { minutes: Some(15) }.minutes_or(5), 15);
        assert_eq!(WindowQuery { minutes: Some(0) }.minutes_or(5), 1);
        assert_eq!(WindowQuery { minutes: Some(100_000) }.minutes_or(5), 1440);
    }
}
