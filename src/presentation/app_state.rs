// Application state for HTTP handlers
use crate::application::alerting_service::AlertingService;

pub struct AppState {
    pub alerting_service: AlertingService,
    pub default_window_minutes: i64,
}
