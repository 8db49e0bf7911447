// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod fhir_record_store;
pub mod http_alert_sink;
pub mod influx_reading_repository;
