// Application layer - Repository traits and the evaluation pipeline
pub mod alert_sink;
pub mod alerting_service;
pub mod classifiers;
pub mod correlator;
pub mod enrichment;
pub mod reading_repository;
pub mod record_store;
pub mod window_aggregator;
