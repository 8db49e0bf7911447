// Domain layer - Data types and pure classification rules
pub mod alert;
pub mod reading;
pub mod reference;
pub mod thresholds;
