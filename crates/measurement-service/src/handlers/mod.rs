//! HTTP request handlers for the measurement service.

pub mod health;
pub mod measurements;
pub mod metrics;

pub use health::health_check;
pub use measurements::{get_measurement, list_measurements, put_measurement};
pub use metrics::metrics_handler;
