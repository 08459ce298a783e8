//! Middleware for the measurement service.

pub mod auth;
pub mod http_metrics;

pub use auth::{require_user_auth, AuthState};
pub use http_metrics::http_metrics_middleware;
