//! Metrics definitions for the measurement service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ms_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: success, error, missing
//! - `decision`: allowed, denied, error
//! - `operation`: bounded by repository methods
//! - `endpoint`: normalized, uuids replaced with placeholders

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Access checks are one HTTP round trip to the family service
        .set_buckets_for_metric(
            Matcher::Prefix("ms_access_check".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set access check buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ms_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ms_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record an HTTP request.
///
/// Metric: `ms_http_request_duration_seconds`, `ms_http_requests_total`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ms_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ms_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Replace path parameters with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/status/health" | "/metrics" | "/api/v1/measurements" => path.to_string(),
        _ => match path.strip_prefix("/api/v1/measurement/") {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => {
                "/api/v1/measurement/{uuid}".to_string()
            }
            _ => "/other".to_string(),
        },
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record caller token validation outcome.
///
/// Metric: `ms_token_validations_total`
/// Labels: `status` ("success", "error", "missing")
pub fn record_token_validation(status: &str) {
    counter!("ms_token_validations_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record an access check against the family service.
///
/// Metric: `ms_access_checks_total`, `ms_access_check_duration_seconds`
/// Labels: `decision` ("allowed", "denied", "error")
pub fn record_access_check(decision: &str, duration: Duration) {
    histogram!("ms_access_check_duration_seconds",
        "decision" => decision.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ms_access_checks_total",
        "decision" => decision.to_string()
    )
    .increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution.
///
/// Metric: `ms_db_query_duration_seconds`, `ms_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("ms_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ms_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
