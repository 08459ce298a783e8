//! HTTP routes for the measurement service.
//!
//! Defines the Axum router and application state.

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_user_auth, AuthState};
use crate::repositories::MeasurementRepository;
use crate::services::MeasurementService;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Measurement storage, also pinged by the health check.
    pub repository: Arc<dyn MeasurementRepository>,

    /// Business operations with access enforcement.
    pub measurements: MeasurementService,

    /// Caller token verification.
    pub token_verifier: Arc<TokenVerifier>,
}

/// Build the application routes.
///
/// - `/status/health` - database ping (public)
/// - `/metrics` - Prometheus scrape (public)
/// - `/api/v1/measurement/:uuid` - GET/PUT a measurement (authenticated)
/// - `/api/v1/measurements?target-uuid=` - list a target's measurements (authenticated)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        verifier: state.token_verifier.clone(),
    });
    let request_timeout = state.config.request_timeout;

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/status/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route(
            "/api/v1/measurement/:uuid",
            get(handlers::get_measurement).put(handlers::put_measurement),
        )
        .route("/api/v1/measurements", get(handlers::list_measurements))
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            require_user_auth,
        ))
        .with_state(state);

    // Each layer wraps the ones added before it: metrics sees timeouts and
    // auth rejections, the trace span covers the handler.
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}
