//! Health check handler.

use crate::models::HealthResponse;
use crate::repositories::MeasurementRepository;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /status/health
///
/// Pings the database. Always answers 200; an unreachable database shows up
/// as `"unhealthy"` in the body.
///
/// ```json
/// { "status": "healthy", "database": "healthy" }
/// ```
#[instrument(skip_all, name = "ms.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.repository.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(target: "ms.database", error = %e, "Health check ping failed");
            "unhealthy"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: status.to_string(),
    })
}
