//! Measurement handlers.
//!
//! All routes here sit behind `require_user_auth`; the caller `Identity` is
//! always present in extensions. Extractor rejections are mapped to
//! `MsError::BadRequest` so they share the JSON error body.

use crate::auth::Identity;
use crate::errors::MsError;
use crate::models::{ListQuery, MeasurementRequest, MeasurementResponse};
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

fn measurement_uuid(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, MsError> {
    path.map(|Path(uuid)| uuid).map_err(|e| {
        tracing::debug!(target: "ms.handlers.measurements", error = %e, "Rejected path");
        MsError::BadRequest("Invalid measurement uuid".to_string())
    })
}

/// Handler for GET /api/v1/measurement/:uuid
#[instrument(skip_all, name = "ms.handlers.get_measurement")]
pub async fn get_measurement(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MeasurementResponse>, MsError> {
    let uuid = measurement_uuid(path)?;
    let measurement = state.measurements.get(&identity, uuid).await?;
    Ok(Json(measurement.into()))
}

/// Handler for PUT /api/v1/measurement/:uuid
///
/// Creates the measurement or replaces the one stored under `uuid`.
///
/// ```json
/// { "type": "HEIGHT", "ts": "2019-03-25T20:53:00Z", "value": 61.5,
///   "target_uuid": "..." }
/// ```
#[instrument(skip_all, name = "ms.handlers.put_measurement")]
pub async fn put_measurement(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<MeasurementRequest>, JsonRejection>,
) -> Result<Json<MeasurementResponse>, MsError> {
    let uuid = measurement_uuid(path)?;
    let Json(request) = body.map_err(|e| {
        tracing::debug!(target: "ms.handlers.measurements", error = %e, "Rejected body");
        MsError::BadRequest("Invalid request body".to_string())
    })?;
    let measurement = state.measurements.save(&identity, uuid, request).await?;
    tracing::debug!(target: "ms.handlers.measurements", uuid = %uuid, "Measurement saved");
    Ok(Json(measurement.into()))
}

/// Handler for GET /api/v1/measurements?target-uuid=<uuid>
#[instrument(skip_all, name = "ms.handlers.list_measurements")]
pub async fn list_measurements(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<MeasurementResponse>>, MsError> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!(target: "ms.handlers.measurements", error = %e, "Rejected query");
        MsError::BadRequest("Missing or invalid target-uuid".to_string())
    })?;
    let measurements = state
        .measurements
        .list_by_target(&identity, query.target_uuid)
        .await?;
    Ok(Json(measurements.into_iter().map(Into::into).collect()))
}
