//! Measurement business operations.
//!
//! Every operation is scoped to a target and runs behind
//! [`Authorizer::ensure_access`]. The target comes from the stored resource
//! (reads) or from both the request and any existing record (writes).

use crate::auth::Identity;
use crate::errors::MsError;
use crate::models::{Measurement, MeasurementRequest, MeasurementType};
use crate::repositories::MeasurementRepository;
use crate::services::authorization::Authorizer;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Measurement operations with access enforcement.
#[derive(Clone)]
pub struct MeasurementService {
    repository: Arc<dyn MeasurementRepository>,
    authorizer: Authorizer,
}

impl MeasurementService {
    pub fn new(repository: Arc<dyn MeasurementRepository>, authorizer: Authorizer) -> Self {
        Self {
            repository,
            authorizer,
        }
    }

    /// Load one measurement.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown uuid; otherwise the access check's error.
    #[instrument(skip_all, name = "ms.services.measurements.get", fields(uuid = %uuid))]
    pub async fn get(&self, identity: &Identity, uuid: Uuid) -> Result<Measurement, MsError> {
        let measurement = self
            .repository
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(|| MsError::NotFound("Measurement not found".to_string()))?;

        self.authorizer
            .ensure_access(identity, &measurement.target_uuid.to_string())
            .await?;

        Ok(measurement)
    }

    /// Create or replace the measurement stored under `uuid`.
    ///
    /// Moving an existing measurement to another target needs access to
    /// both targets.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an unknown type; otherwise the access check's or the
    /// repository's error.
    #[instrument(skip_all, name = "ms.services.measurements.save", fields(uuid = %uuid))]
    pub async fn save(
        &self,
        identity: &Identity,
        uuid: Uuid,
        request: MeasurementRequest,
    ) -> Result<Measurement, MsError> {
        let measurement_type: MeasurementType = request
            .measurement_type
            .parse()
            .map_err(MsError::BadRequest)?;

        self.authorizer
            .ensure_access(identity, &request.target_uuid.to_string())
            .await?;

        if let Some(existing) = self.repository.find_by_uuid(uuid).await? {
            if existing.target_uuid != request.target_uuid {
                debug!(
                    target: "ms.services.measurements",
                    "Measurement changes target, checking existing target"
                );
                self.authorizer
                    .ensure_access(identity, &existing.target_uuid.to_string())
                    .await?;
            }
        }

        let measurement = Measurement {
            measurement_type,
            ts: request.ts,
            value: request.value,
            uuid,
            target_uuid: request.target_uuid,
        };

        self.repository.upsert(&measurement).await
    }

    /// All measurements of `target_uuid`.
    ///
    /// # Errors
    ///
    /// The access check's or the repository's error.
    #[instrument(
        skip_all,
        name = "ms.services.measurements.list_by_target",
        fields(target_uuid = %target_uuid)
    )]
    pub async fn list_by_target(
        &self,
        identity: &Identity,
        target_uuid: Uuid,
    ) -> Result<Vec<Measurement>, MsError> {
        self.authorizer
            .authorize_then(
                identity,
                &target_uuid.to_string(),
                self.repository.list_by_target(target_uuid),
            )
            .await
    }
}
