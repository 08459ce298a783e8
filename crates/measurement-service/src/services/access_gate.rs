//! Delegated access checks against the family service.
//!
//! Asks `GET {family}/v1/access/{user}/baby/{target}` whether a caller may
//! act on a target, authenticating with the service credential.
//!
//! # Security
//!
//! - A credential or transport failure is an error, never a denial
//! - The service credential is only exposed when building the header
//! - Upstream bodies are truncated before logging

use crate::auth::Identity;
use crate::observability::metrics;
use async_trait::async_trait;
use common::credential_issuer::{truncate_body, CredentialError};
use common::secret::ExposeSecret;
use common::service_credential::ServiceCredentialCache;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Connect timeout for the family service.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a completed access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied,
}

impl AccessDecision {
    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Allowed => "allowed",
            AccessDecision::Denied => "denied",
        }
    }
}

/// Failure to reach a decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessCheckError {
    /// The service credential could not be obtained.
    #[error("Service credential unavailable: {0}")]
    Credential(#[from] CredentialError),

    /// Transport failure, timeout, or unexpected status.
    #[error("Family service call failed: {0}")]
    Upstream(String),

    /// 200 response without a boolean `has_access`.
    #[error("Invalid family service response: {0}")]
    MalformedResponse(String),

    /// Client could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Decides whether a caller may act on a target.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn check_access(
        &self,
        identity: &Identity,
        target_id: &str,
    ) -> Result<AccessDecision, AccessCheckError>;
}

#[derive(Deserialize)]
struct AccessResponse {
    has_access: bool,
}

/// HTTP client for the family service access endpoint.
pub struct FamilyAccessClient {
    http_client: reqwest::Client,
    base_url: Url,
    credentials: Arc<ServiceCredentialCache>,
}

impl std::fmt::Debug for FamilyAccessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyAccessClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl FamilyAccessClient {
    /// Build a client for the family service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AccessCheckError::Configuration` if the URL is not an http(s)
    /// base URL or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        credentials: Arc<ServiceCredentialCache>,
        timeout: Duration,
    ) -> Result<Self, AccessCheckError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AccessCheckError::Configuration(format!("Invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AccessCheckError::Configuration(
                "Base URL cannot carry a path".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                AccessCheckError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
        })
    }

    /// `{base}/v1/access/{user}/baby/{target}` with each id percent-encoded
    /// as a single segment.
    fn access_url(&self, user: &str, target: &str) -> Result<Url, AccessCheckError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AccessCheckError::Configuration("Base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["v1", "access", user, "baby", target]);
        Ok(url)
    }

    async fn request_decision(
        &self,
        identity: &Identity,
        target_id: &str,
    ) -> Result<AccessDecision, AccessCheckError> {
        let credential = self.credentials.get_credential().await.map_err(|e| {
            warn!(target: "ms.services.access_gate", error = %e, "Service credential unavailable");
            AccessCheckError::Credential(e)
        })?;

        let url = self.access_url(identity.as_str(), target_id)?;
        debug!(target: "ms.services.access_gate", target_id = %target_id, "Checking access");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(credential.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!(target: "ms.services.access_gate", error = %e, "Access request failed");
                AccessCheckError::Upstream(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(
                target: "ms.services.access_gate",
                target_id = %target_id,
                "Family service does not know the pair, denying"
            );
            return Ok(AccessDecision::Denied);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate_body(&body);
            warn!(
                target: "ms.services.access_gate",
                status = %status,
                body = %body,
                "Access check returned error status"
            );
            return Err(AccessCheckError::Upstream(format!(
                "status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: AccessResponse = response.json().await.map_err(|e| {
            warn!(target: "ms.services.access_gate", error = %e, "Invalid access response");
            AccessCheckError::MalformedResponse(e.to_string())
        })?;

        Ok(if parsed.has_access {
            AccessDecision::Allowed
        } else {
            AccessDecision::Denied
        })
    }
}

#[async_trait]
impl AccessGate for FamilyAccessClient {
    #[instrument(skip_all, name = "ms.services.access_gate.check")]
    async fn check_access(
        &self,
        identity: &Identity,
        target_id: &str,
    ) -> Result<AccessDecision, AccessCheckError> {
        let start = Instant::now();
        let result = self.request_decision(identity, target_id).await;

        let label = match &result {
            Ok(decision) => decision.as_str(),
            Err(_) => "error",
        };
        metrics::record_access_check(label, start.elapsed());

        result
    }
}

/// Test doubles for the access gate.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock access gate for unit testing.
    pub struct MockAccessGate {
        outcome: Result<AccessDecision, AccessCheckError>,
        call_count: AtomicUsize,
    }

    impl MockAccessGate {
        /// Create a mock that always allows.
        pub fn allowing() -> Self {
            Self::with_outcome(Ok(AccessDecision::Allowed))
        }

        /// Create a mock that always denies.
        pub fn denying() -> Self {
            Self::with_outcome(Ok(AccessDecision::Denied))
        }

        /// Create a mock that cannot reach a decision.
        pub fn failing() -> Self {
            Self::with_outcome(Err(AccessCheckError::Upstream(
                "Mock family service error".to_string(),
            )))
        }

        /// Create a mock with a fixed outcome.
        pub fn with_outcome(outcome: Result<AccessDecision, AccessCheckError>) -> Self {
            Self {
                outcome,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccessGate for MockAccessGate {
        async fn check_access(
            &self,
            _identity: &Identity,
            _target_id: &str,
        ) -> Result<AccessDecision, AccessCheckError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }
}
