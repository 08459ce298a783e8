//! Login client that issues the service's outbound credential.
//!
//! POSTs `{"username", "password"}` as JSON to the login endpoint and
//! returns the `access_token` from the response. One attempt per call; the
//! credential cache decides when to call.
//!
//! # Security
//!
//! - The password and the issued token are `SecretString` (never logged)
//! - Error bodies are truncated before they reach logs or error values
//! - HTTP timeouts bound every call

use crate::secret::{ExposeSecret, SecretString};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upstream response bodies are cut to this many characters in errors and logs.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while obtaining a service credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Transport failure, timeout, or non-success status from the login service.
    #[error("Login service call failed: {0}")]
    Upstream(String),

    /// The login service answered 2xx but the body was not understood.
    #[error("Invalid login response: {0}")]
    MalformedResponse(String),

    /// The issued token does not verify against the trusted key or is already expired.
    #[error("Issued credential failed verification")]
    InvalidCredential,

    /// Client could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

// =============================================================================
// Issuer Trait
// =============================================================================

/// Source of fresh service credentials.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Obtain a newly issued credential.
    async fn fetch_credential(&self) -> Result<SecretString, CredentialError>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the login client.
#[derive(Clone)]
pub struct LoginClientConfig {
    /// Full login URL (base URL with the login path applied).
    pub login_url: String,

    /// Service account name.
    pub username: String,

    /// Service account password.
    pub password: SecretString,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl std::fmt::Debug for LoginClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginClientConfig")
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl LoginClientConfig {
    /// Create a new configuration with the default timeout.
    #[must_use]
    pub fn new(login_url: String, username: String, password: SecretString) -> Self {
        Self {
            login_url,
            username,
            password,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: SecretString,
}

// =============================================================================
// Login Client
// =============================================================================

/// HTTP client for the login endpoint.
pub struct LoginClient {
    http_client: reqwest::Client,
    config: LoginClientConfig,
}

impl std::fmt::Debug for LoginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LoginClient {
    /// Build a login client.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: LoginClientConfig) -> Result<Self, CredentialError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                CredentialError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl CredentialIssuer for LoginClient {
    #[instrument(skip_all, name = "common.credential_issuer.fetch")]
    async fn fetch_credential(&self) -> Result<SecretString, CredentialError> {
        debug!(
            target: "common.credential_issuer",
            url = %self.config.login_url,
            username = %self.config.username,
            "Requesting service credential"
        );

        let body = LoginRequest {
            username: &self.config.username,
            password: self.config.password.expose_secret(),
        };

        let response = self
            .http_client
            .post(&self.config.login_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "common.credential_issuer", error = %e, "Login request failed");
                CredentialError::Upstream(format!("request failed: {e}"))
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            let body = truncate_body(&body);
            warn!(
                target: "common.credential_issuer",
                status = status.as_u16(),
                body = %body,
                "Login service returned non-success status"
            );
            return Err(CredentialError::Upstream(format!(
                "status {}: {body}",
                status.as_u16()
            )));
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            warn!(target: "common.credential_issuer", error = %e, "Failed to parse login response");
            CredentialError::MalformedResponse(e.to_string())
        })?;

        if login.access_token.expose_secret().is_empty() {
            return Err(CredentialError::MalformedResponse(
                "empty access_token".to_string(),
            ));
        }

        debug!(target: "common.credential_issuer", "Service credential issued");
        Ok(login.access_token)
    }
}

/// Cut an upstream response body to `MAX_ERROR_BODY_CHARS` characters.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let truncated: String = chars.by_ref().take(MAX_ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

// =============================================================================
// Tests
// =============================================================================
