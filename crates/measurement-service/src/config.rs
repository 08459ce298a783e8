//! Measurement service configuration.
//!
//! Configuration is loaded from environment variables. Sensitive fields are
//! redacted in Debug output.

use common::jwt::RsaPublicKey;
use common::secret::SecretString;
use reqwest::Url;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default login path applied to `AUTH_SERVER_URL`.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Default bound on each outbound call, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for `UPSTREAM_TIMEOUT_SECONDS`.
pub const MAX_UPSTREAM_TIMEOUT_SECONDS: u64 = 60;

/// Default bound on each inbound request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Measurement service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Login endpoint: `AUTH_SERVER_URL` with its path replaced by the login path.
    pub login_url: String,

    /// Service account name for the login call.
    pub auth_username: String,

    /// Service account password for the login call.
    pub auth_password: SecretString,

    /// Public key that signs caller tokens and the service credential.
    pub token_public_key: RsaPublicKey,

    /// Base URL of the authorization (family) service.
    pub family_server_url: String,

    /// Bound on every outbound call.
    pub upstream_timeout: Duration,

    /// Bound on every inbound request.
    pub request_timeout: Duration,

    /// Drain period after a shutdown signal.
    pub shutdown_drain: Duration,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("login_url", &self.login_url)
            .field("auth_username", &self.auth_username)
            .field("auth_password", &"[REDACTED]")
            .field("token_public_key", &self.token_public_key)
            .field("family_server_url", &self.family_server_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_drain", &self.shutdown_drain)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid URL configuration: {0}")]
    InvalidUrl(String),

    #[error("Invalid token public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_server_url =
            parse_http_url("AUTH_SERVER_URL", &required(vars, "AUTH_SERVER_URL")?)?;
        let login_path = vars
            .get("AUTH_SERVER_LOGIN_PATH")
            .map(String::as_str)
            .unwrap_or(DEFAULT_LOGIN_PATH);
        let mut login_url = auth_server_url;
        login_url.set_path(login_path);

        let auth_username = required(vars, "AUTH_SERVER_USERNAME")?;
        let auth_password = SecretString::from(required(vars, "AUTH_SERVER_PASSWORD")?);

        // Stored newline-escaped; RsaPublicKey::from_pem unescapes.
        let public_key_pem = required(vars, "AUTH_SERVER_JWT_PUBLIC")?;
        let token_public_key = RsaPublicKey::from_pem(&public_key_pem).map_err(|e| {
            ConfigError::InvalidPublicKey(format!("AUTH_SERVER_JWT_PUBLIC: {}", e))
        })?;

        let family_server_url =
            parse_http_url("FAMILY_SERVER_URL", &required(vars, "FAMILY_SERVER_URL")?)?;

        let upstream_timeout = Duration::from_secs(parse_seconds(
            vars,
            "UPSTREAM_TIMEOUT_SECONDS",
            DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
            1,
            MAX_UPSTREAM_TIMEOUT_SECONDS,
        )?);

        let request_timeout = Duration::from_secs(parse_seconds(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
            1,
            300,
        )?);

        let shutdown_drain = Duration::from_secs(parse_seconds(
            vars,
            "SHUTDOWN_DRAIN_SECONDS",
            0,
            0,
            300,
        )?);

        Ok(Config {
            database_url,
            bind_address,
            login_url: login_url.to_string(),
            auth_username,
            auth_password,
            token_public_key,
            family_server_url: family_server_url.to_string(),
            upstream_timeout,
            request_timeout,
            shutdown_drain,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_http_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("{} must be a valid URL: {}", name, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must be an http(s) base URL, got '{}'",
            name, value
        )));
    }

    Ok(url)
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidTimeout(format!(
            "{} must be a valid integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value < min || value > max {
        return Err(ConfigError::InvalidTimeout(format!(
            "{} must be between {} and {} seconds, got {}",
            name, min, max, value
        )));
    }

    Ok(value)
}
