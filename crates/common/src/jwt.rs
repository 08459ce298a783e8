//! RS256 token verification shared by caller authentication and the
//! service credential cache.
//!
//! One procedure verifies every token this service trusts:
//!
//! 1. Size check BEFORE any parsing
//! 2. Header decode; the declared `alg` must be exactly `RS256`
//! 3. Signature verification against the configured RSA public key
//! 4. Optional `exp` enforcement
//! 5. Typed claims decode; shape mismatches become `MalformedClaims`
//!
//! # Security
//!
//! - Any algorithm other than RS256 is rejected before key material is
//!   touched (HS256 keyed with the public PEM, EdDSA, `none`)
//! - Claims are only decoded into caller types after the signature verifies
//! - Error messages are generic; detail is logged at debug level
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{verify, ExpiryCheck, RsaPublicKey};
//!
//! let key = RsaPublicKey::from_pem(&config_value)?;
//! let claims: MyClaims = verify(token, &key, ExpiryCheck::Enforce)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before base64 decoding or any
/// cryptographic work. Tokens issued by the login service are well under 1KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// The only signing algorithm accepted, as it appears in the JWT header.
pub const EXPECTED_ALGORITHM: &str = "RS256";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token verification.
///
/// Rejection variants share one generic message; the variant itself is what
/// callers and tests inspect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a structurally valid JWT.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Wrong algorithm, or the signature does not verify against the key.
    #[error("The access token is invalid or expired")]
    InvalidSignature,

    /// Token `exp` is in the past.
    #[error("The access token is invalid or expired")]
    Expired,

    /// Signature verified but the claims do not have the required shape.
    #[error("The access token is invalid or expired")]
    MalformedClaims,

    /// The configured public key could not be parsed.
    #[error("The configured token public key is invalid")]
    InvalidKey,
}

// =============================================================================
// Key Material
// =============================================================================

/// Whether `verify` enforces the `exp` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    /// Reject tokens whose `exp` has passed (library default leeway).
    Enforce,
    /// Accept any `exp`; the caller applies its own window.
    Skip,
}

/// A parsed RSA public key trusted to sign tokens.
///
/// Parsed once at startup and shared; cloning is cheap.
#[derive(Clone)]
pub struct RsaPublicKey {
    key: DecodingKey,
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey").finish_non_exhaustive()
    }
}

impl RsaPublicKey {
    /// Parse a PEM-encoded RSA public key (SPKI or PKCS#1).
    ///
    /// Literal `\n` sequences, as found in newline-escaped configuration
    /// values, are unescaped first.
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::InvalidKey` if the PEM does not hold an RSA key.
    pub fn from_pem(pem: &str) -> Result<Self, JwtValidationError> {
        let pem = unescape_pem(pem);
        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to parse RSA public key");
            JwtValidationError::InvalidKey
        })?;
        Ok(Self { key })
    }
}

/// Replace literal `\n` two-character sequences with real newlines.
#[must_use]
pub fn unescape_pem(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

// =============================================================================
// Claims Types
// =============================================================================

/// Minimal claims view used when only the expiry matters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExpiryClaims {
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `alg` header value without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three parts, bad base64, bad JSON, or no string `alg`
pub fn extract_alg(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MalformedToken)
}

/// Verify an RS256 token and decode its claims into `T`.
///
/// # Errors
///
/// - `TokenTooLarge`, `MalformedToken` - structural problems
/// - `InvalidSignature` - algorithm is not RS256, or the signature does not verify
/// - `Expired` - `exp` has passed and `expiry` is `Enforce`
/// - `MalformedClaims` - claims lack `exp` or do not match `T`
pub fn verify<T: DeserializeOwned>(
    token: &str,
    key: &RsaPublicKey,
    expiry: ExpiryCheck,
) -> Result<T, JwtValidationError> {
    let alg = extract_alg(token)?;
    if alg != EXPECTED_ALGORITHM {
        tracing::debug!(
            target: "common.jwt",
            alg = %alg,
            "Token rejected: unexpected signing algorithm"
        );
        return Err(JwtValidationError::InvalidSignature);
    }

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = expiry == ExpiryCheck::Enforce;
    validation.validate_aud = false;

    let data = decode::<serde_json::Value>(token, &key.key, &validation).map_err(|e| {
        let classified = classify(&e);
        tracing::debug!(
            target: "common.jwt",
            error = %e,
            classified = ?classified,
            "Token verification failed"
        );
        classified
    })?;

    serde_json::from_value(data.claims).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Token claims have unexpected shape");
        JwtValidationError::MalformedClaims
    })
}

fn classify(err: &jsonwebtoken::errors::Error) -> JwtValidationError {
    match err.kind() {
        ErrorKind::ExpiredSignature => JwtValidationError::Expired,
        ErrorKind::MissingRequiredClaim(_) => JwtValidationError::MalformedClaims,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => JwtValidationError::MalformedToken,
        _ => JwtValidationError::InvalidSignature,
    }
}

// =============================================================================
// Tests
// =============================================================================
