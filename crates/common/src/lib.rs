//! Authentication primitives shared by the measurement service.
//!
//! Verifying caller tokens, holding the service's own outbound credential,
//! and the login client that obtains it.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for RS256 token verification (size limits, algorithm pinning, typed claims)
pub mod jwt;

/// Module for the login client that issues service credentials
pub mod credential_issuer;

/// Module for the single-flight cache of the service's outbound credential
pub mod service_credential;
