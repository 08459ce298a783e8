//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it
//! with the `TokenVerifier`, and injects the caller `Identity` into request
//! extensions. Any failure is a 401 and the handler never runs.

use crate::auth::TokenVerifier;
use crate::errors::MsError;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Verifier holding the trusted public key.
    pub verifier: Arc<TokenVerifier>,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// Returns `None` for other schemes and for an empty token.
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that verifies caller tokens.
///
/// # Response
///
/// - 401 with WWW-Authenticate if the header is missing, malformed, or the
///   token fails verification
/// - Otherwise continues with the caller `Identity` in extensions
#[instrument(skip_all, name = "ms.middleware.auth")]
pub async fn require_user_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, MsError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "ms.middleware.auth", "Missing Authorization header");
            metrics::record_token_validation("missing");
            MsError::Unauthorized
        })?;

    let token = extract_bearer_token(auth_header).ok_or_else(|| {
        tracing::debug!(target: "ms.middleware.auth", "Invalid Authorization header format");
        metrics::record_token_validation("error");
        MsError::Unauthorized
    })?;

    let identity = state
        .verifier
        .verify_and_extract_identity(token)
        .map_err(|e| {
            tracing::debug!(target: "ms.middleware.auth", error = ?e, "Token verification failed");
            metrics::record_token_validation("error");
            MsError::Unauthorized
        })?;

    metrics::record_token_validation("success");
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
