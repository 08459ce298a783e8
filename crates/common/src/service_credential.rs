//! Cache for the service's own outbound credential.
//!
//! Holds at most one token, fetched lazily through a [`CredentialIssuer`]
//! and replaced whenever it stops being usable. A cached token is usable
//! only if it verifies against the trusted key (same procedure as caller
//! tokens) and stays valid for at least [`MIN_REMAINING_VALIDITY`].
//!
//! # Concurrency
//!
//! State lives behind a `tokio::sync::RwLock`:
//!
//! - Fast path: read lock, check, clone. Concurrent callers never block
//!   each other while the token is usable.
//! - Refresh: write lock, re-check, fetch, store. At most one fetch is in
//!   flight; callers that queued behind it reuse its result. A refresh
//!   bumps a generation counter, so a waiter that sees a newer generation
//!   takes the new token even when it is valid for less than
//!   [`MIN_REMAINING_VALIDITY`], as long as it has not expired.
//!
//! A failed fetch leaves the cache empty and the error goes to the caller.
//! Dropping a caller mid-fetch releases the lock with the cache empty.

use crate::credential_issuer::{CredentialError, CredentialIssuer};
use crate::jwt::{self, ExpiryCheck, ExpiryClaims, RsaPublicKey};
use crate::secret::{ExposeSecret, SecretString};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// Constants
// =============================================================================

/// A cached credential must remain valid at least this long to be reused.
pub const MIN_REMAINING_VALIDITY: Duration = Duration::from_secs(3600);

// =============================================================================
// Validity
// =============================================================================

/// Whether `token` may be reused at time `now` (Unix seconds).
///
/// False if verification fails for any reason, or if `exp < now + MIN_REMAINING_VALIDITY`.
#[must_use]
pub fn credential_is_usable(token: &str, trusted_key: &RsaPublicKey, now: i64) -> bool {
    match jwt::verify::<ExpiryClaims>(token, trusted_key, ExpiryCheck::Skip) {
        Ok(claims) => claims.exp >= now + min_remaining_secs(),
        Err(e) => {
            debug!(
                target: "common.service_credential",
                error = ?e,
                "Cached credential failed verification"
            );
            false
        }
    }
}

fn min_remaining_secs() -> i64 {
    i64::try_from(MIN_REMAINING_VALIDITY.as_secs()).unwrap_or(i64::MAX)
}

// =============================================================================
// Cache
// =============================================================================

/// Cached token plus the number of successful refreshes so far.
#[derive(Default)]
struct CachedCredential {
    token: Option<SecretString>,
    generation: u64,
}

/// Single-flight cache of the service credential.
///
/// Construct one per process and share it by `Arc`.
pub struct ServiceCredentialCache {
    issuer: Arc<dyn CredentialIssuer>,
    trusted_key: RsaPublicKey,
    current: RwLock<CachedCredential>,
}

impl std::fmt::Debug for ServiceCredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentialCache")
            .field("current", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ServiceCredentialCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(issuer: Arc<dyn CredentialIssuer>, trusted_key: RsaPublicKey) -> Self {
        Self {
            issuer,
            trusted_key,
            current: RwLock::new(CachedCredential::default()),
        }
    }

    /// Return a usable credential, fetching a new one if needed.
    ///
    /// # Errors
    ///
    /// - Any `CredentialError` from the issuer, unchanged
    /// - `CredentialError::InvalidCredential` if the issued token fails
    ///   verification or is already expired (it is not cached)
    #[instrument(skip_all, name = "common.service_credential.get")]
    pub async fn get_credential(&self) -> Result<SecretString, CredentialError> {
        let seen_generation = {
            let current = self.current.read().await;
            if let Some(token) = current.token.as_ref().filter(|t| self.is_usable(t)) {
                return Ok(token.clone());
            }
            current.generation
        };

        let mut current = self.current.write().await;

        // Another caller may have refreshed while this one waited for the lock.
        if let Some(token) = current.token.as_ref().filter(|t| self.is_usable(t)) {
            debug!(
                target: "common.service_credential",
                "Reusing credential refreshed by a concurrent caller"
            );
            return Ok(token.clone());
        }
        if current.generation != seen_generation {
            if let Some(token) = current.token.as_ref().filter(|t| self.is_unexpired(t)) {
                debug!(
                    target: "common.service_credential",
                    "Reusing short-lived credential refreshed by a concurrent caller"
                );
                return Ok(token.clone());
            }
        }

        current.token = None;
        let fresh = self.fetch_verified().await.map_err(|e| {
            counter!("ms_service_credential_refreshes_total", "status" => "error").increment(1);
            e
        })?;
        current.token = Some(fresh.clone());
        current.generation = current.generation.wrapping_add(1);
        counter!("ms_service_credential_refreshes_total", "status" => "success").increment(1);

        Ok(fresh)
    }

    async fn fetch_verified(&self) -> Result<SecretString, CredentialError> {
        let fresh = self.issuer.fetch_credential().await.map_err(|e| {
            warn!(
                target: "common.service_credential",
                error = %e,
                "Service credential refresh failed"
            );
            e
        })?;

        let claims = jwt::verify::<ExpiryClaims>(
            fresh.expose_secret(),
            &self.trusted_key,
            ExpiryCheck::Skip,
        )
        .map_err(|e| {
            warn!(
                target: "common.service_credential",
                error = ?e,
                "Issued credential does not verify against the trusted key"
            );
            CredentialError::InvalidCredential
        })?;

        let now = chrono::Utc::now().timestamp();
        if claims.exp <= now {
            warn!(
                target: "common.service_credential",
                exp = claims.exp,
                now = now,
                "Issued credential is already expired"
            );
            return Err(CredentialError::InvalidCredential);
        }

        if claims.exp < now + min_remaining_secs() {
            warn!(
                target: "common.service_credential",
                expires_in_secs = claims.exp - now,
                "Issued credential expires within the reuse window; it will be refetched on next use"
            );
        } else {
            info!(
                target: "common.service_credential",
                expires_in_secs = claims.exp - now,
                "Service credential refreshed"
            );
        }

        Ok(fresh)
    }

    fn is_usable(&self, token: &SecretString) -> bool {
        credential_is_usable(
            token.expose_secret(),
            &self.trusted_key,
            chrono::Utc::now().timestamp(),
        )
    }

    fn is_unexpired(&self, token: &SecretString) -> bool {
        jwt::verify::<ExpiryClaims>(token.expose_secret(), &self.trusted_key, ExpiryCheck::Skip)
            .is_ok_and(|claims| claims.exp > chrono::Utc::now().timestamp())
    }

    /// Place a credential in the cache without fetching.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn seed(&self, token: SecretString) {
        self.current.write().await.token = Some(token);
    }
}

// =============================================================================
// Tests
// =============================================================================
