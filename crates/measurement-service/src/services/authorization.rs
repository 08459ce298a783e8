//! Authorization enforcement for target-scoped operations.
//!
//! Every read or write of a target's data goes through [`Authorizer`].
//! A denial is `Forbidden`; failing to reach a decision is
//! `OperationFailed`. The two never collapse into each other.

use crate::auth::Identity;
use crate::errors::MsError;
use crate::services::access_gate::{AccessDecision, AccessGate};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument};

/// Gatekeeper wrapping an [`AccessGate`].
#[derive(Clone)]
pub struct Authorizer {
    gate: Arc<dyn AccessGate>,
}

impl Authorizer {
    pub fn new(gate: Arc<dyn AccessGate>) -> Self {
        Self { gate }
    }

    /// Succeed only if `identity` may act on `target_id`.
    ///
    /// # Errors
    ///
    /// - `MsError::Forbidden` - the family service denied access
    /// - `MsError::OperationFailed` - no decision could be reached
    #[instrument(skip_all, name = "ms.services.authorization.ensure_access")]
    pub async fn ensure_access(&self, identity: &Identity, target_id: &str) -> Result<(), MsError> {
        match self.gate.check_access(identity, target_id).await {
            Ok(AccessDecision::Allowed) => Ok(()),
            Ok(AccessDecision::Denied) => {
                info!(
                    target: "ms.services.authorization",
                    identity = ?identity,
                    target_id = %target_id,
                    "Access denied"
                );
                Err(MsError::Forbidden)
            }
            Err(e) => Err(MsError::OperationFailed(format!("access check failed: {e}"))),
        }
    }

    /// Run `operation` only after access to `target_id` is confirmed.
    ///
    /// The operation's own result is returned unchanged.
    pub async fn authorize_then<T, F>(
        &self,
        identity: &Identity,
        target_id: &str,
        operation: F,
    ) -> Result<T, MsError>
    where
        F: Future<Output = Result<T, MsError>>,
    {
        self.ensure_access(identity, target_id).await?;
        operation.await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::access_gate::mock::MockAccessGate;
    use crate::services::access_gate::AccessCheckError;
    use common::credential_issuer::CredentialError;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn identity() -> Identity {
        Identity::new("U1")
    }

    #[tokio::test]
    async fn test_allowed_passes() {
        let gate = Arc::new(MockAccessGate::allowing());
        let authorizer = Authorizer::new(gate.clone());

        assert!(authorizer.ensure_access(&identity(), "T1").await.is_ok());
        assert_eq!(gate.call_count(), 1);
    }

    #[tokio::test]
    async fn test_denied_is_forbidden() {
        let authorizer = Authorizer::new(Arc::new(MockAccessGate::denying()));

        assert!(matches!(
            authorizer.ensure_access(&identity(), "T1").await,
            Err(MsError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_gate_error_is_operation_failed_not_forbidden() {
        let authorizer = Authorizer::new(Arc::new(MockAccessGate::failing()));

        assert!(matches!(
            authorizer.ensure_access(&identity(), "T1").await,
            Err(MsError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_credential_error_is_operation_failed() {
        let authorizer = Authorizer::new(Arc::new(MockAccessGate::with_outcome(Err(
            AccessCheckError::Credential(CredentialError::InvalidCredential),
        ))));

        assert!(matches!(
            authorizer.ensure_access(&identity(), "T1").await,
            Err(MsError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_authorize_then_skips_operation_when_denied() {
        let authorizer = Authorizer::new(Arc::new(MockAccessGate::denying()));
        let ran = AtomicBool::new(false);

        let result = authorizer
            .authorize_then(&identity(), "T1", async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(MsError::Forbidden)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_authorize_then_returns_operation_result_unchanged() {
        let authorizer = Authorizer::new(Arc::new(MockAccessGate::allowing()));

        let ok = authorizer
            .authorize_then(&identity(), "T1", async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(ok, 42);

        let err: Result<(), MsError> = authorizer
            .authorize_then(&identity(), "T1", async {
                Err(MsError::NotFound("Measurement not found".to_string()))
            })
            .await;
        assert!(matches!(err, Err(MsError::NotFound(_))));
    }
}
