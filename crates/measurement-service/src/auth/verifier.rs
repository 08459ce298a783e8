//! Caller token verification.
//!
//! Verifies RS256 caller tokens against the configured public key and
//! extracts the caller identity. No network calls.

use crate::auth::claims::{Identity, UserTokenClaims};
use common::jwt::{self, ExpiryCheck, JwtValidationError, RsaPublicKey};
use tracing::instrument;

/// Verifies caller tokens and resolves the caller [`Identity`].
#[derive(Clone, Debug)]
pub struct TokenVerifier {
    public_key: RsaPublicKey,
}

impl TokenVerifier {
    /// Create a verifier that trusts `public_key`.
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self { public_key }
    }

    /// Verify `token` and return the caller identity.
    ///
    /// Caller token expiry is enforced.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - not RS256, or not signed by the configured key
    /// - `MalformedToken`, `TokenTooLarge` - structural problems
    /// - `Expired` - `exp` has passed
    /// - `MalformedClaims` - no `user_claims` block, or no non-empty string `uuid` in it
    #[instrument(skip_all, name = "ms.auth.verify")]
    pub fn verify_and_extract_identity(&self, token: &str) -> Result<Identity, JwtValidationError> {
        let claims: UserTokenClaims = jwt::verify(token, &self.public_key, ExpiryCheck::Enforce)?;

        if claims.user_claims.uuid.is_empty() {
            tracing::debug!(target: "ms.auth", "Token rejected: empty caller uuid");
            return Err(JwtValidationError::MalformedClaims);
        }

        Ok(Identity::new(claims.user_claims.uuid))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ms_test_utils::{
        SigningKey, TestTokenBuilder, TEST_USER_PARENT, TRUSTED_RSA_PUBLIC_KEY_PEM,
        UNTRUSTED_RSA_PUBLIC_KEY_PEM,
    };
    use serde_json::json;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(RsaPublicKey::from_pem(TRUSTED_RSA_PUBLIC_KEY_PEM).unwrap())
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT).build();
        let identity = verifier().verify_and_extract_identity(&token).unwrap();
        assert_eq!(identity.as_str(), TEST_USER_PARENT.to_string());
    }

    #[test]
    fn test_token_from_other_key_is_invalid_signature() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
            .signed_with(SigningKey::Untrusted)
            .build();
        assert_eq!(
            verifier().verify_and_extract_identity(&token),
            Err(JwtValidationError::InvalidSignature)
        );
    }

    #[test]
    fn test_verifier_for_other_key_rejects_trusted_token() {
        let other =
            TokenVerifier::new(RsaPublicKey::from_pem(UNTRUSTED_RSA_PUBLIC_KEY_PEM).unwrap());
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT).build();
        assert_eq!(
            other.verify_and_extract_identity(&token),
            Err(JwtValidationError::InvalidSignature)
        );
    }

    #[test]
    fn test_non_rs256_algorithms_are_invalid_signature() {
        for key in [
            SigningKey::HmacWithPublicKey,
            SigningKey::Ed25519,
            SigningKey::Unsigned,
        ] {
            let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
                .signed_with(key)
                .build();
            assert_eq!(
                verifier().verify_and_extract_identity(&token),
                Err(JwtValidationError::InvalidSignature),
                "{key:?}"
            );
        }
    }

    #[test]
    fn test_missing_or_mistyped_identity_is_malformed_claims() {
        let cases = [
            TestTokenBuilder::for_user(TEST_USER_PARENT).without_user_claims(),
            TestTokenBuilder::for_user(TEST_USER_PARENT).with_user_claims_value(json!({})),
            TestTokenBuilder::for_user(TEST_USER_PARENT)
                .with_user_claims_value(json!({"uuid": 12345})),
            TestTokenBuilder::for_user(TEST_USER_PARENT)
                .with_user_claims_value(json!({"uuid": null})),
            TestTokenBuilder::for_user(TEST_USER_PARENT)
                .with_user_claims_value(json!("not-an-object")),
            TestTokenBuilder::for_user(TEST_USER_PARENT).with_user_claims_value(json!({"uuid": ""})),
        ];

        for builder in cases {
            let token = builder.build();
            assert_eq!(
                verifier().verify_and_extract_identity(&token),
                Err(JwtValidationError::MalformedClaims)
            );
        }
    }

    #[test]
    fn test_expired_caller_token_is_rejected() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
            .expires_in(-3600)
            .build();
        assert_eq!(
            verifier().verify_and_extract_identity(&token),
            Err(JwtValidationError::Expired)
        );
    }

    #[test]
    fn test_garbage_is_malformed_token() {
        assert_eq!(
            verifier().verify_and_extract_identity("garbage"),
            Err(JwtValidationError::MalformedToken)
        );
    }
}
