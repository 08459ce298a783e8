//! Builders for signed test tokens.
//!
//! Produces compact JWTs shaped like the ones the login service issues:
//! an `exp` claim plus a nested `user_claims` block carrying the caller uuid.

use crate::crypto_fixtures::{
    ED25519_PRIVATE_KEY_PEM, TRUSTED_RSA_PRIVATE_KEY_PEM, TRUSTED_RSA_PUBLIC_KEY_PEM,
    UNTRUSTED_RSA_PRIVATE_KEY_PEM,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Which key (and algorithm) signs the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningKey {
    /// RS256 with the trusted RSA key.
    Trusted,
    /// RS256 with an RSA key the service does not trust.
    Untrusted,
    /// EdDSA with an Ed25519 key.
    Ed25519,
    /// HS256 keyed with the trusted public key PEM (algorithm confusion).
    HmacWithPublicKey,
    /// `alg: none` with an empty signature.
    Unsigned,
}

/// Builder for signed test tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
///     .expires_in(-60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    key: SigningKey,
}

impl TestTokenBuilder {
    /// Caller token for `user`, valid for one hour.
    pub fn for_user(user: Uuid) -> Self {
        Self::with_user_claims(json!({ "uuid": user.to_string(), "role": "parent" }))
    }

    /// Service credential, valid for two days.
    pub fn service() -> Self {
        Self::with_user_claims(json!({ "uuid": "measurement-service", "role": "service" }))
            .expires_in(2 * 24 * 3600)
    }

    fn with_user_claims(user_claims: Value) -> Self {
        let mut claims = Map::new();
        claims.insert(
            "exp".to_string(),
            json!((Utc::now() + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("user_claims".to_string(), user_claims);
        Self {
            claims,
            key: SigningKey::Trusted,
        }
    }

    /// Set expiration in seconds from now (negative for already expired).
    pub fn expires_in(self, seconds: i64) -> Self {
        self.expires_at((Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set an absolute expiration (Unix seconds).
    pub fn expires_at(mut self, exp: i64) -> Self {
        self.claims.insert("exp".to_string(), json!(exp));
        self
    }

    /// Drop the `exp` claim entirely.
    pub fn without_expiry(mut self) -> Self {
        self.claims.remove("exp");
        self
    }

    /// Drop the `user_claims` block.
    pub fn without_user_claims(mut self) -> Self {
        self.claims.remove("user_claims");
        self
    }

    /// Replace the `user_claims` block with an arbitrary value.
    pub fn with_user_claims_value(mut self, value: Value) -> Self {
        self.claims.insert("user_claims".to_string(), value);
        self
    }

    /// Select the signing key.
    pub fn signed_with(mut self, key: SigningKey) -> Self {
        self.key = key;
        self
    }

    /// Encode and sign the token.
    pub fn build(self) -> String {
        let claims = Value::Object(self.claims);
        match self.key {
            SigningKey::Trusted => rs256(&claims, TRUSTED_RSA_PRIVATE_KEY_PEM),
            SigningKey::Untrusted => rs256(&claims, UNTRUSTED_RSA_PRIVATE_KEY_PEM),
            SigningKey::Ed25519 => {
                let key = EncodingKey::from_ed_pem(ED25519_PRIVATE_KEY_PEM.as_bytes())
                    .expect("Ed25519 fixture key should parse");
                encode(&Header::new(Algorithm::EdDSA), &claims, &key)
                    .expect("EdDSA signing should succeed")
            }
            SigningKey::HmacWithPublicKey => {
                let key = EncodingKey::from_secret(TRUSTED_RSA_PUBLIC_KEY_PEM.as_bytes());
                encode(&Header::new(Algorithm::HS256), &claims, &key)
                    .expect("HS256 signing should succeed")
            }
            SigningKey::Unsigned => {
                let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
                let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
                format!("{header}.{payload}.")
            }
        }
    }
}

fn rs256(claims: &Value, private_pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
        .expect("RSA fixture key should parse");
    encode(&Header::new(Algorithm::RS256), claims, &key).expect("RS256 signing should succeed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_ids::TEST_USER_PARENT;

    fn decode_part(token: &str, index: usize) -> Value {
        let part = token.split('.').nth(index).expect("token part");
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).expect("base64")).expect("json")
    }

    #[test]
    fn test_user_token_has_three_parts_and_rs256_header() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT).build();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(decode_part(&token, 0)["alg"], "RS256");
    }

    #[test]
    fn test_user_token_carries_uuid_claim() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT).build();
        let claims = decode_part(&token, 1);
        assert_eq!(claims["user_claims"]["uuid"], TEST_USER_PARENT.to_string());
    }

    #[test]
    fn test_without_user_claims_removes_block() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
            .without_user_claims()
            .build();
        assert!(decode_part(&token, 1).get("user_claims").is_none());
    }

    #[test]
    fn test_service_token_expires_in_two_days() {
        let token = TestTokenBuilder::service().build();
        let exp = decode_part(&token, 1)["exp"].as_i64().expect("exp");
        assert!(exp > Utc::now().timestamp() + 47 * 3600);
    }

    #[test]
    fn test_unsigned_token_declares_none() {
        let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
            .signed_with(SigningKey::Unsigned)
            .build();
        assert_eq!(decode_part(&token, 0)["alg"], "none");
        assert!(token.ends_with('.'));
    }
}
