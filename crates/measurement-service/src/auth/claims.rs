//! Caller token claims and the resolved identity.
//!
//! Caller identifiers are redacted in Debug output.

use serde::Deserialize;
use std::fmt;

/// Claims carried by caller tokens, decoded after signature verification.
#[derive(Clone, Deserialize)]
pub struct UserTokenClaims {
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Nested identity block.
    pub user_claims: UserClaims,
}

/// Identity block inside [`UserTokenClaims`].
#[derive(Clone, Deserialize)]
pub struct UserClaims {
    /// Caller identifier (UUID-shaped string) - redacted in Debug output.
    pub uuid: String,

    /// Role name, when the issuer includes one.
    #[serde(default)]
    pub role: Option<String>,
}

impl fmt::Debug for UserTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserTokenClaims")
            .field("exp", &self.exp)
            .field("user_claims", &self.user_claims)
            .finish()
    }
}

impl fmt::Debug for UserClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserClaims")
            .field("uuid", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// The authenticated caller for the current request.
///
/// Inserted into request extensions by the auth middleware; never cached
/// across requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    /// Wrap a verified caller identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The caller identifier as sent to the authorization service.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialize_with_optional_role() {
        let json = r#"{"exp": 1700000000, "user_claims": {"uuid": "u-1"}}"#;
        let claims: UserTokenClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.user_claims.uuid, "u-1");
        assert!(claims.user_claims.role.is_none());
    }

    #[test]
    fn test_claims_debug_redacts_uuid() {
        let json = r#"{"exp": 1, "user_claims": {"uuid": "secret-user-id", "role": "parent"}}"#;
        let claims: UserTokenClaims = serde_json::from_str(json).unwrap();
        let debug_str = format!("{claims:?}");
        assert!(!debug_str.contains("secret-user-id"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("parent"));
    }

    #[test]
    fn test_identity_debug_redacts() {
        let identity = Identity::new("secret-user-id");
        assert_eq!(identity.as_str(), "secret-user-id");
        assert!(!format!("{identity:?}").contains("secret-user-id"));
    }
}
