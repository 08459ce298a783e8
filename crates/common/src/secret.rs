//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so deriving `Debug` on a struct that holds the login password
//! or a bearer token stays safe.
//!
//! Used here for:
//! - the service account password read from configuration
//! - the service credential returned by the login endpoint
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let credential = SecretString::from("eyJhbGciOi...");
//! assert!(format!("{credential:?}").contains("REDACTED"));
//!
//! let header = format!("Bearer {}", credential.expose_secret());
//! assert!(header.starts_with("Bearer "));
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_service_account_password_is_redacted() {
        #[allow(dead_code)]
        #[derive(Debug)]
        struct ServiceAccount {
            username: String,
            password: SecretString,
        }

        let account = ServiceAccount {
            username: "measurement-service".to_string(),
            password: SecretString::from("s3cr3t-pass"),
        };

        let debug_str = format!("{account:?}");
        assert!(debug_str.contains("measurement-service"));
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("s3cr3t-pass"));
    }

    #[test]
    fn test_login_response_token_deserializes_as_secret() {
        #[derive(Debug, Deserialize)]
        struct LoginResponse {
            access_token: SecretString,
        }

        let json = r#"{"access_token": "header.payload.signature"}"#;
        let response: LoginResponse = serde_json::from_str(json).expect("deserialize");

        assert_eq!(
            response.access_token.expose_secret(),
            "header.payload.signature"
        );
        assert!(!format!("{response:?}").contains("header.payload.signature"));
    }
}
