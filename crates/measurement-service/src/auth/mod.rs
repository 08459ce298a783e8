//! Caller authentication.
//!
//! - `claims` - Typed token claims and the resolved caller `Identity`
//! - `verifier` - `TokenVerifier`, RS256 verification against the configured key

pub mod claims;
pub mod verifier;

pub use claims::{Identity, UserTokenClaims};
pub use verifier::TokenVerifier;
