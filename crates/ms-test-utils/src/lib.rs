//! # Measurement Service Test Utilities
//!
//! - Fixed RSA/Ed25519 key material
//! - `TestTokenBuilder` for signed caller and service tokens
//! - Fixed test IDs
//!
//! ```rust,ignore
//! use ms_test_utils::*;
//!
//! let token = TestTokenBuilder::for_user(TEST_USER_PARENT)
//!     .expires_in(3600)
//!     .build();
//! ```

pub mod crypto_fixtures;
pub mod test_ids;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use test_ids::*;
pub use token_builders::*;
