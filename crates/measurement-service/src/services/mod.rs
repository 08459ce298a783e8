//! Service layer for the measurement service.
//!
//! - `access_gate` asks the family service for access decisions
//! - `authorization` turns decisions into `Forbidden`/`OperationFailed`
//! - `measurements` holds the business operations

pub mod access_gate;
pub mod authorization;
pub mod measurements;

pub use access_gate::{AccessCheckError, AccessDecision, AccessGate, FamilyAccessClient};
pub use authorization::Authorizer;
pub use measurements::MeasurementService;
