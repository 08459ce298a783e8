//! Observability for the measurement service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
