//! Repository layer for database operations.

pub mod measurements;

pub use measurements::{MeasurementRepository, PgMeasurementRepository};
