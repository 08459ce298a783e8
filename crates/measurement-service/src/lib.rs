//! Measurement Service Library
//!
//! Stores height and weight measurements of a target and delegates the
//! decision of who may read or write them to the family service.
//!
//! # Modules
//!
//! - `auth` - Caller token verification and identity
//! - `config` - Service configuration
//! - `errors` - Error types and HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `models` - Data models
//! - `observability` - Metrics
//! - `repositories` - Database access
//! - `routes` - Router and application state
//! - `services` - Access checks, authorization and business operations

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
