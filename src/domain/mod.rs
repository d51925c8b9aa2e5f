//! Domain layer for the edgewise research engine
//!
//! This module contains the core models, port traits, and error types.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
