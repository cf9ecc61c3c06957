//! Typed configuration for the Aussie auth core.
//!
//! This crate defines the shape of every flag group the core
//! recognizes and the semantic checks that must hold at startup.
//! Loading these values from files or environment variables, and
//! hot-reloading them, is a host concern and lives outside this repo.

pub mod config;
pub mod validation;

pub use config::*;
pub use validation::{ConfigValidationError, ConfigValidator};
