//! Core domain types and shared logic for the Waypost analytics server.
//!
//! This crate defines the pieces shared across all other crates:
//! - Application configuration
//! - Origin and domain normalization
//! - Core error types

pub mod config;
pub mod error;
pub mod origin;

pub use error::{Error, Result};
pub use origin::{normalize_origin, validate_domain};
