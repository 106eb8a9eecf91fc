//! HTTP control plane for Waypost.
//!
//! This crate provides the ingestion-facing server:
//! - Tracking event admission (`POST /api/track`)
//! - Site administration endpoints with synchronous cache updates
//! - Health/readiness reporting
//! - CORS backed by the origin allow list

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
