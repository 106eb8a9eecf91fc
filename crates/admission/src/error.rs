//! Admission-layer error types.

use thiserror::Error;
use waypost_metadata::MetadataError;

/// Errors reported by cache loads and allow-list refreshes.
///
/// Lookup paths never return these: a failed load leaves the previously
/// published snapshot serving, and lookups degrade to fail-safe defaults.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("repository error: {0}")]
    Repository(#[from] MetadataError),

    #[error("configuration error: {0}")]
    Config(String),
}
