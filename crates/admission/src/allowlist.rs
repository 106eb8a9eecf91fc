//! Origin allow list consulted before any tracking event is accepted.
//!
//! The list is built from three sources:
//! - static entries derived from configuration (localhost and the
//!   deployment's own base URL),
//! - dynamic entries collected from every site's configured domains,
//! - optional regex patterns from configuration, matched against the raw
//!   `Origin` header value.
//!
//! Static entries and patterns are fixed at construction, so the list
//! answers correctly for the deployment's own origin before the first
//! refresh completes. Refreshes replace the dynamic set wholesale.

use crate::error::LoadError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use waypost_core::config::ServerConfig;
use waypost_core::normalize_origin;
use waypost_metadata::MetadataStore;

/// Entry counts for startup and health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowListStats {
    /// Configuration-derived exact entries (localhost, base URL).
    pub static_entries: usize,
    /// Site-domain-derived exact entries.
    pub dynamic_entries: usize,
    /// Compiled regex patterns.
    pub patterns: usize,
}

struct AllowListState {
    /// Normalized `host[:port]` entries derived from configuration.
    static_entries: HashSet<String>,
    /// Normalized `host[:port]` entries derived from site domains.
    dynamic_entries: HashSet<String>,
    /// Patterns matched against the raw origin string.
    patterns: Vec<Regex>,
}

/// Origin allow list.
///
/// Shared by handle between the CORS layer, the tracking handler and the
/// refresh loop; lookups are synchronous and lock the state only briefly.
pub struct OriginAllowList {
    metadata: Arc<dyn MetadataStore>,
    state: RwLock<AllowListState>,
}

impl OriginAllowList {
    /// Build an allow list from server configuration. The initial state
    /// carries the static entries and compiled patterns; site domains are
    /// added by the first [`refresh`](Self::refresh).
    ///
    /// Fails only if the configured base URL does not contain a usable
    /// host. Malformed regex patterns are skipped with a warning rather
    /// than failing startup.
    pub fn new(
        config: &ServerConfig,
        metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, LoadError> {
        let base = normalize_origin(&config.base_url);
        if base.is_empty() {
            return Err(LoadError::Config(format!(
                "base_url '{}' does not contain a usable host",
                config.base_url
            )));
        }

        let mut static_entries = HashSet::new();
        static_entries.insert("localhost".to_string());
        static_entries.insert(base);

        let patterns = compile_patterns(&config.allowed_origin_patterns());

        Ok(Self {
            metadata,
            state: RwLock::new(AllowListState {
                static_entries,
                dynamic_entries: HashSet::new(),
                patterns,
            }),
        })
    }

    // Same poison recovery as the site cache: a panicked writer cannot
    // leave the sets structurally broken.
    fn read(&self) -> RwLockReadGuard<'_, AllowListState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AllowListState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Rebuild the dynamic entry set from every site's domain list and
    /// swap it in wholesale. On repository failure the previous entries
    /// keep serving.
    pub async fn refresh(&self) -> Result<(), LoadError> {
        let sites = match self.metadata.list_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh origin allow list");
                return Err(LoadError::Repository(e));
            }
        };

        let dynamic_entries: HashSet<String> = sites
            .iter()
            .flat_map(|row| row.domain_list())
            .map(|domain| normalize_origin(&domain))
            .filter(|entry| !entry.is_empty())
            .collect();
        let count = dynamic_entries.len();

        self.write().dynamic_entries = dynamic_entries;

        tracing::debug!(entries = count, "Origin allow list refreshed");
        Ok(())
    }

    /// Whether the given `Origin` header value may submit tracking events.
    ///
    /// The origin is normalized and checked against the static and dynamic
    /// entry sets; patterns are matched against the raw value so operators
    /// can anchor on scheme and port.
    pub fn is_allowed(&self, origin: &str) -> bool {
        let normalized = normalize_origin(origin);
        if normalized.is_empty() {
            return false;
        }

        let state = self.read();
        if state.static_entries.contains(&normalized)
            || state.dynamic_entries.contains(&normalized)
        {
            return true;
        }
        state.patterns.iter().any(|p| p.is_match(origin))
    }

    /// Current entry counts.
    pub fn stats(&self) -> AllowListStats {
        let state = self.read();
        AllowListStats {
            static_entries: state.static_entries.len(),
            dynamic_entries: state.dynamic_entries.len(),
            patterns: state.patterns.len(),
        }
    }
}

/// Compile the configured patterns, skipping any that fail to parse.
/// One bad pattern must not take down the others or the server.
fn compile_patterns(raw: &[String]) -> Vec<Regex> {
    raw.iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Skipping malformed origin pattern");
                None
            }
        })
        .collect()
}
