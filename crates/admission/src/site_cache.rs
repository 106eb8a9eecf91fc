//! In-memory site configuration cache consulted on the ingestion hot path.
//!
//! The cache is a plain site-id → entry map behind a read/write lock: the
//! workload is read-mostly with rare writes, so a single lock keeps the
//! security-relevant path (bot blocking, public/private gating) simple.
//! Full reloads build a fresh map outside the lock and swap it in under a
//! brief write section, so readers see either the old or the new snapshot
//! in full. Missing entries are not errors; lookups degrade to fail-safe
//! defaults (not public, bots blocked, no salting).

use crate::error::LoadError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use waypost_core::normalize_origin;
use waypost_metadata::models::SiteRow;
use waypost_metadata::MetadataStore;

/// Per-site operational flags and domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfigEntry {
    /// Whether the site's dashboard is publicly visible.
    pub public: bool,
    /// Whether user identifiers must be salted before storage.
    pub salt_user_ids: bool,
    /// Whether bot traffic is dropped for this site.
    pub block_bots: bool,
    /// Ordered domain list; the first entry is the primary domain.
    pub domains: Vec<String>,
}

impl Default for SiteConfigEntry {
    /// Fail-safe defaults served for unknown sites.
    fn default() -> Self {
        Self {
            public: false,
            salt_user_ids: false,
            block_bots: true,
            domains: Vec::new(),
        }
    }
}

impl From<&SiteRow> for SiteConfigEntry {
    fn from(row: &SiteRow) -> Self {
        Self {
            public: row.public,
            salt_user_ids: row.salt_user_ids,
            block_bots: row.block_bots,
            domains: row.domain_list(),
        }
    }
}

/// Partial entry update applied by administrative write paths.
/// `None` fields keep their current (or default) value.
#[derive(Debug, Clone, Default)]
pub struct SiteConfigUpdate {
    pub public: Option<bool>,
    pub salt_user_ids: Option<bool>,
    pub block_bots: Option<bool>,
    pub domains: Option<Vec<String>>,
}

/// Site configuration cache.
///
/// Constructed once at process start and shared by handle; request handlers
/// only ever call the synchronous lookup methods.
pub struct SiteConfigCache {
    metadata: Arc<dyn MetadataStore>,
    entries: RwLock<HashMap<i64, SiteConfigEntry>>,
    /// True once any bulk load has succeeded.
    initialized: AtomicBool,
    /// Serializes bulk loads so concurrent first requests trigger one fetch.
    load_guard: tokio::sync::Mutex<()>,
}

impl SiteConfigCache {
    /// Create an empty cache backed by the given repository.
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            metadata,
            entries: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            load_guard: tokio::sync::Mutex::new(()),
        }
    }

    // A panicked writer leaves the map structurally intact, so poisoned
    // guards are recovered rather than wedging admission.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<i64, SiteConfigEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<i64, SiteConfigEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether any bulk load has ever succeeded. Surfaced as a readiness
    /// signal; lookups work either way.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Bulk-load every site from the repository and atomically swap the
    /// mapping. On repository failure the previous snapshot keeps serving.
    pub async fn load_all(&self) -> Result<(), LoadError> {
        let sites = match self.metadata.list_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load site configurations");
                return Err(LoadError::Repository(e));
            }
        };

        let fresh: HashMap<i64, SiteConfigEntry> = sites
            .iter()
            .map(|row| (row.site_id, SiteConfigEntry::from(row)))
            .collect();
        let count = fresh.len();

        *self.write() = fresh;
        self.initialized.store(true, Ordering::Release);

        tracing::debug!(sites = count, "Site configuration cache reloaded");
        Ok(())
    }

    /// Perform the initial load if none has succeeded yet.
    ///
    /// Safe to call from many concurrent first requests: callers coalesce on
    /// an async mutex and re-check, so at most one repository fetch is in
    /// flight and later callers return without fetching.
    pub async fn ensure_initialized(&self) -> Result<(), LoadError> {
        if self.is_initialized() {
            return Ok(());
        }

        let _guard = self.load_guard.lock().await;
        if self.is_initialized() {
            return Ok(());
        }
        self.load_all().await
    }

    /// Whether the site's dashboard is publicly visible.
    pub fn is_public(&self, site_id: i64) -> bool {
        self.read().get(&site_id).is_some_and(|e| e.public)
    }

    /// Whether user identifiers must be salted for this site.
    pub fn should_salt_user_ids(&self, site_id: i64) -> bool {
        self.read().get(&site_id).is_some_and(|e| e.salt_user_ids)
    }

    /// Whether bot traffic should be dropped for this site.
    /// Unknown sites block bots (fail-safe).
    pub fn should_block_bots(&self, site_id: i64) -> bool {
        self.read().get(&site_id).is_none_or(|e| e.block_bots)
    }

    /// All domains configured for a site, in order.
    pub fn domains(&self, site_id: i64) -> Vec<String> {
        self.read()
            .get(&site_id)
            .map(|e| e.domains.clone())
            .unwrap_or_default()
    }

    /// The site's primary domain (first in the list), or empty if none.
    pub fn primary_domain(&self, site_id: i64) -> String {
        self.read()
            .get(&site_id)
            .and_then(|e| e.domains.first().cloned())
            .unwrap_or_default()
    }

    /// Whether the domain is in the site's domain list. Both sides are
    /// normalized, so full origins and bare domains compare equal.
    pub fn is_domain_allowed(&self, site_id: i64, domain: &str) -> bool {
        let needle = normalize_origin(domain);
        self.read().get(&site_id).is_some_and(|e| {
            e.domains.iter().any(|d| normalize_origin(d) == needle)
        })
    }

    /// Whether any site has this domain configured.
    pub fn is_domain_allowed_for_any_site(&self, domain: &str) -> bool {
        let needle = normalize_origin(domain);
        self.read().values().any(|e| {
            e.domains.iter().any(|d| normalize_origin(d) == needle)
        })
    }

    /// Replace or create a site's entry wholesale. Called by the
    /// site-creation write path after a successful database insert.
    pub fn insert(&self, site_id: i64, entry: SiteConfigEntry) {
        self.write().insert(site_id, entry);
    }

    /// Apply a partial update to a site's entry, creating it from defaults
    /// if absent. Called by administrative update paths after a successful
    /// database write.
    pub fn upsert(&self, site_id: i64, update: SiteConfigUpdate) {
        let mut entries = self.write();
        let entry = entries.entry(site_id).or_default();

        if let Some(public) = update.public {
            entry.public = public;
        }
        if let Some(salt_user_ids) = update.salt_user_ids {
            entry.salt_user_ids = salt_user_ids;
        }
        if let Some(block_bots) = update.block_bots {
            entry.block_bots = block_bots;
        }
        if let Some(domains) = update.domains {
            entry.domains = domains;
        }
    }

    /// Remove a site's entry. Lookups for the id fall back to defaults.
    pub fn remove(&self, site_id: i64) {
        self.write().remove(&site_id);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> HashMap<i64, SiteConfigEntry> {
        self.read().clone()
    }
}
