//! Application state shared across handlers.

use std::sync::Arc;
use waypost_admission::{LoadError, OriginAllowList, SiteConfigCache};
use waypost_core::config::AppConfig;
use waypost_metadata::MetadataStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Site metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Per-site policy cache consulted on the ingestion path.
    pub sites: Arc<SiteConfigCache>,
    /// Origin allow list consulted by CORS and the tracking handler.
    pub origins: Arc<OriginAllowList>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The cache and allow list start from built-in defaults; call
    /// [`refresh`](Self::refresh) (or let the first tracking request run
    /// `ensure_initialized`) to populate them from the store.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> Result<Self, LoadError> {
        let sites = Arc::new(SiteConfigCache::new(metadata.clone()));
        let origins = Arc::new(OriginAllowList::new(&config.server, metadata.clone())?);

        Ok(Self {
            config: Arc::new(config),
            metadata,
            sites,
            origins,
        })
    }

    /// Reload the site cache and the origin allow list from the store.
    /// The first failure is returned; the components keep their last-good
    /// state either way.
    pub async fn refresh(&self) -> Result<(), LoadError> {
        self.sites.load_all().await?;
        self.origins.refresh().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypost_metadata::SqliteStore;
    use waypost_metadata::models::NewSite;
    use tempfile::tempdir;

    async fn build_state() -> (tempfile::TempDir, AppState) {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::new(&db_path).await.unwrap());

        let state = AppState::new(AppConfig::for_testing(), metadata).unwrap();
        (temp, state)
    }

    #[tokio::test]
    async fn refresh_populates_cache_and_allow_list() {
        let (_temp, state) = build_state().await;

        let site = state
            .metadata
            .create_site(&NewSite {
                name: "shop".to_string(),
                public: true,
                domains: vec!["shop.example.org".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!state.sites.is_initialized());
        state.refresh().await.unwrap();

        assert!(state.sites.is_initialized());
        assert!(state.sites.is_public(site.site_id));
        assert!(state.origins.is_allowed("https://shop.example.org"));
    }

    #[tokio::test]
    async fn new_rejects_base_url_without_host() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::new(&db_path).await.unwrap());

        let mut config = AppConfig::for_testing();
        config.server.base_url = "https://".to_string();

        assert!(AppState::new(config, metadata).is_err());
    }
}
