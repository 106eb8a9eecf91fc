//! Server test utilities.

use std::sync::Arc;
use tempfile::TempDir;
use waypost_core::config::{AppConfig, MetadataConfig};
use waypost_metadata::models::{NewSite, SiteRow};
use waypost_metadata::{MetadataStore, SqliteStore};
use waypost_server::{AppState, create_router};

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with a temporary SQLite store.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig::for_testing();
        config.metadata = MetadataConfig::Sqlite { path: db_path };
        modifier(&mut config);

        let state = AppState::new(config, metadata).expect("Failed to build server state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata store.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Insert a site directly into the store, bypassing the HTTP surface.
    /// The cache and allow list only see it after a load/refresh.
    pub async fn seed_site(
        &self,
        name: &str,
        public: bool,
        salt_user_ids: bool,
        block_bots: bool,
        domains: &[&str],
    ) -> SiteRow {
        self.metadata()
            .create_site(&NewSite {
                name: name.to_string(),
                public,
                salt_user_ids,
                block_bots,
                domains: domains.iter().map(|d| d.to_string()).collect(),
            })
            .await
            .expect("Failed to seed site")
    }
}
