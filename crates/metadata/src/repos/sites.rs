//! Site repository trait.

use crate::error::MetadataResult;
use crate::models::{NewSite, SiteRow};
use async_trait::async_trait;

/// Repository for tenant site management.
#[async_trait]
pub trait SiteRepo: Send + Sync {
    /// Create a new site. The repository assigns the site id.
    async fn create_site(&self, site: &NewSite) -> MetadataResult<SiteRow>;

    /// Get a site by ID.
    async fn get_site(&self, site_id: i64) -> MetadataResult<Option<SiteRow>>;

    /// List all sites. Used by the admission cache's bulk load.
    async fn list_sites(&self) -> MetadataResult<Vec<SiteRow>>;

    /// Update an existing site.
    async fn update_site(&self, site: &SiteRow) -> MetadataResult<()>;

    /// Delete a site by ID.
    async fn delete_site(&self, site_id: i64) -> MetadataResult<()>;
}
