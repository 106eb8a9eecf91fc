//! Site administration handlers.
//!
//! Every successful write goes to the repository first, then updates the
//! in-memory cache in place and refreshes the origin allow list when the
//! domain set changed. A failed allow-list refresh is logged, not surfaced:
//! the database write already succeeded and the periodic refresh converges.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use waypost_admission::{SiteConfigEntry, SiteConfigUpdate};
use waypost_core::validate_domain;
use waypost_metadata::models::{NewSite, SiteRow};

/// Request body for creating a site.
#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub salt_user_ids: bool,
    #[serde(default = "default_block_bots")]
    pub block_bots: bool,
    #[serde(default)]
    pub domains: Vec<String>,
}

fn default_block_bots() -> bool {
    true
}

/// Request body for updating a site. Absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub name: Option<String>,
    pub public: Option<bool>,
    pub salt_user_ids: Option<bool>,
    pub block_bots: Option<bool>,
    pub domains: Option<Vec<String>>,
}

/// Site response.
#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub site_id: i64,
    pub name: String,
    pub public: bool,
    pub salt_user_ids: bool,
    pub block_bots: bool,
    pub domains: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// List sites response.
#[derive(Debug, Serialize)]
pub struct ListSitesResponse {
    pub sites: Vec<SiteResponse>,
}

fn site_row_to_response(row: SiteRow) -> ApiResult<SiteResponse> {
    let created_at = row
        .created_at
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))?;
    let updated_at = row
        .updated_at
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))?;

    Ok(SiteResponse {
        site_id: row.site_id,
        name: row.name.clone(),
        public: row.public,
        salt_user_ids: row.salt_user_ids,
        block_bots: row.block_bots,
        domains: row.domain_list(),
        created_at,
        updated_at,
    })
}

/// Validate site name format.
fn validate_site_name(name: &str) -> ApiResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > 128 {
        return Err(ApiError::BadRequest(
            "site name must be 1-128 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_domains(domains: &[String]) -> ApiResult<()> {
    for domain in domains {
        validate_domain(domain)?;
    }
    Ok(())
}

/// Refresh the allow list after a domain change; log on failure.
async fn refresh_origins(state: &AppState) {
    if let Err(e) = state.origins.refresh().await {
        tracing::warn!(error = %e, "Origin allow list refresh after site write failed");
    }
}

/// POST /api/sites - Create a new site.
pub async fn create_site(
    State(state): State<AppState>,
    Json(body): Json<CreateSiteRequest>,
) -> ApiResult<(StatusCode, Json<SiteResponse>)> {
    validate_site_name(&body.name)?;
    validate_domains(&body.domains)?;

    let row = state
        .metadata
        .create_site(&NewSite {
            name: body.name.trim().to_string(),
            public: body.public,
            salt_user_ids: body.salt_user_ids,
            block_bots: body.block_bots,
            domains: body.domains,
        })
        .await?;

    state.sites.insert(row.site_id, SiteConfigEntry::from(&row));
    if !row.domain_list().is_empty() {
        refresh_origins(&state).await;
    }

    tracing::info!(site_id = row.site_id, name = %row.name, "Site created");

    Ok((StatusCode::CREATED, Json(site_row_to_response(row)?)))
}

/// GET /api/sites - List all sites.
pub async fn list_sites(State(state): State<AppState>) -> ApiResult<Json<ListSitesResponse>> {
    let sites = state
        .metadata
        .list_sites()
        .await?
        .into_iter()
        .map(site_row_to_response)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(ListSitesResponse { sites }))
}

/// GET /api/sites/{site_id} - Get a site by id.
pub async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> ApiResult<Json<SiteResponse>> {
    let row = state
        .metadata
        .get_site(site_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("site not found".to_string()))?;

    Ok(Json(site_row_to_response(row)?))
}

/// PUT /api/sites/{site_id} - Update a site.
pub async fn update_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Json(body): Json<UpdateSiteRequest>,
) -> ApiResult<Json<SiteResponse>> {
    if let Some(name) = &body.name {
        validate_site_name(name)?;
    }
    if let Some(domains) = &body.domains {
        validate_domains(domains)?;
    }

    let mut row = state
        .metadata
        .get_site(site_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("site not found".to_string()))?;

    let domains_changed = body
        .domains
        .as_ref()
        .is_some_and(|domains| *domains != row.domain_list());

    if let Some(name) = body.name {
        row.name = name.trim().to_string();
    }
    if let Some(public) = body.public {
        row.public = public;
    }
    if let Some(salt_user_ids) = body.salt_user_ids {
        row.salt_user_ids = salt_user_ids;
    }
    if let Some(block_bots) = body.block_bots {
        row.block_bots = block_bots;
    }
    if let Some(domains) = &body.domains {
        row.domains = SiteRow::encode_domains(domains);
    }
    row.updated_at = OffsetDateTime::now_utc();

    state.metadata.update_site(&row).await?;

    state.sites.upsert(
        site_id,
        SiteConfigUpdate {
            public: body.public,
            salt_user_ids: body.salt_user_ids,
            block_bots: body.block_bots,
            domains: body.domains,
        },
    );
    if domains_changed {
        refresh_origins(&state).await;
    }

    Ok(Json(site_row_to_response(row)?))
}

/// DELETE /api/sites/{site_id} - Delete a site.
pub async fn delete_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.metadata.delete_site(site_id).await?;

    state.sites.remove(site_id);
    refresh_origins(&state).await;

    tracing::info!(site_id, "Site deleted");

    Ok(StatusCode::NO_CONTENT)
}
