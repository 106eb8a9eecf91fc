//! Ingestion admission handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use serde::{Deserialize, Serialize};

/// Tracking event payload. Only the fields admission consults are modeled;
/// everything else rides along as opaque properties.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub site_id: i64,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub pathname: Option<String>,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

/// Admission verdict for a tracking event.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub status: &'static str,
    /// Whether the site's dashboard is publicly visible.
    pub public: bool,
    /// Whether the pipeline must salt user identifiers for this event.
    pub salt_user_ids: bool,
}

/// POST /api/track - Admit or reject a tracking event.
///
/// Rejections are limited to disallowed origins (403). Bot traffic for
/// sites that block bots is answered with 202 and silently dropped, so
/// crawlers get no signal that they were filtered.
pub async fn track_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TrackRequest>,
) -> ApiResult<(StatusCode, Json<TrackResponse>)> {
    if let Err(e) = state.sites.ensure_initialized().await {
        // Lookups fall back to fail-safe defaults, so keep serving.
        tracing::warn!(error = %e, "Site cache initialization failed, using defaults");
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !state.origins.is_allowed(origin) {
        return Err(ApiError::OriginNotAllowed(origin.to_string()));
    }

    if state.sites.should_block_bots(body.site_id) {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if is_bot_user_agent(user_agent) {
            tracing::debug!(site_id = body.site_id, "Dropped bot tracking event");
            return Ok((
                StatusCode::ACCEPTED,
                Json(TrackResponse {
                    status: "dropped",
                    public: false,
                    salt_user_ids: false,
                }),
            ));
        }
    }

    Ok((
        StatusCode::OK,
        Json(TrackResponse {
            status: "accepted",
            public: state.sites.is_public(body.site_id),
            salt_user_ids: state.sites.should_salt_user_ids(body.site_id),
        }),
    ))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the site cache has completed at least one bulk load.
    pub initialized: bool,
}

/// GET /api/health - Health check.
///
/// Unauthenticated so load balancers and orchestration probes can reach it.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        initialized: state.sites.is_initialized(),
    }))
}

/// Conservative bot detection over the User-Agent header. An absent or
/// empty header counts as a bot; browsers always send one.
fn is_bot_user_agent(user_agent: &str) -> bool {
    if user_agent.trim().is_empty() {
        return true;
    }
    let ua = user_agent.to_ascii_lowercase();
    ["bot", "crawler", "spider", "headless"]
        .iter()
        .any(|marker| ua.contains(marker))
}
