//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let origins = state.origins.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts| {
                origin
                    .to_str()
                    .map(|origin| origins.is_allowed(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Ingestion
        .route("/api/track", post(handlers::track_event))
        // Health check (intentionally unauthenticated for probes)
        .route("/api/health", get(handlers::health_check))
        // Site administration
        .route(
            "/api/sites",
            post(handlers::create_site).get(handlers::list_sites),
        )
        .route(
            "/api/sites/{site_id}",
            get(handlers::get_site)
                .put(handlers::update_site)
                .delete(handlers::delete_site),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
