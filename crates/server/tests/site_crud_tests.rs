//! Integration tests for site CRUD operations.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use serde_json::json;

// Helper to make JSON requests (duplicated for test isolation)
async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, body_json)
}

#[tokio::test]
async fn test_create_site_with_valid_data() {
    let server = TestServer::new().await;

    let body = json!({
        "name": "my-shop",
        "public": true,
        "domains": ["shop.example.org", "www.shop.example.org"]
    });

    let (status, response) = json_request(&server.router, "POST", "/api/sites", Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(response.get("site_id").is_some());
    assert_eq!(response.get("name").and_then(|v| v.as_str()), Some("my-shop"));
    assert_eq!(response.get("public").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        response.get("block_bots").and_then(|v| v.as_bool()),
        Some(true),
        "block_bots defaults on"
    );
    assert_eq!(
        response.get("domains").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
}

#[tokio::test]
async fn test_create_site_updates_cache_and_allow_list() {
    let server = TestServer::new().await;

    let body = json!({
        "name": "my-shop",
        "public": true,
        "domains": ["shop.example.org"]
    });

    let (status, response) = json_request(&server.router, "POST", "/api/sites", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let site_id = response.get("site_id").and_then(|v| v.as_i64()).unwrap();
    assert!(server.state.sites.is_public(site_id));
    assert!(server.state.origins.is_allowed("https://shop.example.org"));
}

#[tokio::test]
async fn test_create_site_rejects_invalid_domain() {
    let server = TestServer::new().await;

    for domains in [json!(["not a domain"]), json!(["a.com/path"]), json!([""])] {
        let body = json!({ "name": "my-shop", "domains": domains.clone() });
        let (status, _) = json_request(&server.router, "POST", "/api/sites", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "domains: {domains}");
    }
}

#[tokio::test]
async fn test_create_site_rejects_empty_name() {
    let server = TestServer::new().await;

    let body = json!({ "name": "   " });
    let (status, response) = json_request(&server.router, "POST", "/api/sites", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.get("code").and_then(|v| v.as_str()),
        Some("bad_request")
    );
}

#[tokio::test]
async fn test_get_site_not_found() {
    let server = TestServer::new().await;

    let (status, response) = json_request(&server.router, "GET", "/api/sites/9999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.get("code").and_then(|v| v.as_str()),
        Some("not_found")
    );
}

#[tokio::test]
async fn test_list_sites_returns_all() {
    let server = TestServer::new().await;
    server.seed_site("one", false, false, true, &["a.com"]).await;
    server.seed_site("two", true, false, true, &[]).await;

    let (status, response) = json_request(&server.router, "GET", "/api/sites", None).await;

    assert_eq!(status, StatusCode::OK);
    let sites = response.get("sites").and_then(|v| v.as_array()).unwrap();
    assert_eq!(sites.len(), 2);
}

#[tokio::test]
async fn test_update_site_applies_partial_changes() {
    let server = TestServer::new().await;
    let site = server.seed_site("shop", false, false, true, &["a.com"]).await;
    server.state.refresh().await.unwrap();

    let body = json!({ "public": true, "block_bots": false });
    let (status, response) = json_request(
        &server.router,
        "PUT",
        &format!("/api/sites/{}", site.site_id),
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.get("public").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        response.get("block_bots").and_then(|v| v.as_bool()),
        Some(false)
    );
    // Untouched fields survive.
    assert_eq!(response.get("name").and_then(|v| v.as_str()), Some("shop"));

    // Cache reflects the write without a reload.
    assert!(server.state.sites.is_public(site.site_id));
    assert!(!server.state.sites.should_block_bots(site.site_id));
}

#[tokio::test]
async fn test_update_site_domains_refreshes_allow_list() {
    let server = TestServer::new().await;
    let site = server.seed_site("shop", false, false, true, &["a.com"]).await;
    server.state.refresh().await.unwrap();
    assert!(server.state.origins.is_allowed("https://a.com"));

    let body = json!({ "domains": ["b.com"] });
    let (status, _) = json_request(
        &server.router,
        "PUT",
        &format!("/api/sites/{}", site.site_id),
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!server.state.origins.is_allowed("https://a.com"));
    assert!(server.state.origins.is_allowed("https://b.com"));
    assert!(server.state.sites.is_domain_allowed(site.site_id, "b.com"));
}

#[tokio::test]
async fn test_update_missing_site_not_found() {
    let server = TestServer::new().await;

    let body = json!({ "public": true });
    let (status, _) = json_request(&server.router, "PUT", "/api/sites/123", Some(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_site_removes_everywhere() {
    let server = TestServer::new().await;
    let site = server.seed_site("shop", true, false, true, &["a.com"]).await;
    server.state.refresh().await.unwrap();
    assert!(server.state.sites.is_public(site.site_id));

    let (status, _) = json_request(
        &server.router,
        "DELETE",
        &format!("/api/sites/{}", site.site_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Cache falls back to defaults, allow list drops the domain.
    assert!(!server.state.sites.is_public(site.site_id));
    assert!(!server.state.origins.is_allowed("https://a.com"));

    let (status, _) = json_request(
        &server.router,
        "DELETE",
        &format!("/api/sites/{}", site.site_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
