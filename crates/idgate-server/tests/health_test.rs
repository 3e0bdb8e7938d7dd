mod common;

use common::*;
use serde_json::Value;

#[tokio::test]
async fn test_health() {
    let app = test_app();

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_ready_lists_configured_providers() {
    let app = build_app(test_config(&[], &["CRIIPTO_DOMAIN"]), false);

    let response = app.server.get("/ready").await;

    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["providers"], serde_json::json!(["vipps"]));
    assert_eq!(body["email"], false);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = test_app();

    let response = app
        .server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static("req-123"),
        )
        .await;

    assert_eq!(response.headers()["x-request-id"], "req-123");
}
