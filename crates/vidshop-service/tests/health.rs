//! Health and authentication integration tests.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use common::{TestHarness, ADMIN, BUYER};
use serde_json::{json, Value};
use vidshop_core::ScopeId;
use vidshop_fetch::HttpFetcher;
use vidshop_service::relay::UnconfiguredDelivery;
use vidshop_service::{create_router, AppState, ServiceConfig};
use vidshop_shop::Shop;
use vidshop_store::{Result, SettingsStore, SqliteStore, StoreError};

/// Settings store whose database is gone.
struct UnreachableSettings;

fn unreachable() -> StoreError {
    StoreError::Database("unable to open database file".into())
}

#[async_trait]
impl SettingsStore for UnreachableSettings {
    async fn get_setting(&self, _key: &str) -> Result<Option<String>> {
        Err(unreachable())
    }

    async fn set_setting(&self, _key: &str, _value: &str) -> Result<()> {
        Err(unreachable())
    }

    async fn get_scoped(&self, _scope: ScopeId, _key: &str) -> Result<Option<String>> {
        Err(unreachable())
    }

    async fn set_scoped(&self, _scope: ScopeId, _key: &str, _value: &str) -> Result<()> {
        Err(unreachable())
    }

    async fn clear_scoped(&self, _scope: ScopeId, _key: &str) -> Result<bool> {
        Err(unreachable())
    }
}

#[tokio::test]
async fn health_reports_shop_state() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vidshop");
    assert_eq!(body["shop_open"], true);
    assert_eq!(body["relay_configured"], true);

    TestHarness::as_user(harness.server.post("/v1/admin/shop"), ADMIN)
        .json(&json!({ "open": false }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = harness.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["shop_open"], false);
}

#[tokio::test]
async fn health_is_degraded_when_store_is_unreadable() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let config = ServiceConfig::default();
    let shop = Shop::new(
        store,
        Arc::new(HttpFetcher::new().unwrap()),
        Arc::new(UnconfiguredDelivery::new(config.max_upload_bytes)),
        config.shop_config(),
    )
    .with_settings(Arc::new(UnreachableSettings));
    let server = TestServer::new(create_router(AppState::new(shop, config))).unwrap();

    let response = server.get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["relay_configured"], false);
    assert!(body.get("shop_open").is_none());
}

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/v1/catalog").await;

    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_is_unauthorized() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/v1/catalog")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("wrong-key"),
        )
        .add_header(HeaderName::from_static("x-user-id"), HeaderValue::from(1001))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn missing_or_bad_user_id_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/v1/balance")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(common::API_KEY),
        )
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .get("/v1/balance")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(common::API_KEY),
        )
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static("someone"),
        )
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn new_user_starts_at_zero() {
    let harness = TestHarness::new().await;

    let response = TestHarness::as_user(harness.server.get("/v1/balance"), BUYER).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user_id"], BUYER.get());
    assert_eq!(body["balance"], 0);
    assert_eq!(body["display"], "0.00");
}
