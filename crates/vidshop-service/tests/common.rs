//! Common test utilities for vidshop service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use vidshop_core::{ScopeId, UserId};
use vidshop_service::{create_router, AppState, ServiceConfig};

/// API key the harness is configured with.
pub const API_KEY: &str = "test-service-key";

/// Secret the relay requests are signed with.
pub const RELAY_SECRET: &str = "relay-secret";

/// User in the static admin list.
pub const ADMIN: UserId = UserId::new(1);

/// An ordinary buyer.
pub const BUYER: UserId = UserId::new(1001);

/// Another ordinary user.
pub const OTHER: UserId = UserId::new(1002);

/// Community scope used by scoped requests.
pub const SCOPE: ScopeId = ScopeId::new(500);

/// Bytes served for `/clip.mp4` on the asset host.
pub const CLIP: &[u8] = b"not really an mp4 but close enough";

/// Delivery limit the harness is configured with.
pub const MAX_UPLOAD_BYTES: u64 = 1024;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Stand-in for the chat relay.
    pub relay: MockServer,
    /// Stand-in for the remote asset host.
    pub source: MockServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// A harness whose relay accepts everything.
    pub async fn new() -> Self {
        Self::with_relay_status(200).await
    }

    /// A harness whose relay answers every request with `status`.
    pub async fn with_relay_status(status: u16) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let relay = MockServer::start().await;
        let source = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&relay)
            .await;

        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(CLIP),
            )
            .mount(&source)
            .await;

        Mock::given(method("GET"))
            .and(path("/big.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(vec![0u8; 4096]),
            )
            .mount(&source)
            .await;

        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&source)
            .await;

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            db_path: temp_dir
                .path()
                .join("vidshop.db")
                .to_string_lossy()
                .to_string(),
            service_api_key: Some(API_KEY.into()),
            admin_user_ids: vec![ADMIN],
            fetch_deadline_seconds: 5,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            relay_url: Some(relay.uri()),
            relay_secret: Some(RELAY_SECRET.into()),
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::from_config(config)
            .await
            .expect("Failed to build app state");
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            relay,
            source,
            _temp_dir: temp_dir,
        }
    }

    /// URL of a file on the asset host.
    pub fn asset_url(&self, file: &str) -> String {
        format!("{}/{file}", self.source.uri())
    }

    /// Attach service credentials acting as `user`.
    pub fn as_user(request: TestRequest, user: UserId) -> TestRequest {
        request
            .add_header(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_static(API_KEY),
            )
            .add_header(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from(user.get()),
            )
    }

    /// Attach service credentials acting as `user` within `SCOPE`.
    pub fn in_scope(request: TestRequest, user: UserId) -> TestRequest {
        Self::as_user(request, user).add_header(
            HeaderName::from_static("x-scope-id"),
            HeaderValue::from(SCOPE.get()),
        )
    }

    /// Create an item as the admin and return its ID.
    pub async fn create_item(&self, name: &str, price: i64, file: &str) -> i64 {
        let response = Self::as_user(self.server.post("/v1/admin/items"), ADMIN)
            .json(&json!({
                "name": name,
                "price": price,
                "reference": self.asset_url(file),
                "filename": file,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"]
            .as_i64()
            .expect("item id in response")
    }

    /// Credit `user` as the admin.
    pub async fn fund(&self, user: UserId, amount: i64) {
        Self::as_user(self.server.post("/v1/admin/balance"), ADMIN)
            .json(&json!({ "user": user, "delta": amount, "reason": "test funding" }))
            .await
            .assert_status_ok();
    }

    /// The caller's balance as reported by the API.
    pub async fn balance(&self, user: UserId) -> i64 {
        let response = Self::as_user(self.server.get("/v1/balance"), user).await;
        response.assert_status_ok();
        response.json::<Value>()["balance"]
            .as_i64()
            .expect("balance in response")
    }

    /// Requests the relay received at `route`.
    pub async fn relay_requests(&self, route: &str) -> Vec<Request> {
        self.relay
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .collect()
    }
}

/// Pull the JSON envelope part out of a multipart delivery body.
pub fn delivery_envelope(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let start = text
        .find("{\"destination\"")
        .expect("envelope part in delivery");
    let len = text[start..]
        .find("\r\n--")
        .expect("envelope part terminator");
    text[start..start + len].to_string()
}
