//! Admin API integration tests.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use common::{TestHarness, ADMIN, BUYER, OTHER};
use serde_json::{json, Value};

#[tokio::test]
async fn non_admin_is_forbidden() {
    let harness = TestHarness::new().await;

    let response = TestHarness::as_user(harness.server.get("/v1/admin/items"), BUYER).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "not_authorized");

    let response = TestHarness::as_user(harness.server.post("/v1/admin/balance"), BUYER)
        .json(&json!({ "user": BUYER, "delta": 1_000_000 }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(harness.balance(BUYER).await, 0);
}

#[tokio::test]
async fn platform_owner_is_admin() {
    let harness = TestHarness::new().await;

    let response = TestHarness::as_user(harness.server.get("/v1/admin/items"), OTHER)
        .add_header(
            HeaderName::from_static("x-platform-owner"),
            HeaderValue::from_static("true"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["items"], json!([]));
}

#[tokio::test]
async fn item_lifecycle() {
    let harness = TestHarness::new().await;
    let id = harness.create_item("Clip", 100, "clip.mp4").await;

    let updated = TestHarness::as_user(
        harness.server.put(&format!("/v1/admin/items/{id}")),
        ADMIN,
    )
    .json(&json!({
        "name": "Clip (remastered)",
        "price": 250,
        "reference": harness.asset_url("clip.mp4"),
    }))
    .await;
    updated.assert_status_ok();
    let item: Value = updated.json();
    assert_eq!(item["id"], id);
    assert_eq!(item["price"], 250);
    assert_eq!(item["filename"], "video.mp4");

    TestHarness::as_user(
        harness.server.delete(&format!("/v1/admin/items/{id}")),
        ADMIN,
    )
    .await
    .assert_status(StatusCode::NO_CONTENT);

    let again = TestHarness::as_user(
        harness.server.delete(&format!("/v1/admin/items/{id}")),
        ADMIN,
    )
    .await;
    again.assert_status_not_found();
    assert_eq!(again.json::<Value>()["error"]["code"], "record_not_found");
}

#[tokio::test]
async fn item_validation() {
    let harness = TestHarness::new().await;

    let bad_reference = TestHarness::as_user(harness.server.post("/v1/admin/items"), ADMIN)
        .json(&json!({ "name": "Clip", "price": 100, "reference": "ftp://example.com/a.mp4" }))
        .await;
    bad_reference.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        bad_reference.json::<Value>()["error"]["code"],
        "invalid_reference"
    );

    let negative = TestHarness::as_user(harness.server.post("/v1/admin/items"), ADMIN)
        .json(&json!({
            "name": "Clip",
            "price": -1,
            "reference": harness.asset_url("clip.mp4"),
        }))
        .await;
    negative.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(negative.json::<Value>()["error"]["code"], "invalid_amount");
}

#[tokio::test]
async fn adjustment_accepts_decimal_and_negative_deltas() {
    let harness = TestHarness::new().await;

    let response = TestHarness::as_user(harness.server.post("/v1/admin/balance"), ADMIN)
        .json(&json!({ "user": BUYER, "delta": "12.50" }))
        .await;
    response.assert_status_ok();
    assert_eq!(harness.balance(BUYER).await, 1_250);

    TestHarness::as_user(harness.server.post("/v1/admin/balance"), ADMIN)
        .json(&json!({ "user": BUYER, "delta": -250, "reason": "correction" }))
        .await
        .assert_status_ok();
    assert_eq!(harness.balance(BUYER).await, 1_000);

    let zero = TestHarness::as_user(harness.server.post("/v1/admin/balance"), ADMIN)
        .json(&json!({ "user": BUYER, "delta": 0 }))
        .await;
    zero.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.balance(BUYER).await, 1_000);
}

#[tokio::test]
async fn scoped_settings_need_scope_and_known_key() {
    let harness = TestHarness::new().await;

    let no_scope = TestHarness::as_user(
        harness.server.put("/v1/admin/settings/delivery_channel"),
        ADMIN,
    )
    .json(&json!({ "value": "123" }))
    .await;
    no_scope.assert_status(StatusCode::BAD_REQUEST);

    let unknown = TestHarness::in_scope(harness.server.put("/v1/admin/settings/colour"), ADMIN)
        .json(&json!({ "value": "blue" }))
        .await;
    unknown.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(unknown.json::<Value>()["error"]["code"], "invalid_setting");

    TestHarness::in_scope(
        harness.server.put("/v1/admin/settings/delivery_channel"),
        ADMIN,
    )
    .json(&json!({ "value": null }))
    .await
    .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn grant_and_revoke() {
    let harness = TestHarness::new().await;

    let granted = TestHarness::as_user(
        harness.server.put(&format!("/v1/admin/admins/{}", OTHER.get())),
        ADMIN,
    )
    .await;
    granted.assert_status_ok();
    assert_eq!(granted.json::<Value>()["changed"], true);

    let listing = TestHarness::as_user(harness.server.get("/v1/admin/admins"), OTHER).await;
    listing.assert_status_ok();
    assert_eq!(listing.json::<Value>()["admins"], json!([OTHER.get()]));

    let revoked = TestHarness::as_user(
        harness.server.delete(&format!("/v1/admin/admins/{}", OTHER.get())),
        ADMIN,
    )
    .await;
    revoked.assert_status_ok();
    assert_eq!(revoked.json::<Value>()["changed"], true);

    TestHarness::as_user(harness.server.get("/v1/admin/admins"), OTHER)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn settled_purchases_are_not_pending() {
    let harness = TestHarness::new().await;
    let item = harness.create_item("Clip", 100, "clip.mp4").await;
    harness.fund(BUYER, 100).await;

    let purchase = TestHarness::as_user(harness.server.post("/v1/purchases"), BUYER)
        .json(&json!({ "item_id": item }))
        .await;
    purchase.assert_status_ok();
    let purchase_id = purchase.json::<Value>()["purchase"]["id"]
        .as_i64()
        .unwrap();

    let pending = TestHarness::as_user(
        harness
            .server
            .get("/v1/admin/purchases/pending?older_than_minutes=0"),
        ADMIN,
    )
    .await;
    pending.assert_status_ok();
    assert_eq!(pending.json::<Value>()["purchases"], json!([]));

    let refund = TestHarness::as_user(
        harness
            .server
            .post(&format!("/v1/admin/purchases/{purchase_id}/refund")),
        ADMIN,
    )
    .await;
    refund.assert_status_not_found();
    assert_eq!(harness.balance(BUYER).await, 0);
}
