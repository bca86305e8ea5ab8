//! Admin handlers.
//!
//! Authorization happens in the shop: every call is made with the caller as
//! the acting admin and fails with 403 if they are not one.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidshop_core::{Item, ItemId, ItemInput, PurchaseId, PurchaseRecord, UserId};
use vidshop_shop::{AdjustRequest, AdjustmentReceipt, RefundReceipt};

use super::AmountInput;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// Default age before a pending purchase is listed as stuck.
const DEFAULT_PENDING_MINUTES: i64 = 10;

/// Largest accepted pending age (one year).
const MAX_PENDING_MINUTES: i64 = 60 * 24 * 365;

/// Item listing for admins, including unlisted items.
#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    /// Every item.
    pub items: Vec<Item>,
}

/// Body of `POST /v1/admin/items/{id}/active`.
#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    /// Whether the item is listed.
    pub active: bool,
}

/// Body of `POST /v1/admin/balance`.
#[derive(Debug, Deserialize)]
pub struct AdjustBody {
    /// Account to change.
    pub user: UserId,
    /// Signed change.
    pub delta: AmountInput,
    /// Why the balance changed.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /v1/admin/shop`.
#[derive(Debug, Deserialize)]
pub struct ShopOpenBody {
    /// Whether purchases are accepted.
    pub open: bool,
}

/// Body of `PUT /v1/admin/settings/{key}`.
#[derive(Debug, Deserialize)]
pub struct SettingBody {
    /// New value; `null` or empty clears the setting.
    #[serde(default)]
    pub value: Option<String>,
}

/// Result of a grant or revoke.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    /// Affected user.
    pub user_id: UserId,
    /// Whether anything changed.
    pub changed: bool,
}

/// Stored admin grants.
#[derive(Debug, Serialize)]
pub struct AdminsResponse {
    /// Users holding a grant.
    pub admins: Vec<UserId>,
}

/// `?older_than_minutes=` for the pending purchase listing.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    /// Only list purchases pending for at least this long.
    pub older_than_minutes: Option<i64>,
}

/// Pending purchase listing.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    /// Purchases debited but never committed or refunded.
    pub purchases: Vec<PurchaseRecord>,
}

// ============================================================================
// Catalog
// ============================================================================

/// List every item.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<ItemsResponse>, ApiError> {
    let items = state.shop.admin_list_items(&caller.actor()).await?;
    Ok(Json(ItemsResponse { items }))
}

/// Create an item.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<ItemInput>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = state
        .shop
        .admin_upsert_item(&caller.actor(), None, body)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace an existing item.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<ItemInput>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .shop
        .admin_upsert_item(&caller.actor(), Some(ItemId::new(id)), body)
        .await?;
    Ok(Json(item))
}

/// List or unlist an item.
pub async fn set_item_active(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<ActiveBody>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .shop
        .admin_set_active(&caller.actor(), ItemId::new(id), body.active)
        .await?;
    Ok(Json(item))
}

/// Delete an item.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .admin_delete_item(&caller.actor(), ItemId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Balances & purchases
// ============================================================================

/// Adjust a user's balance.
pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<AdjustBody>,
) -> Result<Json<AdjustmentReceipt>, ApiError> {
    let delta = body.delta.to_minor()?;

    let receipt = state
        .shop
        .admin_adjust_balance(
            &caller.actor(),
            AdjustRequest {
                user: body.user,
                delta,
                reason: body.reason,
                scope: caller.scope,
            },
        )
        .await?;

    Ok(Json(receipt))
}

/// List purchases stuck in `pending`.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<PendingQuery>,
) -> Result<Json<PendingResponse>, ApiError> {
    let minutes = query
        .older_than_minutes
        .unwrap_or(DEFAULT_PENDING_MINUTES)
        .clamp(0, MAX_PENDING_MINUTES);
    let older_than = Utc::now() - chrono::Duration::minutes(minutes);

    let purchases = state
        .shop
        .admin_list_pending(&caller.actor(), older_than)
        .await?;
    Ok(Json(PendingResponse { purchases }))
}

/// Refund a pending purchase.
pub async fn refund_purchase(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<RefundReceipt>, ApiError> {
    let receipt = state
        .shop
        .admin_refund_purchase(&caller.actor(), PurchaseId::new(id), caller.scope)
        .await?;
    Ok(Json(receipt))
}

// ============================================================================
// Settings & grants
// ============================================================================

/// Open or close the shop.
pub async fn set_shop_open(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<ShopOpenBody>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .admin_set_shop_open(&caller.actor(), body.open)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear a setting for the caller's scope.
pub async fn set_scoped_setting(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(key): Path<String>,
    Json(body): Json<SettingBody>,
) -> Result<StatusCode, ApiError> {
    let scope = caller.require_scope()?;
    state
        .shop
        .admin_set_scoped_setting(&caller.actor(), scope, &key, body.value.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List stored admin grants.
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<AdminsResponse>, ApiError> {
    let admins = state.shop.admin_list_admins(&caller.actor()).await?;
    Ok(Json(AdminsResponse { admins }))
}

/// Grant admin to a user.
pub async fn grant_admin(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user): Path<i64>,
) -> Result<Json<GrantResponse>, ApiError> {
    let user_id = UserId::new(user);
    let changed = state.shop.admin_grant(&caller.actor(), user_id).await?;
    Ok(Json(GrantResponse { user_id, changed }))
}

/// Revoke a user's stored admin grant.
pub async fn revoke_admin(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user): Path<i64>,
) -> Result<Json<GrantResponse>, ApiError> {
    let user_id = UserId::new(user);
    let changed = state.shop.admin_revoke(&caller.actor(), user_id).await?;
    Ok(Json(GrantResponse { user_id, changed }))
}
