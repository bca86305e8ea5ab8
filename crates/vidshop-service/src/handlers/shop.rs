//! Buyer-facing handlers: catalog, balance, history, purchases and transfers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vidshop_core::{
    format_amount, Destination, Item, ItemId, PurchaseRecord, TransferRecord, UserId,
};
use vidshop_shop::{PurchaseReceipt, PurchaseRequest, Quote, TransferRequest};

use super::{AmountInput, LimitQuery};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// Catalog listing.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// Items currently for sale.
    pub items: Vec<Item>,
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Account owner.
    pub user_id: UserId,
    /// Balance in minor units.
    pub balance: i64,
    /// Balance formatted in major units.
    pub display: String,
}

/// Purchase history response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Purchases, newest first.
    pub purchases: Vec<PurchaseRecord>,
}

/// Transfer history response.
#[derive(Debug, Serialize)]
pub struct TransfersResponse {
    /// Transfers sent or received, newest first.
    pub transfers: Vec<TransferRecord>,
}

/// Body of `POST /v1/quote`.
#[derive(Debug, Deserialize)]
pub struct QuoteBody {
    /// Item to quote.
    pub item_id: ItemId,
}

/// Body of `POST /v1/purchases`.
#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
    /// Item to buy.
    pub item_id: ItemId,
    /// Where to deliver; defaults to the scope's delivery channel or a DM.
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Body of `POST /v1/transfers`.
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    /// Receiving user.
    pub receiver: UserId,
    /// Amount to send.
    pub amount: AmountInput,
}

/// Transfer response.
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    /// The applied transfer.
    pub transfer: TransferRecord,
    /// Sender's balance afterwards.
    pub balance: i64,
}

/// List items for sale.
pub async fn list_catalog(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
) -> Result<Json<CatalogResponse>, ApiError> {
    let items = state.shop.list_catalog().await?;
    Ok(Json(CatalogResponse { items }))
}

/// The caller's balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.shop.get_balance(caller.user).await?;
    Ok(Json(BalanceResponse {
        user_id: caller.user,
        balance,
        display: format_amount(balance),
    }))
}

/// The caller's purchases.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<LimitQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let purchases = state.shop.get_history(caller.user, query.limit).await?;
    Ok(Json(HistoryResponse { purchases }))
}

/// The caller's transfers.
pub async fn get_transfers(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<LimitQuery>,
) -> Result<Json<TransfersResponse>, ApiError> {
    let transfers = state.shop.get_transfers(caller.user, query.limit).await?;
    Ok(Json(TransfersResponse { transfers }))
}

/// Check whether the caller could buy an item right now.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<QuoteBody>,
) -> Result<Json<Quote>, ApiError> {
    Ok(Json(state.shop.quote(caller.user, body.item_id).await?))
}

/// Buy and deliver an item.
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<PurchaseBody>,
) -> Result<Json<PurchaseReceipt>, ApiError> {
    tracing::debug!(
        user_id = %caller.user,
        item_id = %body.item_id,
        scope = ?caller.scope,
        "Processing purchase"
    );

    let receipt = state
        .shop
        .purchase(PurchaseRequest {
            buyer: caller.user,
            item_id: body.item_id,
            destination: body.destination,
            scope: caller.scope,
        })
        .await?;

    Ok(Json(receipt))
}

/// Send funds to another user.
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<TransferBody>,
) -> Result<Json<TransferResponse>, ApiError> {
    let amount = body.amount.to_minor()?;

    let transfer = state
        .shop
        .transfer(TransferRequest {
            sender: caller.user,
            receiver: body.receiver,
            amount,
            scope: caller.scope,
        })
        .await?;
    let balance = state.shop.get_balance(caller.user).await?;

    Ok(Json(TransferResponse { transfer, balance }))
}
