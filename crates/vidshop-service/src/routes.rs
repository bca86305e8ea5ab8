//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, shop};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints other than purchases.
/// Purchases stay outside the limit so a burst of slow downloads cannot
/// starve balance checks or other users' purchases; each one is bounded by
/// the fetch deadline, the size limit and the delivery timeout instead.
const API_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Buyer (API key + `x-user-id`)
/// - `GET /v1/catalog` - Items for sale
/// - `GET /v1/balance` - Caller's balance
/// - `GET /v1/history?limit=` - Caller's purchases
/// - `GET /v1/transfers?limit=` - Caller's transfers
/// - `POST /v1/quote` - Check a purchase without buying
/// - `POST /v1/purchases` - Buy and deliver an item
/// - `POST /v1/transfers` - Send funds to another user
///
/// ## Admin (same auth, caller must be an admin)
/// - `GET|POST /v1/admin/items`, `PUT|DELETE /v1/admin/items/:id`
/// - `POST /v1/admin/items/:id/active`
/// - `POST /v1/admin/balance`
/// - `GET /v1/admin/purchases/pending`, `POST /v1/admin/purchases/:id/refund`
/// - `POST /v1/admin/shop`
/// - `PUT /v1/admin/settings/:key` (scope from `x-scope-id`)
/// - `GET /v1/admin/admins`, `PUT|DELETE /v1/admin/admins/:user`
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route("/items", get(admin::list_items).post(admin::create_item))
        .route(
            "/items/:id",
            put(admin::update_item).delete(admin::delete_item),
        )
        .route("/items/:id/active", post(admin::set_item_active))
        .route("/balance", post(admin::adjust_balance))
        .route("/purchases/pending", get(admin::list_pending))
        .route("/purchases/:id/refund", post(admin::refund_purchase))
        .route("/shop", post(admin::set_shop_open))
        .route("/settings/:key", put(admin::set_scoped_setting))
        .route("/admins", get(admin::list_admins))
        .route(
            "/admins/:user",
            put(admin::grant_admin).delete(admin::revoke_admin),
        );

    let limited_routes = Router::new()
        .route("/catalog", get(shop::list_catalog))
        .route("/balance", get(shop::get_balance))
        .route("/history", get(shop::get_history))
        .route(
            "/transfers",
            get(shop::get_transfers).post(shop::transfer),
        )
        .route("/quote", post(shop::quote))
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        .route("/purchases", post(shop::purchase))
        .merge(limited_routes);

    Router::new()
        // Health (public, no limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
