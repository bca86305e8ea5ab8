//! Health check handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store cannot be read.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether purchases are accepted; absent when the store is unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_open: Option<bool>,
    /// Whether deliveries go to a relay or are refunded undelivered.
    pub relay_configured: bool,
}

/// Health check endpoint. Reads the shop-open flag so a broken database
/// shows up as `503`.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let relay_configured = state.config.relay_url.is_some();

    let (code, status, shop_open) = match state.shop.is_open().await {
        Ok(open) => (StatusCode::OK, "ok", Some(open)),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read the store");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", None)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: "vidshop",
            version: env!("CARGO_PKG_VERSION"),
            shop_open,
            relay_configured,
        }),
    )
}
