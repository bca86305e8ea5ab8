//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vidshop_core::ShopError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid service credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A shop operation failed.
    #[error(transparent)]
    Shop(#[from] ShopError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// HTTP status for a shop failure.
fn shop_status(err: &ShopError) -> StatusCode {
    match err {
        ShopError::ItemUnavailable { .. } | ShopError::RecordNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        ShopError::ShopClosed => StatusCode::SERVICE_UNAVAILABLE,
        ShopError::PurchaseInFlight { .. } => StatusCode::CONFLICT,
        ShopError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        ShopError::InvalidAmount(_)
        | ShopError::InvalidRecipient(_)
        | ShopError::InvalidSetting(_)
        | ShopError::InvalidReference(_)
        | ShopError::InvalidId(_) => StatusCode::BAD_REQUEST,
        ShopError::FetchTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ShopError::FetchError(_) | ShopError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        ShopError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ShopError::NotAuthorized => StatusCode::FORBIDDEN,
        ShopError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Structured details for a shop failure: the shortfall, the byte size, and
/// whether the buyer was refunded.
fn shop_details(err: &ShopError) -> Option<serde_json::Value> {
    let mut details = match err {
        ShopError::InsufficientFunds { balance, required } => serde_json::json!({
            "balance": balance,
            "required": required,
            "shortfall": err.shortfall(),
        }),
        ShopError::PayloadTooLarge {
            size_bytes,
            limit_bytes,
        } => serde_json::json!({
            "size_bytes": size_bytes,
            "limit_bytes": limit_bytes,
        }),
        ShopError::FetchTimeout { seconds } => serde_json::json!({ "seconds": seconds }),
        ShopError::PurchaseInFlight {
            retry_after_seconds,
            ..
        } => serde_json::json!({ "retry_after_seconds": retry_after_seconds }),
        _ if err.is_refunded_failure() => serde_json::json!({}),
        _ => return None,
    };

    if err.is_refunded_failure() {
        details["refunded"] = serde_json::Value::Bool(true);
    }
    Some(details)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Shop(ShopError::Storage(msg)) | Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::Shop(err) => (shop_status(err), err.code(), err.to_string(), shop_details(err)),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
