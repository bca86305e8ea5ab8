//! Error types for vidshop.

use crate::amount::format_amount;
use crate::ids::IdError;

/// Result type for vidshop operations.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Errors that can occur in storefront operations.
///
/// Every variant is recoverable: callers report it to the acting user and
/// carry on. The `Display` text is suitable for showing to that user.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    /// The item does not exist or is not listed.
    #[error("item {item_id} is not available")]
    ItemUnavailable {
        /// The requested item ID.
        item_id: String,
    },

    /// The shop-open setting is off.
    #[error("the shop is closed")]
    ShopClosed,

    /// The account balance is below the required amount.
    #[error(
        "insufficient funds: balance {}, required {}, short by {}",
        minor(.balance),
        minor(.required),
        shortfall_text(.balance, .required)
    )]
    InsufficientFunds {
        /// Current balance in minor units.
        balance: i64,
        /// Required amount in minor units.
        required: i64,
    },

    /// Non-positive amount or self-transfer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The transfer recipient is not a usable account.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The asset fetch exceeded its deadline.
    #[error("asset download timed out after {seconds}s")]
    FetchTimeout {
        /// The deadline that elapsed.
        seconds: u64,
    },

    /// The asset could not be fetched.
    #[error("asset download failed: {0}")]
    FetchError(String),

    /// The asset exceeds the delivery channel's payload limit.
    #[error("asset is {size_bytes} bytes, over the {limit_bytes} byte delivery limit")]
    PayloadTooLarge {
        /// Size of the fetched asset.
        size_bytes: u64,
        /// Maximum payload accepted by the delivery channel.
        limit_bytes: u64,
    },

    /// Handing the asset to the delivery destination failed.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// An admin edit referenced a missing record.
    #[error("{entity} not found: {id}")]
    RecordNotFound {
        /// The kind of record.
        entity: &'static str,
        /// The missing ID.
        id: String,
    },

    /// A pending purchase may still be delivered, so it cannot be refunded
    /// by hand yet.
    #[error("purchase {id} may still be in flight, retry in {retry_after_seconds}s")]
    PurchaseInFlight {
        /// The purchase ID.
        id: String,
        /// Seconds until a manual refund is accepted.
        retry_after_seconds: u64,
    },

    /// A setting key or value was rejected.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// An item's asset reference is not a usable link.
    #[error("invalid asset reference: {0}")]
    InvalidReference(String),

    /// The acting user lacks admin privilege.
    #[error("admin privilege required")]
    NotAuthorized,

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

fn minor(value: &i64) -> String {
    format_amount(*value)
}

fn shortfall_text(balance: &i64, required: &i64) -> String {
    format_amount(required - balance)
}

impl ShopError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ItemUnavailable { .. } => "item_unavailable",
            Self::ShopClosed => "shop_closed",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidRecipient(_) => "invalid_recipient",
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::FetchError(_) => "fetch_error",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::PurchaseInFlight { .. } => "purchase_in_flight",
            Self::InvalidSetting(_) => "invalid_setting",
            Self::InvalidReference(_) => "invalid_reference",
            Self::NotAuthorized => "not_authorized",
            Self::InvalidId(_) => "invalid_id",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Amount missing for an `InsufficientFunds` error.
    #[must_use]
    pub const fn shortfall(&self) -> Option<i64> {
        match self {
            Self::InsufficientFunds { balance, required } => Some(*required - *balance),
            _ => None,
        }
    }

    /// Whether a purchase that hit this error was refunded.
    #[must_use]
    pub const fn is_refunded_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout { .. }
                | Self::FetchError(_)
                | Self::PayloadTooLarge { .. }
                | Self::DeliveryFailed(_)
        )
    }
}
