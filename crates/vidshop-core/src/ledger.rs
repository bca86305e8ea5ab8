//! Ledger record types.
//!
//! Every balance change is backed by one of these records:
//!
//! - [`PurchaseRecord`]: debit for an item, optionally reversed by a refund
//! - [`TransferRecord`]: paired debit/credit between two accounts
//! - [`Adjustment`]: admin top-up or correction
//!
//! Records are immutable once written, with the single exception of a
//! purchase's settlement status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AdjustmentId, ItemId, PurchaseId, TransferId, UserId};

/// Settlement status of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Debited; delivery in flight.
    Pending,

    /// Delivered to the buyer.
    Committed,

    /// Delivery failed and the price was credited back.
    Refunded,
}

impl PurchaseStatus {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "committed" => Ok(Self::Committed),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown purchase status: {other}")),
        }
    }
}

/// A purchase of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Purchase identifier.
    pub id: PurchaseId,

    /// The buying account.
    pub buyer: UserId,

    /// The purchased item. May no longer exist in the catalog.
    pub item_id: ItemId,

    /// Item name at read time, `None` if the item has since been deleted.
    pub item_name: Option<String>,

    /// Price paid, snapshotted at debit time.
    pub price: i64,

    /// Settlement status.
    pub status: PurchaseStatus,

    /// When the debit was applied.
    pub created_at: DateTime<Utc>,

    /// When the purchase was committed or refunded.
    pub settled_at: Option<DateTime<Utc>>,
}

/// A balance transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Transfer identifier.
    pub id: TransferId,

    /// Debited account.
    pub sender: UserId,

    /// Credited account.
    pub receiver: UserId,

    /// Amount moved in minor units (always positive).
    pub amount: i64,

    /// When the transfer was applied.
    pub created_at: DateTime<Utc>,
}

/// An admin balance adjustment (top-up or correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Adjustment identifier.
    pub id: AdjustmentId,

    /// Adjusted account.
    pub account: UserId,

    /// Signed change in minor units.
    pub delta: i64,

    /// Free-form reason.
    pub reason: String,

    /// Admin who applied the adjustment, if any.
    pub actor: Option<UserId>,

    /// When the adjustment was applied.
    pub created_at: DateTime<Utc>,
}
