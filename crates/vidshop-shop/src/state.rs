//! Purchase state machine.

use std::fmt;

use vidshop_core::{ItemId, UserId};

/// Where a purchase is in its lifecycle.
///
/// ```text
/// Requested -> Validated -> Debited -> Fetching -> Delivered
///                                          \-> FetchFailed -> Refunded
/// ```
///
/// Validation failures end the flow before `Debited`, with nothing written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseState {
    /// The buyer confirmed; nothing checked yet.
    Requested,
    /// Item is listed and the shop is open.
    Validated,
    /// Balance debited and a pending purchase record written.
    Debited,
    /// Asset download and delivery in progress.
    Fetching,
    /// Asset handed over and the purchase committed.
    Delivered,
    /// Download, size check or delivery failed.
    FetchFailed,
    /// The debit was credited back.
    Refunded,
}

impl PurchaseState {
    /// Lower-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Validated => "validated",
            Self::Debited => "debited",
            Self::Fetching => "fetching",
            Self::Delivered => "delivered",
            Self::FetchFailed => "fetch_failed",
            Self::Refunded => "refunded",
        }
    }

    /// Whether `next` directly follows `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Validated)
                | (Self::Validated, Self::Debited)
                | (Self::Debited, Self::Fetching)
                | (Self::Fetching, Self::Delivered | Self::FetchFailed)
                | (Self::FetchFailed, Self::Refunded)
        )
    }

    /// Whether the flow has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Refunded)
    }
}

impl fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one purchase through [`PurchaseState`] and logs each step.
#[derive(Debug)]
pub(crate) struct PurchaseFlow {
    buyer: UserId,
    item_id: ItemId,
    state: PurchaseState,
}

impl PurchaseFlow {
    pub(crate) fn start(buyer: UserId, item_id: ItemId) -> Self {
        tracing::debug!(
            buyer = %buyer,
            item_id = %item_id,
            state = %PurchaseState::Requested,
            "Purchase state"
        );
        Self {
            buyer,
            item_id,
            state: PurchaseState::Requested,
        }
    }

    pub(crate) fn advance(&mut self, next: PurchaseState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal purchase transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(
            buyer = %self.buyer,
            item_id = %self.item_id,
            from = %self.state,
            state = %next,
            "Purchase state"
        );
        self.state = next;
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> PurchaseState {
        self.state
    }
}
