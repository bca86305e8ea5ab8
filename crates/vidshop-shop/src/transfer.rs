//! Balance transfers between users.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidshop_core::{format_amount, Result, ScopeId, ShopError, TransferRecord, UserId};

use crate::outbound::AuditKind;
use crate::Shop;

/// A request to move funds from one user to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Paying user.
    pub sender: UserId,
    /// Receiving user.
    pub receiver: UserId,
    /// Amount in minor units.
    pub amount: i64,
    /// Community the request came from.
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl Shop {
    /// Move `amount` from sender to receiver.
    ///
    /// # Errors
    ///
    /// - `ShopError::InvalidRecipient` if the receiver is not a user ID.
    /// - `ShopError::InvalidAmount` for a self-transfer or non-positive amount.
    /// - `ShopError::InsufficientFunds` if the sender cannot cover it.
    ///
    /// Nothing is changed when any of these are returned.
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferRecord> {
        let TransferRequest {
            sender,
            receiver,
            amount,
            scope,
        } = request;

        if receiver.get() <= 0 {
            return Err(ShopError::InvalidRecipient(format!("{receiver} is not a user")));
        }
        if sender == receiver {
            return Err(ShopError::InvalidAmount("cannot transfer to yourself".into()));
        }
        if amount <= 0 {
            return Err(ShopError::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                format_amount(amount)
            )));
        }

        let record = self
            .ledger
            .record_transfer(sender, receiver, amount, Utc::now())
            .await?;

        tracing::info!(
            transfer_id = %record.id,
            sender = %sender,
            receiver = %receiver,
            amount,
            "Transfer completed"
        );

        self.audit(
            scope,
            AuditKind::Transfer,
            format!(
                "<@{sender}> sent {} to <@{receiver}>",
                format_amount(amount)
            ),
        )
        .await;

        Ok(record)
    }
}
