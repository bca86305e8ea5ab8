//! Collaborators the shop calls out to.
//!
//! The shop never talks to the chat platform itself. Handing a file to a
//! buyer and posting to a log channel are both done through these traits.

use async_trait::async_trait;
use serde::Serialize;

use vidshop_core::{Destination, ItemId, PurchaseId, ScopeId, UserId};
use vidshop_fetch::FetchedAsset;

/// Failure reported by a [`Delivery`] implementation.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

/// Failure reported by an [`AuditSink`] implementation.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct AuditError(pub String);

/// What is being delivered, for captions and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryMetadata {
    /// Purchase being fulfilled.
    pub purchase_id: PurchaseId,
    /// Buyer who paid.
    pub buyer: UserId,
    /// Item bought.
    pub item_id: ItemId,
    /// Item display name at purchase time.
    pub item_name: String,
    /// Price paid, in minor units.
    pub price: i64,
    /// Size of the delivered file.
    pub size_bytes: u64,
}

/// Hands purchased assets to their destination.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Largest file this channel accepts, in bytes.
    fn max_payload_bytes(&self) -> u64;

    /// Deliver `asset` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects or fails the upload.
    async fn deliver(
        &self,
        destination: &Destination,
        asset: &FetchedAsset,
        metadata: &DeliveryMetadata,
    ) -> Result<(), DeliveryError>;
}

/// Kinds of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// A purchase was delivered and committed.
    PurchaseCommitted,
    /// A purchase was refunded.
    PurchaseRefunded,
    /// Funds moved between two accounts.
    Transfer,
    /// An admin changed a balance.
    BalanceAdjusted,
}

/// A line for a scope's log channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Scope the event happened in.
    pub scope: ScopeId,
    /// Log channel configured for that scope.
    pub channel: String,
    /// Event kind.
    pub kind: AuditKind,
    /// Human-readable description.
    pub text: String,
}

/// Receives audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Publish one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be published. The shop logs
    /// it and carries on.
    async fn emit(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Audit sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAudit;

#[async_trait]
impl AuditSink for NoopAudit {
    async fn emit(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}
