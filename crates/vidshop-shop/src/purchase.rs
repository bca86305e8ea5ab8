//! Purchase orchestration.
//!
//! A purchase debits first and fetches second. Once the debit is written the
//! rest of the flow runs on its own task, so a caller that goes away
//! mid-download cannot leave a buyer charged without either a delivery or a
//! refund.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidshop_core::{
    format_amount, Destination, Item, ItemId, PurchaseRecord, Result, ScopeId, ShopError, UserId,
};
use vidshop_fetch::deadline_seconds;
use vidshop_store::StoreError;

use crate::outbound::{AuditKind, DeliveryMetadata};
use crate::state::{PurchaseFlow, PurchaseState};
use crate::Shop;

/// A buyer's confirmed request to purchase an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Buyer.
    pub buyer: UserId,
    /// Item to buy.
    pub item_id: ItemId,
    /// Explicit destination; resolved from the scope's settings when absent.
    #[serde(default)]
    pub destination: Option<Destination>,
    /// Community the request came from.
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

/// Result of a delivered purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseReceipt {
    /// The purchase record.
    pub purchase: PurchaseRecord,
    /// Buyer's balance after the purchase, if it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<i64>,
    /// Size of the delivered file.
    pub size_bytes: u64,
    /// Where the file went.
    pub destination: Destination,
}

/// Listing-time view of a prospective purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Item being quoted.
    pub item_id: ItemId,
    /// Item display name.
    pub item_name: String,
    /// Current price.
    pub price: i64,
    /// Buyer's current balance.
    pub balance: i64,
    /// Balance left if the purchase went through now.
    pub balance_after: i64,
}

impl Shop {
    /// Check that `buyer` could buy `item_id` right now.
    ///
    /// This is the listing step. Nothing is written, and every check is
    /// repeated by [`Shop::purchase`] at confirmation.
    ///
    /// # Errors
    ///
    /// - `ShopError::ItemUnavailable` if the item is missing or inactive.
    /// - `ShopError::ShopClosed` if the shop is closed.
    /// - `ShopError::InsufficientFunds` with the shortfall.
    pub async fn quote(&self, buyer: UserId, item_id: ItemId) -> Result<Quote> {
        let item = self.sellable_item(item_id).await?;
        let balance = self.ledger.get_balance(buyer).await?;

        if balance < item.price {
            return Err(ShopError::InsufficientFunds {
                balance,
                required: item.price,
            });
        }

        Ok(Quote {
            item_id: item.id,
            item_name: item.name,
            price: item.price,
            balance,
            balance_after: balance - item.price,
        })
    }

    /// Buy an item and deliver it.
    ///
    /// The item and shop state are re-validated here even if the buyer was
    /// quoted moments ago. After the debit, any download, size or delivery
    /// failure refunds the price before the error is returned.
    ///
    /// # Errors
    ///
    /// - `ShopError::ItemUnavailable`, `ShopError::ShopClosed`,
    ///   `ShopError::InsufficientFunds`: nothing was written.
    /// - `ShopError::FetchTimeout`, `ShopError::FetchError`,
    ///   `ShopError::PayloadTooLarge`, `ShopError::DeliveryFailed`: the
    ///   purchase was recorded and refunded.
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchaseReceipt> {
        let PurchaseRequest {
            buyer,
            item_id,
            destination,
            scope,
        } = request;

        let mut flow = PurchaseFlow::start(buyer, item_id);

        let item = self.sellable_item(item_id).await?;
        flow.advance(PurchaseState::Validated);

        let balance = self.ledger.get_balance(buyer).await?;
        if balance < item.price {
            tracing::debug!(
                buyer = %buyer,
                item_id = %item_id,
                balance,
                price = item.price,
                "Purchase rejected: insufficient funds"
            );
            return Err(ShopError::InsufficientFunds {
                balance,
                required: item.price,
            });
        }

        let destination = match destination {
            Some(destination) => destination,
            None => self.resolve_destination(scope, buyer).await?,
        };

        // The store re-checks the balance in the same statement as the debit,
        // so a concurrent spend between the check above and here still fails
        // cleanly with InsufficientFunds.
        let purchase = self
            .ledger
            .record_purchase(buyer, item.id, item.price, Utc::now())
            .await?;
        flow.advance(PurchaseState::Debited);

        tracing::info!(
            purchase_id = %purchase.id,
            buyer = %buyer,
            item_id = %item.id,
            price = item.price,
            "Purchase debited"
        );

        let shop = self.clone();
        tokio::spawn(async move { shop.fulfil(flow, item, purchase, destination, scope).await })
        .await
        .map_err(|e| ShopError::Storage(format!("purchase task failed: {e}")))?
    }

    /// Everything after the debit: fetch, deliver, then commit or refund.
    async fn fulfil(
        &self,
        mut flow: PurchaseFlow,
        item: Item,
        purchase: PurchaseRecord,
        destination: Destination,
        scope: Option<ScopeId>,
    ) -> Result<PurchaseReceipt> {
        flow.advance(PurchaseState::Fetching);

        match self.fetch_and_deliver(&item, &purchase, &destination).await {
            Ok(size_bytes) => {
                flow.advance(PurchaseState::Delivered);
                let purchase = self.mark_committed(purchase).await;
                let balance_after = self.balance_after(&purchase).await;

                tracing::info!(
                    purchase_id = %purchase.id,
                    buyer = %purchase.buyer,
                    item_id = %item.id,
                    size_bytes,
                    destination = %destination,
                    balance_after = ?balance_after,
                    "Purchase delivered"
                );

                self.audit(
                    scope,
                    AuditKind::PurchaseCommitted,
                    format!(
                        "<@{}> bought {} (#{}) for {}",
                        purchase.buyer,
                        item.name,
                        item.id,
                        format_amount(purchase.price)
                    ),
                )
                .await;

                Ok(PurchaseReceipt {
                    purchase,
                    balance_after,
                    size_bytes,
                    destination,
                })
            }
            Err(err) => {
                flow.advance(PurchaseState::FetchFailed);
                tracing::warn!(
                    purchase_id = %purchase.id,
                    buyer = %purchase.buyer,
                    item_id = %item.id,
                    error = %err,
                    "Purchase failed after debit, refunding"
                );

                let (refunded, balance) = match self.ledger.refund_purchase(purchase.id).await {
                    Ok(done) => done,
                    // No longer pending: an admin settled it by hand meanwhile.
                    Err(StoreError::NotFound { .. }) => {
                        flow.advance(PurchaseState::Refunded);
                        tracing::warn!(
                            purchase_id = %purchase.id,
                            buyer = %purchase.buyer,
                            "Purchase was already settled; not refunding again"
                        );
                        return Err(err);
                    }
                    Err(refund_err) => {
                        tracing::error!(
                            purchase_id = %purchase.id,
                            buyer = %purchase.buyer,
                            price = purchase.price,
                            error = %refund_err,
                            original_error = %err,
                            "Refund failed; purchase left pending for reconciliation"
                        );
                        return Err(refund_err.into());
                    }
                };
                flow.advance(PurchaseState::Refunded);

                tracing::info!(
                    purchase_id = %refunded.id,
                    buyer = %refunded.buyer,
                    price = refunded.price,
                    balance,
                    "Purchase refunded"
                );

                self.audit(
                    scope,
                    AuditKind::PurchaseRefunded,
                    format!(
                        "Refunded {} to <@{}> for {} (#{}): {}",
                        format_amount(refunded.price),
                        refunded.buyer,
                        item.name,
                        item.id,
                        err
                    ),
                )
                .await;

                Err(err)
            }
        }
    }

    async fn fetch_and_deliver(
        &self,
        item: &Item,
        purchase: &PurchaseRecord,
        destination: &Destination,
    ) -> Result<u64> {
        let deadline = self.config.fetch_deadline;
        let limit_bytes = self.delivery.max_payload_bytes();

        // The fetcher enforces the deadline and size limit itself; these
        // checks bound fetchers that do not.
        let asset = tokio::time::timeout(
            deadline,
            self.fetcher.fetch(&item.reference, &item.filename, deadline, limit_bytes),
        )
        .await
        .map_err(|_| ShopError::FetchTimeout {
            seconds: deadline_seconds(deadline),
        })??;

        let size_bytes = asset.size_bytes();
        if size_bytes > limit_bytes {
            return Err(ShopError::PayloadTooLarge {
                size_bytes,
                limit_bytes,
            });
        }

        let metadata = DeliveryMetadata {
            purchase_id: purchase.id,
            buyer: purchase.buyer,
            item_id: item.id,
            item_name: item.name.clone(),
            price: purchase.price,
            size_bytes,
        };

        let delivery_timeout = self.config.delivery_timeout;
        tokio::time::timeout(
            delivery_timeout,
            self.delivery.deliver(destination, &asset, &metadata),
        )
        .await
        .map_err(|_| {
            ShopError::DeliveryFailed(format!(
                "no answer within {}s",
                deadline_seconds(delivery_timeout)
            ))
        })?
        .map_err(|e| ShopError::DeliveryFailed(e.to_string()))?;

        Ok(size_bytes)
    }

    /// Commit a delivered purchase. The asset is already with the buyer, so
    /// a storage failure here is logged rather than returned.
    async fn mark_committed(&self, purchase: PurchaseRecord) -> PurchaseRecord {
        match self.ledger.commit_purchase(purchase.id).await {
            Ok(committed) => committed,
            Err(e) => {
                tracing::error!(
                    purchase_id = %purchase.id,
                    error = %e,
                    "Delivered purchase could not be marked committed"
                );
                purchase
            }
        }
    }

    async fn balance_after(&self, purchase: &PurchaseRecord) -> Option<i64> {
        match self.ledger.get_balance(purchase.buyer).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::warn!(
                    buyer = %purchase.buyer,
                    error = %e,
                    "Failed to read balance after purchase"
                );
                None
            }
        }
    }
}
