//! Admin operations.
//!
//! Every operation here first checks that the acting user is an admin and
//! fails with `ShopError::NotAuthorized` otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vidshop_core::{
    format_amount, Adjustment, AdminContext, Item, ItemId, ItemInput, PurchaseId, PurchaseRecord,
    PurchaseStatus, Result, ScopeId, ShopError, UserId,
};
use vidshop_fetch::{deadline_seconds, normalize_reference};
use vidshop_store::keys;

use crate::outbound::AuditKind;
use crate::Shop;

/// Reason recorded when an admin adjusts a balance without giving one.
pub const DEFAULT_ADJUSTMENT_REASON: &str = "admin adjustment";

/// The user performing an admin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminActor {
    /// Acting user.
    pub user: UserId,
    /// Per-request facts from the command layer.
    pub context: AdminContext,
}

impl AdminActor {
    /// An actor with no platform role.
    #[must_use]
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            context: AdminContext::default(),
        }
    }
}

/// A balance change requested by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustRequest {
    /// Account to change.
    pub user: UserId,
    /// Signed change in minor units.
    pub delta: i64,
    /// Why the balance changed.
    #[serde(default)]
    pub reason: Option<String>,
    /// Community the request came from.
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

/// Result of a balance adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustmentReceipt {
    /// Logged adjustment.
    pub adjustment: Adjustment,
    /// Balance after the change.
    pub balance: i64,
}

/// Result of a manual refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundReceipt {
    /// The purchase, now refunded.
    pub purchase: PurchaseRecord,
    /// Buyer's balance after the refund.
    pub balance: i64,
}

impl Shop {
    async fn require_admin(&self, actor: &AdminActor) -> Result<()> {
        if self.is_admin(actor.user, actor.context).await? {
            Ok(())
        } else {
            tracing::warn!(user_id = %actor.user, "Admin operation denied");
            Err(ShopError::NotAuthorized)
        }
    }

    async fn existing_item(&self, id: ItemId) -> Result<Item> {
        self.catalog
            .get_item(id)
            .await?
            .ok_or_else(|| ShopError::RecordNotFound {
                entity: "item",
                id: id.to_string(),
            })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Create an item (`id == None`) or replace every field of an existing one.
    ///
    /// # Errors
    ///
    /// - `ShopError::InvalidAmount` if the price is negative.
    /// - `ShopError::InvalidReference` if the reference is not a usable link.
    /// - `ShopError::RecordNotFound` when updating a missing item.
    pub async fn admin_upsert_item(
        &self,
        actor: &AdminActor,
        id: Option<ItemId>,
        input: ItemInput,
    ) -> Result<Item> {
        self.require_admin(actor).await?;

        if input.price < 0 {
            return Err(ShopError::InvalidAmount(format!(
                "price must be non-negative, got {}",
                format_amount(input.price)
            )));
        }
        normalize_reference(&input.reference)
            .map_err(|e| ShopError::InvalidReference(e.to_string()))?;

        if let Some(id) = id {
            self.existing_item(id).await?;
        }

        let id = self.catalog.upsert_item(id, &input).await?;
        let item = self.existing_item(id).await?;

        tracing::info!(
            admin = %actor.user,
            item_id = %item.id,
            name = %item.name,
            price = item.price,
            "Item saved"
        );
        Ok(item)
    }

    /// List or unlist an item.
    ///
    /// # Errors
    ///
    /// - `ShopError::RecordNotFound` if the item does not exist.
    pub async fn admin_set_active(
        &self,
        actor: &AdminActor,
        id: ItemId,
        active: bool,
    ) -> Result<Item> {
        self.require_admin(actor).await?;

        if !self.catalog.set_item_active(id, active).await? {
            return Err(ShopError::RecordNotFound {
                entity: "item",
                id: id.to_string(),
            });
        }

        tracing::info!(admin = %actor.user, item_id = %id, active, "Item visibility changed");
        self.existing_item(id).await
    }

    /// Delete an item. Past purchases keep their dangling item ID.
    ///
    /// # Errors
    ///
    /// - `ShopError::RecordNotFound` if the item does not exist.
    pub async fn admin_delete_item(&self, actor: &AdminActor, id: ItemId) -> Result<()> {
        self.require_admin(actor).await?;

        if !self.catalog.delete_item(id).await? {
            return Err(ShopError::RecordNotFound {
                entity: "item",
                id: id.to_string(),
            });
        }

        tracing::info!(admin = %actor.user, item_id = %id, "Item deleted");
        Ok(())
    }

    /// Every item, listed or not.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn admin_list_items(&self, actor: &AdminActor) -> Result<Vec<Item>> {
        self.require_admin(actor).await?;
        Ok(self.catalog.list_items(false).await?)
    }

    // =========================================================================
    // Balances
    // =========================================================================

    /// Add to (or subtract from) a user's balance.
    ///
    /// # Errors
    ///
    /// - `ShopError::InvalidAmount` if `delta` is zero.
    pub async fn admin_adjust_balance(
        &self,
        actor: &AdminActor,
        request: AdjustRequest,
    ) -> Result<AdjustmentReceipt> {
        self.require_admin(actor).await?;

        let AdjustRequest {
            user,
            delta,
            reason,
            scope,
        } = request;

        if delta == 0 {
            return Err(ShopError::InvalidAmount(
                "adjustment must be non-zero".into(),
            ));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ADJUSTMENT_REASON.to_string());

        let (adjustment, balance) = self
            .ledger
            .record_adjustment(user, delta, &reason, Some(actor.user))
            .await?;

        tracing::info!(
            admin = %actor.user,
            user_id = %user,
            delta,
            balance,
            reason = %reason,
            "Balance adjusted"
        );

        self.audit(
            scope,
            AuditKind::BalanceAdjusted,
            format!(
                "<@{}> adjusted <@{user}> by {} ({reason}); balance {}",
                actor.user,
                format_amount(delta),
                format_amount(balance)
            ),
        )
        .await;

        Ok(AdjustmentReceipt {
            adjustment,
            balance,
        })
    }

    /// Refund a purchase that is still pending, for reconciliation after a
    /// crash mid-delivery.
    ///
    /// Only purchases older than [`ShopConfig::settle_window`] qualify; a
    /// younger one may still be fetched and delivered.
    ///
    /// [`ShopConfig::settle_window`]: crate::ShopConfig::settle_window
    ///
    /// # Errors
    ///
    /// - `ShopError::RecordNotFound` if no pending purchase has this ID.
    /// - `ShopError::PurchaseInFlight` if the purchase is too recent.
    pub async fn admin_refund_purchase(
        &self,
        actor: &AdminActor,
        id: PurchaseId,
        scope: Option<ScopeId>,
    ) -> Result<RefundReceipt> {
        self.require_admin(actor).await?;

        let not_pending = || ShopError::RecordNotFound {
            entity: "pending purchase",
            id: id.to_string(),
        };
        let pending = self
            .ledger
            .get_purchase(id)
            .await?
            .filter(|p| p.status == PurchaseStatus::Pending)
            .ok_or_else(not_pending)?;

        let window = self.config.settle_window();
        let age = (Utc::now() - pending.created_at).to_std().unwrap_or_default();
        if age < window {
            let retry_after_seconds = deadline_seconds(window - age);
            tracing::info!(
                admin = %actor.user,
                purchase_id = %id,
                retry_after_seconds,
                "Manual refund refused: purchase may still be in flight"
            );
            return Err(ShopError::PurchaseInFlight {
                id: id.to_string(),
                retry_after_seconds,
            });
        }

        let (purchase, balance) = self.ledger.refund_purchase(id).await?;

        tracing::info!(
            admin = %actor.user,
            purchase_id = %id,
            buyer = %purchase.buyer,
            price = purchase.price,
            balance,
            "Pending purchase refunded by admin"
        );

        self.audit(
            scope,
            AuditKind::PurchaseRefunded,
            format!(
                "<@{}> refunded purchase #{id}: {} back to <@{}>",
                actor.user,
                format_amount(purchase.price),
                purchase.buyer
            ),
        )
        .await;

        Ok(RefundReceipt { purchase, balance })
    }

    /// Purchases still pending that were created before `older_than`.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn admin_list_pending(
        &self,
        actor: &AdminActor,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<PurchaseRecord>> {
        self.require_admin(actor).await?;
        Ok(self.ledger.list_pending_purchases(older_than).await?)
    }

    // =========================================================================
    // Settings & grants
    // =========================================================================

    /// Open or close the shop.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn admin_set_shop_open(&self, actor: &AdminActor, open: bool) -> Result<()> {
        self.require_admin(actor).await?;
        self.settings.set_shop_open(open).await?;
        tracing::info!(admin = %actor.user, open, "Shop status changed");
        Ok(())
    }

    /// Set or clear (`value == None`) a per-scope setting.
    ///
    /// # Errors
    ///
    /// - `ShopError::InvalidSetting` if `key` is not a scoped setting.
    pub async fn admin_set_scoped_setting(
        &self,
        actor: &AdminActor,
        scope: ScopeId,
        key: &str,
        value: Option<&str>,
    ) -> Result<()> {
        self.require_admin(actor).await?;

        if !keys::SCOPED.contains(&key) {
            return Err(ShopError::InvalidSetting(format!(
                "unknown setting {key:?}, expected one of {}",
                keys::SCOPED.join(", ")
            )));
        }

        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => self.settings.set_scoped(scope, key, value).await?,
            None => {
                self.settings.clear_scoped(scope, key).await?;
            }
        }

        tracing::info!(
            admin = %actor.user,
            scope = %scope,
            key,
            value = ?value,
            "Scoped setting changed"
        );
        Ok(())
    }

    /// Grant admin to `user`. Returns `false` if already granted.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn admin_grant(&self, actor: &AdminActor, user: UserId) -> Result<bool> {
        self.require_admin(actor).await?;
        let granted = self.admins.grant_admin(user).await?;
        tracing::info!(admin = %actor.user, user_id = %user, granted, "Admin granted");
        Ok(granted)
    }

    /// Revoke a stored admin grant. Returns `false` if there was none.
    ///
    /// Static and platform-owner admins are unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn admin_revoke(&self, actor: &AdminActor, user: UserId) -> Result<bool> {
        self.require_admin(actor).await?;
        let revoked = self.admins.revoke_admin(user).await?;
        tracing::info!(admin = %actor.user, user_id = %user, revoked, "Admin revoked");
        Ok(revoked)
    }

    /// Users holding a stored grant.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn admin_list_admins(&self, actor: &AdminActor) -> Result<Vec<UserId>> {
        self.require_admin(actor).await?;
        Ok(self.admins.list_admins().await?)
    }
}
