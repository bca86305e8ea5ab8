//! The storefront service object.

use std::sync::Arc;

use vidshop_core::{
    AdminContext, Destination, Item, ItemId, PurchaseRecord, Result, ScopeId, ShopError,
    TransferRecord, UserId,
};
use vidshop_fetch::AssetFetcher;
use vidshop_store::{keys, AdminStore, CatalogStore, LedgerStore, SettingsStore, Store};

use crate::config::ShopConfig;
use crate::outbound::{AuditEvent, AuditKind, AuditSink, Delivery, NoopAudit};

/// Storefront operations over injected storage and collaborators.
///
/// Cloning is cheap; every collaborator is shared behind an `Arc`.
#[derive(Clone)]
pub struct Shop {
    pub(crate) ledger: Arc<dyn LedgerStore>,
    pub(crate) catalog: Arc<dyn CatalogStore>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) admins: Arc<dyn AdminStore>,
    pub(crate) fetcher: Arc<dyn AssetFetcher>,
    pub(crate) delivery: Arc<dyn Delivery>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) config: ShopConfig,
}

impl std::fmt::Debug for Shop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shop")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Shop {
    /// Create a shop whose ledger, catalog, settings and admin grants all
    /// live in `store`. Audit events are dropped until [`Shop::with_audit`]
    /// is called.
    pub fn new<S>(
        store: Arc<S>,
        fetcher: Arc<dyn AssetFetcher>,
        delivery: Arc<dyn Delivery>,
        config: ShopConfig,
    ) -> Self
    where
        S: Store + 'static,
    {
        Self {
            ledger: store.clone(),
            catalog: store.clone(),
            settings: store.clone(),
            admins: store,
            fetcher,
            delivery,
            audit: Arc::new(NoopAudit),
            config,
        }
    }

    /// Read and write settings through `settings` instead of the main store.
    #[must_use]
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    /// Publish audit events to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ShopConfig {
        &self.config
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Items currently listed for sale.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list_catalog(&self) -> Result<Vec<Item>> {
        Ok(self.catalog.list_items(true).await?)
    }

    /// Whether purchases are currently accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings store cannot be read.
    pub async fn is_open(&self) -> Result<bool> {
        Ok(self.settings.is_shop_open().await?)
    }

    /// A user's balance (creating the account at zero if needed).
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_balance(&self, user: UserId) -> Result<i64> {
        Ok(self.ledger.get_balance(user).await?)
    }

    /// A user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_history(
        &self,
        user: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<PurchaseRecord>> {
        let limit = self.config.history_limit(limit);
        Ok(self.ledger.list_purchases(user, limit).await?)
    }

    /// Transfers a user sent or received, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_transfers(
        &self,
        user: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<TransferRecord>> {
        let limit = self.config.history_limit(limit);
        Ok(self.ledger.list_transfers(user, limit).await?)
    }

    /// Where a purchase made in `scope` should be delivered.
    ///
    /// The scope's designated delivery channel if one is set, otherwise a
    /// direct message to the buyer.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be read.
    pub async fn resolve_destination(
        &self,
        scope: Option<ScopeId>,
        buyer: UserId,
    ) -> Result<Destination> {
        if let Some(scope) = scope {
            if let Some(channel) = self.settings.get_scoped(scope, keys::DELIVERY_CHANNEL).await? {
                let channel = channel.trim();
                if !channel.is_empty() {
                    return Ok(Destination::Channel(channel.to_string()));
                }
            }
        }
        Ok(Destination::DirectMessage(buyer))
    }

    /// Whether `user` has admin privilege.
    ///
    /// The static allow-set and the platform owner flag are checked first;
    /// the stored grant is only looked up when neither applies.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant lookup fails.
    pub async fn is_admin(&self, user: UserId, context: AdminContext) -> Result<bool> {
        let policy = &self.config.admin_policy;
        if policy.is_admin(user, false, context) {
            return Ok(true);
        }
        let granted = self.admins.is_granted(user).await?;
        Ok(policy.is_admin(user, granted, context))
    }

    // =========================================================================
    // Shared checks
    // =========================================================================

    /// Load an item and confirm it can be sold right now.
    pub(crate) async fn sellable_item(&self, item_id: ItemId) -> Result<Item> {
        let item = self
            .catalog
            .get_item(item_id)
            .await?
            .filter(Item::is_purchasable)
            .ok_or_else(|| ShopError::ItemUnavailable {
                item_id: item_id.to_string(),
            })?;

        if !self.settings.is_shop_open().await? {
            return Err(ShopError::ShopClosed);
        }

        Ok(item)
    }

    /// Publish an audit event if `scope` has a log channel.
    ///
    /// Never fails; problems are logged.
    pub(crate) async fn audit(&self, scope: Option<ScopeId>, kind: AuditKind, text: String) {
        let Some(scope) = scope else {
            return;
        };

        let channel = match self.settings.get_scoped(scope, keys::LOG_CHANNEL).await {
            Ok(Some(channel)) if !channel.trim().is_empty() => channel.trim().to_string(),
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "Failed to read log channel");
                return;
            }
        };

        let event = AuditEvent {
            scope,
            channel,
            kind,
            text,
        };

        if let Err(e) = self.audit.emit(&event).await {
            tracing::warn!(scope = %scope, kind = ?kind, error = %e, "Failed to emit audit event");
        }
    }
}
