//! Storage layer for vidshop.
//!
//! This crate provides durable storage for account balances, the append-only
//! transaction log, the item catalog, settings and admin grants.
//!
//! # Architecture
//!
//! Storage is split into four traits so callers can depend on (and tests can
//! fake) only the part they need:
//!
//! - [`LedgerStore`]: balances, purchases, transfers, adjustments
//! - [`CatalogStore`]: item CRUD
//! - [`SettingsStore`]: global and per-scope key/value settings
//! - [`AdminStore`]: stored admin grants
//!
//! [`SqliteStore`] implements all four over a single SQLite database.
//! [`MemorySettings`] is an in-process [`SettingsStore`] for isolated use.
//!
//! # Atomicity
//!
//! Every ledger mutation that must check a balance before changing it does
//! the check inside the same SQL statement as the debit
//! (`UPDATE ... WHERE balance >= ?`), so two concurrent debits on the same
//! account can never both observe the same pre-debit balance.
//!
//! # Example
//!
//! ```no_run
//! use vidshop_store::{LedgerStore, SqliteStore};
//! use vidshop_core::UserId;
//!
//! # async fn example() -> vidshop_store::Result<()> {
//! let store = SqliteStore::open("/tmp/vidshop.db").await?;
//!
//! let user = UserId::new(42);
//! store.adjust_balance(user, 10_000).await?;
//! assert_eq!(store.get_balance(user).await?, 10_000);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod schema;
pub mod settings;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemorySettings;
pub use settings::keys;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vidshop_core::{
    Adjustment, Item, ItemId, ItemInput, PurchaseId, PurchaseRecord, ScopeId, TransferRecord,
    UserId,
};

/// Durable account balances and the append-only transaction log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create the account at zero balance if it does not exist.
    ///
    /// Idempotent: calling it on an existing account changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn ensure_account(&self, account: UserId) -> Result<()>;

    /// Current balance, creating the account at zero if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_balance(&self, account: UserId) -> Result<i64>;

    /// Apply `balance += delta` atomically and return the new balance.
    ///
    /// Does not enforce non-negativity.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn adjust_balance(&self, account: UserId, delta: i64) -> Result<i64>;

    /// Apply `balance += delta` and append an adjustment record, atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `delta` is zero.
    async fn record_adjustment(
        &self,
        account: UserId,
        delta: i64,
        reason: &str,
        actor: Option<UserId>,
    ) -> Result<(Adjustment, i64)>;

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Debit `buyer` by `price` and append a pending purchase record as one unit.
    ///
    /// The sufficiency check is part of the same atomic update as the debit.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientFunds` if the balance is below `price`.
    /// - `StoreError::InvalidAmount` if `price` is negative.
    async fn record_purchase(
        &self,
        buyer: UserId,
        item: ItemId,
        price: i64,
        at: DateTime<Utc>,
    ) -> Result<PurchaseRecord>;

    /// Mark a pending purchase as delivered.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no pending purchase has this ID.
    async fn commit_purchase(&self, id: PurchaseId) -> Result<PurchaseRecord>;

    /// Credit the snapshot price back and mark a pending purchase refunded.
    ///
    /// Returns the record and the buyer's balance after the refund.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no pending purchase has this ID.
    async fn refund_purchase(&self, id: PurchaseId) -> Result<(PurchaseRecord, i64)>;

    /// Get a purchase by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseRecord>>;

    /// List a buyer's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_purchases(&self, account: UserId, limit: usize) -> Result<Vec<PurchaseRecord>>;

    /// List purchases still pending that were created before `older_than`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_pending_purchases(&self, older_than: DateTime<Utc>)
        -> Result<Vec<PurchaseRecord>>;

    // =========================================================================
    // Transfers & adjustments
    // =========================================================================

    /// Move `amount` from `sender` to `receiver` and append a transfer record.
    ///
    /// Nothing is mutated if any check fails.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0` or `sender == receiver`.
    /// - `StoreError::InsufficientFunds` if the sender's balance is below `amount`.
    async fn record_transfer(
        &self,
        sender: UserId,
        receiver: UserId,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<TransferRecord>;

    /// List transfers sent or received by an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transfers(&self, account: UserId, limit: usize) -> Result<Vec<TransferRecord>>;

    /// List adjustments applied to an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_adjustments(&self, account: UserId, limit: usize) -> Result<Vec<Adjustment>>;
}

/// Durable catalog item records.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// List items in ID order, optionally only the active ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_items(&self, active_only: bool) -> Result<Vec<Item>>;

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Create an item (`id == None`, active) or fully update an existing one.
    ///
    /// Updating a missing ID is a silent no-op; callers verify existence first.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if the price is negative.
    async fn upsert_item(&self, id: Option<ItemId>, input: &ItemInput) -> Result<ItemId>;

    /// Delete an item. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_item(&self, id: ItemId) -> Result<bool>;

    /// Set an item's active flag. Returns whether a row matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn set_item_active(&self, id: ItemId, active: bool) -> Result<bool>;
}

/// Global and per-scope key/value settings.
///
/// Absent keys read as `None`; typed accessors apply the defaults.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a global setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Write a global setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    /// Read a per-scope setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_scoped(&self, scope: ScopeId, key: &str) -> Result<Option<String>>;

    /// Write a per-scope setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set_scoped(&self, scope: ScopeId, key: &str, value: &str) -> Result<()>;

    /// Remove a per-scope setting, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn clear_scoped(&self, scope: ScopeId, key: &str) -> Result<bool>;

    /// Whether the shop is open (defaults to open).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_shop_open(&self) -> Result<bool> {
        Ok(self
            .get_setting(keys::SHOP_OPEN)
            .await?
            .map_or(true, |value| settings::parse_flag(&value)))
    }

    /// Open or close the shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set_shop_open(&self, open: bool) -> Result<()> {
        self.set_setting(keys::SHOP_OPEN, settings::flag_value(open))
            .await
    }
}

/// Stored admin grants.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Whether `user` holds a stored grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn is_granted(&self, user: UserId) -> Result<bool>;

    /// Grant admin. Returns `false` if already granted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn grant_admin(&self, user: UserId) -> Result<bool>;

    /// Revoke admin. Returns `false` if there was no grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn revoke_admin(&self, user: UserId) -> Result<bool>;

    /// List stored grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_admins(&self) -> Result<Vec<UserId>>;
}

/// Everything a storefront needs from storage.
pub trait Store: LedgerStore + CatalogStore + SettingsStore + AdminStore {}

impl<T> Store for T where T: LedgerStore + CatalogStore + SettingsStore + AdminStore {}
