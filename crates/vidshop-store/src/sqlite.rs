//! SQLite storage implementation.
//!
//! This module provides the `SqliteStore` implementation of the storage traits.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, Sqlite, Transaction};

use vidshop_core::{
    Adjustment, AdjustmentId, Item, ItemId, ItemInput, PurchaseId, PurchaseRecord, PurchaseStatus,
    ScopeId, TransferId, TransferRecord, UserId,
};

use crate::error::{Result, StoreError};
use crate::{AdminStore, CatalogStore, LedgerStore, SettingsStore};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connections kept for an on-disk database.
const FILE_POOL_SIZE: u32 = 8;

/// How long a writer waits for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SELECT_PURCHASE: &str = "SELECT p.id, p.buyer, p.item, i.name AS item_name, p.price, \
                               p.status, p.ts, p.settled_at \
                               FROM purchases p LEFT JOIN items i ON i.id = p.item \
                               WHERE p.id = ?";

const LIST_PURCHASES: &str = "SELECT p.id, p.buyer, p.item, i.name AS item_name, p.price, \
                              p.status, p.ts, p.settled_at \
                              FROM purchases p LEFT JOIN items i ON i.id = p.item \
                              WHERE p.buyer = ? ORDER BY p.id DESC LIMIT ?";

const LIST_PENDING: &str = "SELECT p.id, p.buyer, p.item, i.name AS item_name, p.price, \
                            p.status, p.ts, p.settled_at \
                            FROM purchases p LEFT JOIN items i ON i.id = p.item \
                            WHERE p.status = ? AND p.ts < ? ORDER BY p.id ASC";

/// SQLite-backed storage implementation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a database file at the given path and apply migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(FILE_POOL_SIZE)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Create a private in-memory database (for tests and throwaway shops).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or migrated.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to `:memory:` is a separate database, so the pool
        // must hold exactly one connection for its whole lifetime.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and apply migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        MIGRATOR.run(&pool).await?;
        tracing::debug!("SQLite store migrated");
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_account_in(tx: &mut Transaction<'_, Sqlite>, account: UserId) -> Result<()> {
        sqlx::query("INSERT INTO accounts (id, balance) VALUES (?, 0) ON CONFLICT (id) DO NOTHING")
            .bind(account.get())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Conditionally debit inside a transaction.
    ///
    /// The balance check and the debit are one statement, so no concurrent
    /// writer can interleave between them.
    async fn debit_in(
        tx: &mut Transaction<'_, Sqlite>,
        account: UserId,
        amount: i64,
    ) -> Result<i64> {
        let debited: Option<i64> = sqlx::query_scalar(
            "UPDATE accounts SET balance = balance - ?1 \
             WHERE id = ?2 AND balance >= ?1 \
             RETURNING balance",
        )
        .bind(amount)
        .bind(account.get())
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(balance) = debited {
            return Ok(balance);
        }

        let balance: i64 = sqlx::query_scalar("SELECT balance FROM accounts WHERE id = ?")
            .bind(account.get())
            .fetch_one(&mut **tx)
            .await?;

        Err(StoreError::InsufficientFunds {
            balance,
            required: amount,
        })
    }

    /// Add a signed `delta` to an existing account inside a transaction.
    ///
    /// SQLite silently turns an overflowing integer sum into a REAL, so the
    /// range check sits in the same statement as the update.
    async fn apply_delta_in(
        tx: &mut Transaction<'_, Sqlite>,
        account: UserId,
        delta: i64,
    ) -> Result<i64> {
        let balance: Option<i64> = sqlx::query_scalar(
            "UPDATE accounts SET balance = balance + ?1 \
             WHERE id = ?2 \
               AND (?1 <= 0 OR balance <= ?3 - ?1) \
               AND (?1 >= 0 OR balance >= ?4 - ?1) \
             RETURNING balance",
        )
        .bind(delta)
        .bind(account.get())
        .bind(i64::MAX)
        .bind(i64::MIN)
        .fetch_optional(&mut **tx)
        .await?;

        balance.ok_or_else(|| {
            StoreError::InvalidAmount(format!("balance of account {account} would overflow"))
        })
    }

    async fn fetch_purchase<'e, E>(executor: E, id: PurchaseId) -> Result<Option<PurchaseRecord>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(SELECT_PURCHASE)
            .bind(id.get())
            .fetch_optional(executor)
            .await?
            .as_ref()
            .map(purchase_from_row)
            .transpose()
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn purchase_from_row(row: &SqliteRow) -> Result<PurchaseRecord> {
    let status: String = row.try_get("status")?;
    Ok(PurchaseRecord {
        id: PurchaseId::new(row.try_get("id")?),
        buyer: UserId::new(row.try_get("buyer")?),
        item_id: ItemId::new(row.try_get("item")?),
        item_name: row.try_get("item_name")?,
        price: row.try_get("price")?,
        status: status.parse::<PurchaseStatus>().map_err(StoreError::Corrupt)?,
        created_at: row.try_get("ts")?,
        settled_at: row.try_get("settled_at")?,
    })
}

fn transfer_from_row(row: &SqliteRow) -> Result<TransferRecord> {
    Ok(TransferRecord {
        id: TransferId::new(row.try_get("id")?),
        sender: UserId::new(row.try_get("sender")?),
        receiver: UserId::new(row.try_get("receiver")?),
        amount: row.try_get("amount")?,
        created_at: row.try_get("ts")?,
    })
}

fn adjustment_from_row(row: &SqliteRow) -> Result<Adjustment> {
    let actor: Option<i64> = row.try_get("actor")?;
    Ok(Adjustment {
        id: AdjustmentId::new(row.try_get("id")?),
        account: UserId::new(row.try_get("account")?),
        delta: row.try_get("delta")?,
        reason: row.try_get("reason")?,
        actor: actor.map(UserId::new),
        created_at: row.try_get("ts")?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    Ok(Item {
        id: ItemId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        reference: row.try_get("reference")?,
        filename: row.try_get("filename")?,
        active: row.try_get("active")?,
    })
}

#[async_trait]
impl LedgerStore for SqliteStore {
    // =========================================================================
    // Accounts
    // =========================================================================

    async fn ensure_account(&self, account: UserId) -> Result<()> {
        sqlx::query("INSERT INTO accounts (id, balance) VALUES (?, 0) ON CONFLICT (id) DO NOTHING")
            .bind(account.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_balance(&self, account: UserId) -> Result<i64> {
        self.ensure_account(account).await?;
        let balance = sqlx::query_scalar("SELECT balance FROM accounts WHERE id = ?")
            .bind(account.get())
            .fetch_one(&self.pool)
            .await?;
        Ok(balance)
    }

    async fn adjust_balance(&self, account: UserId, delta: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_account_in(&mut tx, account).await?;
        let balance = Self::apply_delta_in(&mut tx, account, delta).await?;
        tx.commit().await?;

        tracing::debug!(account = %account, delta, balance, "Balance adjusted");
        Ok(balance)
    }

    async fn record_adjustment(
        &self,
        account: UserId,
        delta: i64,
        reason: &str,
        actor: Option<UserId>,
    ) -> Result<(Adjustment, i64)> {
        if delta == 0 {
            return Err(StoreError::InvalidAmount("adjustment must be non-zero".into()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        Self::ensure_account_in(&mut tx, account).await?;
        let balance = Self::apply_delta_in(&mut tx, account, delta).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO adjustments (account, delta, reason, actor, ts) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(account.get())
        .bind(delta)
        .bind(reason)
        .bind(actor.map(UserId::get))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let adjustment = Adjustment {
            id: AdjustmentId::new(id),
            account,
            delta,
            reason: reason.to_string(),
            actor,
            created_at: now,
        };
        Ok((adjustment, balance))
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    async fn record_purchase(
        &self,
        buyer: UserId,
        item: ItemId,
        price: i64,
        at: DateTime<Utc>,
    ) -> Result<PurchaseRecord> {
        if price < 0 {
            return Err(StoreError::InvalidAmount(format!(
                "price must be non-negative, got {price}"
            )));
        }

        let mut tx = self.pool.begin().await?;
        Self::ensure_account_in(&mut tx, buyer).await?;

        // Dropping `tx` on the error path rolls the transaction back.
        let balance = Self::debit_in(&mut tx, buyer, price).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO purchases (buyer, item, price, status, ts) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(buyer.get())
        .bind(item.get())
        .bind(price)
        .bind(PurchaseStatus::Pending.as_str())
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        let record = Self::fetch_purchase(&mut *tx, PurchaseId::new(id))
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("purchase {id} vanished after insert")))?;

        tx.commit().await?;

        tracing::debug!(
            purchase_id = id,
            buyer = %buyer,
            item_id = %item,
            price,
            balance,
            "Purchase debited"
        );
        Ok(record)
    }

    async fn commit_purchase(&self, id: PurchaseId) -> Result<PurchaseRecord> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE purchases SET status = ?, settled_at = ? WHERE id = ? AND status = ?",
        )
        .bind(PurchaseStatus::Committed.as_str())
        .bind(Utc::now())
        .bind(id.get())
        .bind(PurchaseStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "pending purchase",
                id: id.to_string(),
            });
        }

        let record = Self::fetch_purchase(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("purchase {id} vanished after update")))?;
        tx.commit().await?;
        Ok(record)
    }

    async fn refund_purchase(&self, id: PurchaseId) -> Result<(PurchaseRecord, i64)> {
        let mut tx = self.pool.begin().await?;

        // Flipping the status first makes a second refund of the same
        // purchase find no pending row, so the credit can only happen once.
        let row = sqlx::query(
            "UPDATE purchases SET status = ?, settled_at = ? WHERE id = ? AND status = ? \
             RETURNING buyer, price",
        )
        .bind(PurchaseStatus::Refunded.as_str())
        .bind(Utc::now())
        .bind(id.get())
        .bind(PurchaseStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "pending purchase",
            id: id.to_string(),
        })?;

        let buyer = UserId::new(row.try_get("buyer")?);
        let price: i64 = row.try_get("price")?;

        Self::ensure_account_in(&mut tx, buyer).await?;
        let balance = Self::apply_delta_in(&mut tx, buyer, price).await?;

        let record = Self::fetch_purchase(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("purchase {id} vanished after refund")))?;
        tx.commit().await?;

        tracing::debug!(purchase_id = %id, buyer = %buyer, price, balance, "Purchase refunded");
        Ok((record, balance))
    }

    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseRecord>> {
        Self::fetch_purchase(&self.pool, id).await
    }

    async fn list_purchases(&self, account: UserId, limit: usize) -> Result<Vec<PurchaseRecord>> {
        sqlx::query(LIST_PURCHASES)
            .bind(account.get())
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(purchase_from_row)
            .collect()
    }

    async fn list_pending_purchases(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<PurchaseRecord>> {
        sqlx::query(LIST_PENDING)
            .bind(PurchaseStatus::Pending.as_str())
            .bind(older_than)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(purchase_from_row)
            .collect()
    }

    // =========================================================================
    // Transfers & adjustments
    // =========================================================================

    async fn record_transfer(
        &self,
        sender: UserId,
        receiver: UserId,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<TransferRecord> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(format!(
                "transfer amount must be positive, got {amount}"
            )));
        }
        if sender == receiver {
            return Err(StoreError::InvalidAmount("cannot transfer to the same account".into()));
        }

        let mut tx = self.pool.begin().await?;
        Self::ensure_account_in(&mut tx, sender).await?;
        Self::ensure_account_in(&mut tx, receiver).await?;

        let sender_balance = Self::debit_in(&mut tx, sender, amount).await?;
        let receiver_balance = Self::apply_delta_in(&mut tx, receiver, amount).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transfers (sender, receiver, amount, ts) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(sender.get())
        .bind(receiver.get())
        .bind(amount)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            transfer_id = id,
            sender = %sender,
            receiver = %receiver,
            amount,
            sender_balance,
            receiver_balance,
            "Transfer applied"
        );

        Ok(TransferRecord {
            id: TransferId::new(id),
            sender,
            receiver,
            amount,
            created_at: at,
        })
    }

    async fn list_transfers(&self, account: UserId, limit: usize) -> Result<Vec<TransferRecord>> {
        sqlx::query(
            "SELECT id, sender, receiver, amount, ts FROM transfers \
             WHERE sender = ?1 OR receiver = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(account.get())
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(transfer_from_row)
        .collect()
    }

    async fn list_adjustments(&self, account: UserId, limit: usize) -> Result<Vec<Adjustment>> {
        sqlx::query(
            "SELECT id, account, delta, reason, actor, ts FROM adjustments \
             WHERE account = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(account.get())
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(adjustment_from_row)
        .collect()
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn list_items(&self, active_only: bool) -> Result<Vec<Item>> {
        let sql = if active_only {
            "SELECT id, name, price, reference, filename, active FROM items \
             WHERE active = 1 ORDER BY id"
        } else {
            "SELECT id, name, price, reference, filename, active FROM items ORDER BY id"
        };
        sqlx::query(sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(item_from_row)
            .collect()
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        sqlx::query("SELECT id, name, price, reference, filename, active FROM items WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(item_from_row)
            .transpose()
    }

    async fn upsert_item(&self, id: Option<ItemId>, input: &ItemInput) -> Result<ItemId> {
        if input.price < 0 {
            return Err(StoreError::InvalidAmount(format!(
                "price must be non-negative, got {}",
                input.price
            )));
        }

        match id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO items (name, price, reference, filename, active) \
                     VALUES (?, ?, ?, ?, 1) RETURNING id",
                )
                .bind(&input.name)
                .bind(input.price)
                .bind(&input.reference)
                .bind(input.filename_or_default())
                .fetch_one(&self.pool)
                .await?;
                Ok(ItemId::new(id))
            }
            Some(id) => {
                sqlx::query(
                    "UPDATE items SET name = ?, price = ?, reference = ?, filename = ? \
                     WHERE id = ?",
                )
                .bind(&input.name)
                .bind(input.price)
                .bind(&input.reference)
                .bind(input.filename_or_default())
                .bind(id.get())
                .execute(&self.pool)
                .await?;
                Ok(id)
            }
        }
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn set_item_active(&self, id: ItemId, active: bool) -> Result<bool> {
        let updated = sqlx::query("UPDATE items SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id.get())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_scoped(&self, scope: ScopeId, key: &str) -> Result<Option<String>> {
        let value =
            sqlx::query_scalar("SELECT value FROM scoped_settings WHERE scope = ? AND key = ?")
                .bind(scope.get())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set_scoped(&self, scope: ScopeId, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO scoped_settings (scope, key, value) VALUES (?, ?, ?) \
             ON CONFLICT (scope, key) DO UPDATE SET value = excluded.value",
        )
        .bind(scope.get())
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_scoped(&self, scope: ScopeId, key: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM scoped_settings WHERE scope = ? AND key = ?")
            .bind(scope.get())
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

#[async_trait]
impl AdminStore for SqliteStore {
    async fn is_granted(&self, user: UserId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM admins WHERE id = ?")
            .bind(user.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn grant_admin(&self, user: UserId) -> Result<bool> {
        let inserted = sqlx::query("INSERT INTO admins (id) VALUES (?) ON CONFLICT (id) DO NOTHING")
            .bind(user.get())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(inserted > 0)
    }

    async fn revoke_admin(&self, user: UserId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM admins WHERE id = ?")
            .bind(user.get())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn list_admins(&self) -> Result<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM admins ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(UserId::new).collect())
    }
}
