//! Common test utilities for shop integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use vidshop_core::{AdminPolicy, Destination, ItemId, ItemInput, ScopeId, UserId};
use vidshop_fetch::{deadline_seconds, AssetFetcher, FetchError, FetchedAsset};
use vidshop_shop::{
    AuditError, AuditEvent, AuditSink, Delivery, DeliveryError, DeliveryMetadata, Shop,
    ShopConfig,
};
use vidshop_store::{keys, CatalogStore, LedgerStore, SettingsStore, SqliteStore};

/// User in the static admin allow-set.
pub const ADMIN: UserId = UserId::new(1);

/// An ordinary buyer.
pub const BUYER: UserId = UserId::new(1001);

/// Another ordinary user.
pub const OTHER: UserId = UserId::new(1002);

/// A community scope.
pub const SCOPE: ScopeId = ScopeId::new(500);

/// Bytes served by the fake fetcher by default.
pub const CLIP: &[u8] = b"0123456789abcdef";

/// What the fake fetcher does on its next call.
#[derive(Debug, Clone)]
pub enum FetchMode {
    /// Return these bytes.
    Serve(Vec<u8>),
    /// Report a deadline overrun.
    TimedOut,
    /// Report a permission failure from the remote source.
    Forbidden,
    /// Never finish.
    Hang,
    /// Settle every pending purchase by hand while the download runs, then
    /// report a permission failure.
    SettledMeanwhile(Arc<SqliteStore>),
}

/// Asset fetcher with scripted behaviour.
pub struct FakeFetcher {
    mode: Mutex<FetchMode>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(FetchMode::Serve(CLIP.to_vec())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_mode(&self, mode: FetchMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _reference: &str,
        filename_hint: &str,
        deadline: Duration,
        _max_bytes: u64,
    ) -> Result<FetchedAsset, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            FetchMode::Serve(bytes) => FetchedAsset::from_bytes(filename_hint, &bytes).await,
            FetchMode::TimedOut => Err(FetchError::Timeout {
                seconds: deadline_seconds(deadline),
            }),
            FetchMode::Forbidden => Err(FetchError::Status { status: 403 }),
            FetchMode::SettledMeanwhile(store) => {
                let pending = store
                    .list_pending_purchases(Utc::now() + chrono::Duration::days(1))
                    .await
                    .unwrap();
                for purchase in pending {
                    store.refund_purchase(purchase.id).await.unwrap();
                }
                Err(FetchError::Status { status: 403 })
            }
            FetchMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Task("woke up".into()))
            }
        }
    }
}

/// A delivered file as seen by the fake delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub destination: Destination,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub metadata: DeliveryMetadata,
}

/// Delivery channel that records what it receives.
pub struct FakeDelivery {
    max_payload_bytes: u64,
    fail: AtomicBool,
    delivered: Mutex<Vec<Delivered>>,
}

impl FakeDelivery {
    pub fn new(max_payload_bytes: u64) -> Self {
        Self {
            max_payload_bytes,
            fail: AtomicBool::new(false),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    async fn deliver(
        &self,
        destination: &Destination,
        asset: &FetchedAsset,
        metadata: &DeliveryMetadata,
    ) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError("recipient has direct messages disabled".into()));
        }
        let bytes = tokio::fs::read(asset.path())
            .await
            .map_err(|e| DeliveryError(e.to_string()))?;
        self.delivered.lock().unwrap().push(Delivered {
            destination: destination.clone(),
            file_name: asset.file_name().to_string(),
            bytes,
            metadata: metadata.clone(),
        });
        Ok(())
    }
}

/// Audit sink that records events, optionally failing every emit.
pub struct RecordingAudit {
    fail: AtomicBool,
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn emit(&self, event: &AuditEvent) -> Result<(), AuditError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuditError("log channel unreachable".into()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Test harness wiring a shop to an in-memory store and fakes.
pub struct TestShop {
    pub shop: Shop,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub delivery: Arc<FakeDelivery>,
    pub audit: Arc<RecordingAudit>,
}

impl TestShop {
    /// A shop with a 1 KiB delivery limit and a 2 second fetch deadline.
    pub async fn new() -> Self {
        Self::with_config(ShopConfig {
            fetch_deadline: Duration::from_secs(2),
            admin_policy: AdminPolicy::new([ADMIN]),
            ..ShopConfig::default()
        })
        .await
    }

    pub async fn with_config(config: ShopConfig) -> Self {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let fetcher = Arc::new(FakeFetcher::new());
        let delivery = Arc::new(FakeDelivery::new(1024));
        let audit = Arc::new(RecordingAudit::new());

        let shop = Shop::new(store.clone(), fetcher.clone(), delivery.clone(), config)
            .with_audit(audit.clone());

        Self {
            shop,
            store,
            fetcher,
            delivery,
            audit,
        }
    }

    /// Add an active item directly through the store.
    pub async fn add_item(&self, name: &str, price: i64) -> ItemId {
        self.store
            .upsert_item(
                None,
                &ItemInput {
                    name: name.to_string(),
                    price,
                    reference: format!("https://drive.google.com/file/d/{name}-0123456789/view"),
                    filename: name.to_string(),
                },
            )
            .await
            .unwrap()
    }

    /// Credit a user directly through the store.
    pub async fn fund(&self, user: UserId, amount: i64) {
        self.store.adjust_balance(user, amount).await.unwrap();
    }

    pub async fn balance(&self, user: UserId) -> i64 {
        self.store.get_balance(user).await.unwrap()
    }

    /// Give `SCOPE` a log channel so audit events are emitted.
    pub async fn enable_audit(&self) {
        self.store
            .set_scoped(SCOPE, keys::LOG_CHANNEL, "log-channel")
            .await
            .unwrap();
    }
}
