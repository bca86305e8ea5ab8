//! Storefront orchestration for vidshop.
//!
//! [`Shop`] is the single entry point the command layer calls. It coordinates
//! the stores, the asset fetcher and the outbound collaborators:
//!
//! - **Purchases**: validate, debit, fetch, deliver, then commit or refund
//!   (see [`PurchaseState`]).
//! - **Transfers**: validated two-account moves on the ledger.
//! - **Admin**: catalog edits, balance adjustments, settings and grants.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidshop_core::{ItemId, UserId};
//! use vidshop_fetch::HttpFetcher;
//! use vidshop_shop::{Delivery, PurchaseRequest, Shop, ShopConfig};
//! use vidshop_store::SqliteStore;
//!
//! # async fn example(delivery: Arc<dyn Delivery>) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::open("/tmp/vidshop.db").await?);
//! let fetcher = Arc::new(HttpFetcher::new()?);
//! let shop = Shop::new(store, fetcher, delivery, ShopConfig::default());
//!
//! let receipt = shop
//!     .purchase(PurchaseRequest {
//!         buyer: UserId::new(42),
//!         item_id: ItemId::new(1),
//!         destination: None,
//!         scope: None,
//!     })
//!     .await?;
//! println!("delivered {} bytes", receipt.size_bytes);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod admin;
pub mod config;
pub mod outbound;
pub mod purchase;
pub mod shop;
pub mod state;
pub mod transfer;

pub use admin::{AdjustRequest, AdjustmentReceipt, AdminActor, RefundReceipt};
pub use config::ShopConfig;
pub use outbound::{
    AuditError, AuditEvent, AuditKind, AuditSink, Delivery, DeliveryError, DeliveryMetadata,
    NoopAudit,
};
pub use purchase::{PurchaseReceipt, PurchaseRequest, Quote};
pub use shop::Shop;
pub use state::PurchaseState;
pub use transfer::TransferRequest;
