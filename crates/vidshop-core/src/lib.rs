//! Core types and utilities for vidshop.
//!
//! This crate provides the foundational types used throughout the storefront:
//!
//! - **Identifiers**: `UserId`, `ItemId`, `PurchaseId`, `TransferId`, `AdjustmentId`, `ScopeId`
//! - **Amounts**: integer minor units with `format_amount` / `parse_amount`
//! - **Catalog**: `Item`, `ItemInput`
//! - **Ledger**: `PurchaseRecord`, `PurchaseStatus`, `TransferRecord`, `Adjustment`
//! - **Admin**: `AdminPolicy`, `AdminContext`
//! - **Errors**: `ShopError`
//!
//! # Minor units
//!
//! **1 unit = 1/100 of the display currency**
//!
//! - Item priced at 100.00 → stored as `10000`
//! - Stored as `i64` to avoid floating point rounding

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod admin;
pub mod amount;
pub mod catalog;
pub mod delivery;
pub mod error;
pub mod ids;
pub mod ledger;

pub use admin::{AdminContext, AdminPolicy};
pub use amount::{format_amount, parse_amount, AmountError};
pub use catalog::{Item, ItemInput, DEFAULT_FILENAME};
pub use delivery::Destination;
pub use error::{Result, ShopError};
pub use ids::{AdjustmentId, IdError, ItemId, PurchaseId, ScopeId, TransferId, UserId};
pub use ledger::{Adjustment, PurchaseRecord, PurchaseStatus, TransferRecord};
