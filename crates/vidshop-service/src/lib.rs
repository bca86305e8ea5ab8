//! vidshop HTTP API service.
//!
//! This crate exposes the storefront to the chat command layer over HTTP:
//!
//! - Catalog, balance and history reads
//! - Quotes, purchases and transfers
//! - Admin catalog, balance, settings and grant management
//!
//! Purchased files and audit lines go back to the chat platform through a
//! relay (see [`relay`]).
//!
//! # Authentication
//!
//! Every `/v1` request must carry the shared service API key in `x-api-key`
//! and name the acting user in `x-user-id` (see [`auth`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod relay;
pub mod routes;
pub mod state;

pub use auth::Caller;
pub use config::ServiceConfig;
pub use error::ApiError;
pub use relay::{RelayAudit, RelayClient, RelayDelivery, RelayError};
pub use routes::create_router;
pub use state::{AppState, StartupError};
