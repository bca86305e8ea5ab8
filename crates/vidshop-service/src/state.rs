//! Application state.

use std::sync::Arc;

use vidshop_fetch::{FetchError, HttpFetcher};
use vidshop_shop::{AuditSink, Delivery, NoopAudit, Shop};
use vidshop_store::{SqliteStore, StoreError};

use crate::config::ServiceConfig;
use crate::relay::{RelayAudit, RelayClient, RelayDelivery, RelayError, UnconfiguredDelivery};

/// Errors that stop the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The database could not be opened or migrated.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// The asset fetcher could not be built.
    #[error("fetcher: {0}")]
    Fetch(#[from] FetchError),

    /// The relay client could not be built.
    #[error("relay: {0}")]
    Relay(#[from] RelayError),
}

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The storefront.
    pub shop: Shop,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Wrap an already-built shop.
    #[must_use]
    pub fn new(shop: Shop, config: ServiceConfig) -> Self {
        Self { shop, config }
    }

    /// Open the database and wire the shop to the HTTP fetcher and the relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the database, fetcher or relay client cannot be
    /// set up.
    pub async fn from_config(config: ServiceConfig) -> Result<Self, StartupError> {
        tracing::info!(path = %config.db_path, "Opening SQLite store");
        let store = Arc::new(SqliteStore::open(&config.db_path).await?);
        let fetcher = Arc::new(HttpFetcher::new()?);

        let (delivery, audit): (Arc<dyn Delivery>, Arc<dyn AuditSink>) = match &config.relay_url
        {
            Some(url) => {
                let relay = RelayClient::new(url.as_str(), config.relay_secret.clone())?;
                if config.relay_secret.is_none() {
                    tracing::warn!("RELAY_SECRET not set - relay requests will be unsigned");
                }
                tracing::info!(relay_url = %url, "Relay delivery enabled");
                (
                    Arc::new(RelayDelivery::new(relay.clone(), config.max_upload_bytes)),
                    Arc::new(RelayAudit::new(relay)),
                )
            }
            None => {
                tracing::warn!("RELAY_URL not set - purchases will be refunded undelivered");
                (
                    Arc::new(UnconfiguredDelivery::new(config.max_upload_bytes)),
                    Arc::new(NoopAudit),
                )
            }
        };

        let shop = Shop::new(store, fetcher, delivery, config.shop_config()).with_audit(audit);

        Ok(Self::new(shop, config))
    }
}
