//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use vidshop_core::{AdminPolicy, UserId};
use vidshop_shop::ShopConfig;

use crate::relay::RELAY_TIMEOUT;

/// Default delivery upload limit: 24 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 24 * 1024 * 1024;

/// Headroom added on top of the fetch deadline for the HTTP request timeout,
/// covering the debit, the upload to the relay and the commit.
const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(60);

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `SQLite` database file (default: "/data/vidshop.db").
    pub db_path: String,

    /// API key the command layer must present in `x-api-key`.
    pub service_api_key: Option<String>,

    /// Users that are always admins.
    pub admin_user_ids: Vec<UserId>,

    /// Wall-clock limit for one asset download, in seconds.
    pub fetch_deadline_seconds: u64,

    /// Largest file the relay accepts for delivery.
    pub max_upload_bytes: u64,

    /// Base URL of the chat relay that delivers files and audit messages.
    pub relay_url: Option<String>,

    /// Secret used to sign requests to the relay.
    pub relay_secret: Option<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            db_path: std::env::var("DB_PATH").unwrap_or(defaults.db_path),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_user_ids: std::env::var("ADMIN_USER_IDS")
                .map(|raw| parse_user_ids(&raw))
                .unwrap_or_default(),
            fetch_deadline_seconds: env_or(
                "FETCH_DEADLINE_SECONDS",
                defaults.fetch_deadline_seconds,
            ),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            relay_url: std::env::var("RELAY_URL").ok(),
            relay_secret: std::env::var("RELAY_SECRET").ok(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }

    /// The asset download deadline.
    #[must_use]
    pub fn fetch_deadline(&self) -> Duration {
        Duration::from_secs(self.fetch_deadline_seconds.max(1))
    }

    /// The HTTP request timeout, never shorter than the fetch deadline plus
    /// headroom so a purchase is not cut off mid-delivery.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
            .max(self.fetch_deadline() + REQUEST_TIMEOUT_HEADROOM)
    }

    /// Shop tunables derived from this configuration.
    #[must_use]
    pub fn shop_config(&self) -> ShopConfig {
        ShopConfig {
            fetch_deadline: self.fetch_deadline(),
            delivery_timeout: RELAY_TIMEOUT,
            admin_policy: AdminPolicy::new(self.admin_user_ids.iter().copied()),
            ..ShopConfig::default()
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            db_path: "/data/vidshop.db".into(),
            service_api_key: None,
            admin_user_ids: Vec::new(),
            fetch_deadline_seconds: vidshop_fetch::DEFAULT_FETCH_DEADLINE.as_secs(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            relay_url: None,
            relay_secret: None,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 180,
        }
    }
}

/// Read and parse an environment variable, falling back to `default` when it
/// is unset or malformed.
fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "Ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}

/// Parse a comma-separated list of user IDs, skipping blanks and bad entries.
fn parse_user_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(entry = %s, error = %e, "Ignoring invalid admin user ID");
                None
            }
        })
        .collect()
}
