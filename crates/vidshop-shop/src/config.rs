//! Shop configuration.

use std::time::Duration;

use vidshop_core::AdminPolicy;
use vidshop_fetch::DEFAULT_FETCH_DEADLINE;

/// Default number of history rows returned.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Largest history page a caller may request.
pub const MAX_HISTORY_LIMIT: usize = 50;

/// Default upper bound on handing one file to the delivery channel.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunables for a [`Shop`](crate::Shop).
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Wall-clock limit for one asset download.
    pub fetch_deadline: Duration,

    /// Longest a delivery may take once the file is fetched.
    pub delivery_timeout: Duration,

    /// Static admin allow-set.
    pub admin_policy: AdminPolicy,

    /// Cap applied to history and transfer listings.
    pub max_history_limit: usize,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            fetch_deadline: DEFAULT_FETCH_DEADLINE,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            admin_policy: AdminPolicy::default(),
            max_history_limit: MAX_HISTORY_LIMIT,
        }
    }
}

impl ShopConfig {
    /// Clamp a requested page size to `1..=max_history_limit`.
    #[must_use]
    pub fn history_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, self.max_history_limit.max(1))
    }

    /// How long a purchase can legitimately stay pending: a full download
    /// followed by a full delivery.
    #[must_use]
    pub fn settle_window(&self) -> Duration {
        self.fetch_deadline.saturating_add(self.delivery_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_is_clamped() {
        let config = ShopConfig::default();
        assert_eq!(config.history_limit(None), DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.history_limit(Some(0)), 1);
        assert_eq!(config.history_limit(Some(500)), MAX_HISTORY_LIMIT);
    }

    #[test]
    fn settle_window_covers_fetch_and_delivery() {
        let config = ShopConfig {
            fetch_deadline: Duration::from_secs(30),
            delivery_timeout: Duration::from_secs(60),
            ..ShopConfig::default()
        };
        assert_eq!(config.settle_window(), Duration::from_secs(90));
    }
}
