//! Database schema definitions.
//!
//! The tables themselves are created by the migrations under `migrations/`.

/// Table names used by the SQLite store.
pub mod table {
    /// Account balances, keyed by user ID.
    pub const ACCOUNTS: &str = "accounts";

    /// Catalog items, keyed by monotonic item ID.
    pub const ITEMS: &str = "items";

    /// Purchase records. `item` is a non-enforced reference.
    pub const PURCHASES: &str = "purchases";

    /// Transfer records.
    pub const TRANSFERS: &str = "transfers";

    /// Admin balance adjustments (top-ups).
    pub const ADJUSTMENTS: &str = "adjustments";

    /// Stored admin grants.
    pub const ADMINS: &str = "admins";

    /// Global key/value settings.
    pub const SETTINGS: &str = "settings";

    /// Per-scope key/value settings.
    pub const SCOPED_SETTINGS: &str = "scoped_settings";
}

/// Returns all table names created by the migrations.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![
        table::ACCOUNTS,
        table::ITEMS,
        table::PURCHASES,
        table::TRANSFERS,
        table::ADJUSTMENTS,
        table::ADMINS,
        table::SETTINGS,
        table::SCOPED_SETTINGS,
    ]
}
