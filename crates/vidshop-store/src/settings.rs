//! Setting keys and value encoding.

/// Well-known setting keys.
pub mod keys {
    /// Global: whether purchases are accepted (`"true"`/`"false"`, default open).
    pub const SHOP_OPEN: &str = "shop_open";

    /// Scoped: channel that receives purchased assets instead of a DM.
    pub const DELIVERY_CHANNEL: &str = "delivery_channel";

    /// Scoped: channel that receives audit events.
    pub const LOG_CHANNEL: &str = "log_channel";

    /// Scoped keys an admin may set.
    pub const SCOPED: &[&str] = &[DELIVERY_CHANNEL, LOG_CHANNEL];
}

/// Decode a stored boolean flag. Anything other than an explicit "off" is on.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "off" | "no" | "closed"
    )
}

/// Encode a boolean flag.
#[must_use]
pub const fn flag_value(on: bool) -> &'static str {
    if on {
        "true"
    } else {
        "false"
    }
}
