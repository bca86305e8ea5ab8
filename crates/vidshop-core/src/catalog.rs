//! Catalog item types.

use serde::{Deserialize, Serialize};

use crate::ItemId;

/// Filename used when an item has no delivery filename hint.
pub const DEFAULT_FILENAME: &str = "video.mp4";

/// A purchasable catalog item.
///
/// Items are never required to exist for historical purchase records; a
/// deleted item simply leaves dangling `item_id` references behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,

    /// Display name.
    pub name: String,

    /// Current price in minor units.
    pub price: i64,

    /// Remote asset reference (sharing URL or content ID).
    pub reference: String,

    /// Filename hint for the delivered asset.
    pub filename: String,

    /// Whether the item is listed for sale.
    pub active: bool,
}

impl Item {
    /// Whether the item can currently be sold.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.active
    }
}

/// Fields supplied when creating or fully updating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    /// Display name.
    pub name: String,

    /// Price in minor units (must be non-negative).
    pub price: i64,

    /// Remote asset reference.
    pub reference: String,

    /// Filename hint; empty means [`DEFAULT_FILENAME`].
    #[serde(default)]
    pub filename: String,
}

impl ItemInput {
    /// The filename hint with the default applied.
    #[must_use]
    pub fn filename_or_default(&self) -> &str {
        let trimmed = self.filename.trim();
        if trimmed.is_empty() {
            DEFAULT_FILENAME
        } else {
            trimmed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filename_uses_default() {
        let input = ItemInput {
            name: "Clip".into(),
            price: 100,
            reference: "abc".into(),
            filename: "  ".into(),
        };
        assert_eq!(input.filename_or_default(), DEFAULT_FILENAME);
    }

    #[test]
    fn filename_deserializes_as_optional() {
        let input: ItemInput =
            serde_json::from_str(r#"{"name":"Clip","price":500,"reference":"abc"}"#).unwrap();
        assert_eq!(input.filename, "");
        assert_eq!(input.filename_or_default(), "video.mp4");
    }
}
