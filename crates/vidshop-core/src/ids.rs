//! Identifier types for vidshop.
//!
//! All identifiers are opaque integers. User and scope IDs come from the chat
//! platform (snowflakes); item, purchase, transfer and adjustment IDs are
//! assigned by the store and increase monotonically.
//!
//! # Macro-based ID Types
//!
//! The `int_id_type!` macro reduces boilerplate for integer identifier types,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to define an integer identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `i64` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as a bare integer)
/// - `FromStr`, `Display`, `Debug`
/// - `From<i64>`, `Into<i64>`
///
/// # Example
///
/// ```ignore
/// int_id_type!(MyId, "A custom identifier type.");
/// let id = MyId::new(42);
/// let parsed: MyId = id.to_string().parse().unwrap();
/// ```
macro_rules! int_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create an identifier from its raw integer value.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw integer value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidInteger(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

int_id_type!(
    UserId,
    "A chat-platform user identifier.\n\nEvery user ID doubles as the key of a ledger account."
);
int_id_type!(ScopeId, "A settings scope (a community/server on the chat platform).");
int_id_type!(ItemId, "A catalog item identifier, assigned by the catalog store.");
int_id_type!(PurchaseId, "A purchase record identifier, assigned by the ledger store.");
int_id_type!(TransferId, "A transfer record identifier, assigned by the ledger store.");
int_id_type!(
    AdjustmentId,
    "A balance adjustment (top-up) identifier, assigned by the ledger store."
);

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid integer.
    #[error("invalid identifier: {0:?}")]
    InvalidInteger(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::new(123_456_789_012_345_678);
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn user_id_serializes_as_bare_integer() {
        let id = UserId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let parsed: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(ItemId::from_str(" 7 ").unwrap(), ItemId::new(7));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            UserId::from_str("<@123>"),
            Err(IdError::InvalidInteger(_))
        ));
    }

    #[test]
    fn debug_includes_type_name() {
        assert_eq!(format!("{:?}", PurchaseId::new(3)), "PurchaseId(3)");
    }
}
