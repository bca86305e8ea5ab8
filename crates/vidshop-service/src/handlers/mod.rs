//! API handlers.

pub mod admin;
pub mod health;
pub mod shop;

use serde::Deserialize;

use vidshop_core::parse_amount;

use crate::error::ApiError;

/// An amount in a request body: either minor units (`1050`) or a decimal
/// string in major units (`"10.50"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// Minor units.
    Minor(i64),
    /// Decimal major units.
    Decimal(String),
}

impl AmountInput {
    /// The amount in minor units.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` if the decimal form does not parse.
    pub fn to_minor(&self) -> Result<i64, ApiError> {
        match self {
            Self::Minor(value) => Ok(*value),
            Self::Decimal(text) => {
                parse_amount(text).map_err(|e| ApiError::BadRequest(format!("amount: {e}")))
            }
        }
    }
}

/// `?limit=` for listings.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    /// Requested page size; clamped by the shop.
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_accept_both_forms() {
        let minor: AmountInput = serde_json::from_str("1050").unwrap();
        let decimal: AmountInput = serde_json::from_str(r#""10.50""#).unwrap();
        assert_eq!(minor.to_minor().unwrap(), 1050);
        assert_eq!(decimal.to_minor().unwrap(), 1050);

        let bad: AmountInput = serde_json::from_str(r#""ten""#).unwrap();
        assert!(matches!(bad.to_minor(), Err(ApiError::BadRequest(_))));
    }
}
