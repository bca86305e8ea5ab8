//! Error types for vidshop storage.

use vidshop_core::ShopError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A stored value could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Record not found (or not in the state the operation requires).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record.
        entity: &'static str,
        /// The missing ID.
        id: String,
    },

    /// Insufficient balance for a debit.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance in minor units.
        balance: i64,
        /// Required amount in minor units.
        required: i64,
    },

    /// Amount failed validation.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::RecordNotFound { entity, id },
            StoreError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            StoreError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            StoreError::Database(msg) | StoreError::Migration(msg) | StoreError::Corrupt(msg) => {
                Self::Storage(msg)
            }
        }
    }
}
