use thiserror::Error;

use crate::{OrderId, Version};

/// Errors that can occur when reading from or writing to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The stream moved past the version the writer expected.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// A wallet transaction already exists for this order.
    #[error("A wallet transaction already exists for order {order_id}")]
    DuplicateTransaction { order_id: OrderId },

    /// The batch handed to `append` is malformed.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A stored value could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
