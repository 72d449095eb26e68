//! Analytics error types.

use thiserror::Error;

/// Errors that can occur while feeding the read model.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    /// Failed to deserialize an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A projection-specific error.
    #[error("Projection error: {0}")]
    Projection(String),
}

/// Errors returned by [`AnalyticsService`](crate::AnalyticsService).
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Window of {days} days is outside 1..={max}")]
    InvalidWindow { days: u32, max: u32 },

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
