//! Domain error types.

use common::OrderId;
use ledger::LedgerError;
use serde::Serialize;
use thiserror::Error;

use crate::access::AccessError;
use crate::order::OrderError;

/// Errors returned by the order entry points.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    Order(#[from] OrderError),

    #[error("{0}")]
    Access(#[from] AccessError),

    #[error("Order {order_id} not found")]
    NotFound { order_id: OrderId },

    /// Another driver claimed the order first.
    #[error("Order {order_id} was already taken by another driver")]
    ClaimConflict { order_id: OrderId },

    /// The order changed between load and commit.
    #[error("Order {order_id} was modified concurrently")]
    ConcurrentUpdate { order_id: OrderId },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a caller needs to react to a failure. Every variant maps to a
/// distinct response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    InvalidTransition,
    ClaimConflict,
    CodeMismatch,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::ClaimConflict => "claim_conflict",
            ErrorKind::CodeMismatch => "code_mismatch",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl DomainError {
    /// Attaches the order id to a bare `AccessError::NotFound`.
    pub fn from_access(order_id: OrderId, err: AccessError) -> Self {
        match err {
            AccessError::NotFound => DomainError::NotFound { order_id },
            other => DomainError::Access(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(err) => match err {
                OrderError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                OrderError::PickupCodeMismatch | OrderError::DeliveryCodeMismatch => {
                    ErrorKind::CodeMismatch
                }
                OrderError::AlreadyPlaced => ErrorKind::Conflict,
                OrderError::NoItems
                | OrderError::InvalidQuantity { .. }
                | OrderError::NegativeAmount { .. }
                | OrderError::PriceMismatch { .. }
                | OrderError::AmountOverflow { .. }
                | OrderError::MissingAddress
                | OrderError::InvalidCode { .. }
                | OrderError::UnknownStatus { .. } => ErrorKind::Validation,
            },
            DomainError::Access(AccessError::NotFound) | DomainError::NotFound { .. } => {
                ErrorKind::NotFound
            }
            DomainError::Access(_) => ErrorKind::Unauthorized,
            DomainError::ClaimConflict { .. } => ErrorKind::ClaimConflict,
            DomainError::ConcurrentUpdate { .. } => ErrorKind::Conflict,
            DomainError::Ledger(
                LedgerError::ConcurrencyConflict { .. } | LedgerError::DuplicateTransaction { .. },
            ) => ErrorKind::Conflict,
            DomainError::Ledger(_) | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }
}
