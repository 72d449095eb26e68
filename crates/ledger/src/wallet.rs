use chrono::{DateTime, Utc};
use common::{DriverId, OrderId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// What a wallet transaction pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Driver's fee share of a completed delivery.
    DeliveryEarning,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::DeliveryEarning => "DELIVERY_EARNING",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELIVERY_EARNING" => Ok(TransactionKind::DeliveryEarning),
            other => Err(LedgerError::Corrupt(format!(
                "unknown transaction kind {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(TransactionStatus::Completed),
            other => Err(LedgerError::Corrupt(format!(
                "unknown transaction status {other}"
            ))),
        }
    }
}

/// One credit to a driver's wallet. At most one row exists per `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    /// Wallets are one per driver and share the driver's id.
    pub wallet_id: DriverId,
    pub order_id: OrderId,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// A completed delivery earning for `driver_id` on `order_id`.
    pub fn delivery_earning(driver_id: DriverId, order_id: OrderId, amount_cents: i64) -> Self {
        Self {
            id: TransactionId::new(),
            wallet_id: driver_id,
            order_id,
            amount_cents,
            kind: TransactionKind::DeliveryEarning,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        }
    }
}
