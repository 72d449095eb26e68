//! Recipients and payloads handed to a [`NotificationChannel`](crate::NotificationChannel).

use common::{CustomerId, DriverId, OrderId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Customer(CustomerId),
    Driver(DriverId),
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::Customer(id) => write!(f, "customer:{id}"),
            Recipient::Driver(id) => write!(f, "driver:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Sent to the customer after every committed transition.
    StatusUpdate {
        order_id: OrderId,
        status: OrderStatus,
        merchant_name: String,
    },
    /// Broadcast to the driver pool when an order is ready for pickup.
    OrderAvailable {
        order_id: OrderId,
        merchant_name: String,
        pickup_address: String,
    },
}

impl Notification {
    pub fn order_id(&self) -> OrderId {
        match self {
            Notification::StatusUpdate { order_id, .. }
            | Notification::OrderAvailable { order_id, .. } => *order_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::StatusUpdate { .. } => "status_update",
            Notification::OrderAvailable { .. } => "order_available",
        }
    }
}
