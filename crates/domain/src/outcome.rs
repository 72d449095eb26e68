//! Results of committed commands and the notifications they call for.

use common::{CustomerId, MerchantId, OrderId};
use serde::{Deserialize, Serialize};

use crate::command::CommandResult;
use crate::order::{Order, OrderEvent, OrderStatus};

/// A notification owed to someone because a transition committed.
///
/// Notices are data only. Sending them is the dispatcher's job, after the
/// commit, and a failed send never undoes the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The customer's order moved to `status`.
    CustomerStatusUpdate {
        customer_id: CustomerId,
        order_id: OrderId,
        merchant_id: MerchantId,
        status: OrderStatus,
    },
    /// The order is waiting for a driver.
    OrderAvailable {
        order_id: OrderId,
        merchant_id: MerchantId,
    },
}

impl Notice {
    pub fn order_id(&self) -> OrderId {
        match self {
            Notice::CustomerStatusUpdate { order_id, .. } | Notice::OrderAvailable { order_id, .. } => {
                *order_id
            }
        }
    }
}

/// A committed transition: the order as it now stands, the events that
/// were appended, and the notices to hand to the dispatcher.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub order: Order,
    pub events: Vec<OrderEvent>,
    pub notices: Vec<Notice>,
}

impl TransitionOutcome {
    pub fn status(&self) -> OrderStatus {
        self.order.status()
    }

    pub(crate) fn from_result(order_id: OrderId, result: CommandResult<Order>) -> Self {
        let order = result.aggregate;
        let mut notices = Vec::new();

        for event in &result.events {
            let OrderEvent::StatusChanged(change) = event else {
                continue;
            };
            notices.push(Notice::CustomerStatusUpdate {
                customer_id: order.customer_id(),
                order_id,
                merchant_id: order.merchant_id(),
                status: change.to,
            });
            if change.to == OrderStatus::ReadyToDeliver {
                notices.push(Notice::OrderAvailable {
                    order_id,
                    merchant_id: order.merchant_id(),
                });
            }
        }

        Self {
            order,
            events: result.events,
            notices,
        }
    }
}
