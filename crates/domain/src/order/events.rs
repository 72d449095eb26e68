//! Order domain events.

use chrono::{DateTime, Utc};
use common::{CustomerId, DriverId, MerchantId, OrderId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::codes::HandoffCode;

use super::{DeliveryInfo, OrderItem, OrderPrices, OrderStatus};

/// Events recorded on an order stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderPlaced(OrderPlacedData),
    StatusChanged(StatusChangedData),
    /// Always committed in the same batch as the change into `READY_TO_DELIVER`.
    PickupCodeIssued(PickupCodeIssuedData),
    /// Always committed in the same batch as the change into `ACCEPTED_BY_DRIVER`.
    DriverAssigned(DriverAssignedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::StatusChanged(_) => "OrderStatusChanged",
            OrderEvent::PickupCodeIssued(_) => "PickupCodeIssued",
            OrderEvent::DriverAssigned(_) => "DriverAssigned",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub prices: OrderPrices,
    pub delivery_info: DeliveryInfo,
    pub delivery_code: HandoffCode,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupCodeIssuedData {
    pub code: HandoffCode,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAssignedData {
    pub driver_id: DriverId,
    pub assigned_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn status_changed(from: OrderStatus, to: OrderStatus) -> Self {
        OrderEvent::StatusChanged(StatusChangedData {
            from,
            to,
            changed_at: Utc::now(),
        })
    }

    pub fn pickup_code_issued(code: HandoffCode) -> Self {
        OrderEvent::PickupCodeIssued(PickupCodeIssuedData {
            code,
            issued_at: Utc::now(),
        })
    }

    pub fn driver_assigned(driver_id: DriverId) -> Self {
        OrderEvent::DriverAssigned(DriverAssignedData {
            driver_id,
            assigned_at: Utc::now(),
        })
    }

    /// The status this event moves the order into, if any.
    pub fn new_status(&self) -> Option<OrderStatus> {
        match self {
            OrderEvent::OrderPlaced(_) => Some(OrderStatus::Pending),
            OrderEvent::StatusChanged(data) => Some(data.to),
            OrderEvent::PickupCodeIssued(_) | OrderEvent::DriverAssigned(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        let code = HandoffCode::parse("AB12CD").unwrap();
        assert_eq!(
            OrderEvent::status_changed(OrderStatus::Pending, OrderStatus::AcceptedByMerchant)
                .event_type(),
            "OrderStatusChanged"
        );
        assert_eq!(
            OrderEvent::pickup_code_issued(code).event_type(),
            "PickupCodeIssued"
        );
        assert_eq!(
            OrderEvent::driver_assigned(DriverId::new()).event_type(),
            "DriverAssigned"
        );
    }

    #[test]
    fn status_change_serializes_with_tag_and_wire_status() {
        let event = OrderEvent::status_changed(OrderStatus::InPreparation, OrderStatus::ReadyToDeliver);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "StatusChanged");
        assert_eq!(json["data"]["from"], "IN_PREPARATION");
        assert_eq!(json["data"]["to"], "READY_TO_DELIVER");

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.new_status(), Some(OrderStatus::ReadyToDeliver));
    }
}
