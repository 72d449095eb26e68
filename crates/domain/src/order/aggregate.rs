//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, DriverId, MerchantId, OrderId};
use ledger::Version;

use crate::aggregate::Aggregate;
use crate::codes::{CodeGenerator, HandoffCode};

use super::{
    DeliveryInfo, Money, OrderError, OrderEvent, OrderItem, OrderPrices, OrderStatus, PlaceOrder,
    events::OrderPlacedData,
};

/// Order aggregate root.
///
/// Status only moves along the transition table. `driver_id` is set once, by
/// the claim, and `pickup_code` is issued once, on entering `READY_TO_DELIVER`.
#[derive(Debug, Clone, Default)]
pub struct Order {
    id: Option<OrderId>,
    version: Version,
    merchant_id: MerchantId,
    customer_id: CustomerId,
    driver_id: Option<DriverId>,
    status: OrderStatus,
    items: Vec<OrderItem>,
    prices: Option<OrderPrices>,
    delivery_info: DeliveryInfo,
    pickup_code: Option<HandoffCode>,
    delivery_code: Option<HandoffCode>,
    created_at: DateTime<Utc>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<OrderId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::StatusChanged(data) => self.status = data.to,
            OrderEvent::PickupCodeIssued(data) => {
                if self.pickup_code.is_none() {
                    self.pickup_code = Some(data.code);
                }
            }
            OrderEvent::DriverAssigned(data) => {
                if self.driver_id.is_none() {
                    self.driver_id = Some(data.driver_id);
                }
            }
        }
    }
}

// Queries
impl Order {
    /// `Some(self)` once the order has been placed.
    pub fn existing(&self) -> Option<&Order> {
        self.id.map(|_| self)
    }

    pub fn merchant_id(&self) -> MerchantId {
        self.merchant_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn driver_id(&self) -> Option<DriverId> {
        self.driver_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn prices(&self) -> OrderPrices {
        self.prices.unwrap_or(OrderPrices {
            subtotal: Money::zero(),
            shipping: Money::zero(),
            discount: Money::zero(),
            total: Money::zero(),
            delivery_fee: Money::zero(),
        })
    }

    pub fn delivery_info(&self) -> &DeliveryInfo {
        &self.delivery_info
    }

    pub fn pickup_code(&self) -> Option<&HandoffCode> {
        self.pickup_code.as_ref()
    }

    pub fn delivery_code(&self) -> Option<&HandoffCode> {
        self.delivery_code.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Commands (return events)
impl Order {
    /// Validates a checkout placement.
    pub fn place(
        &self,
        cmd: &PlaceOrder,
        delivery_code: HandoffCode,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if cmd.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::NegativeAmount {
                    field: format!("unit price of {}", item.product_id),
                    amount: item.unit_price,
                });
            }
            if item.checked_line_total().is_none() {
                return Err(OrderError::AmountOverflow {
                    field: format!("line total of {}", item.product_id),
                });
            }
        }

        let prices = &cmd.prices;
        for (field, amount) in [
            ("subtotal", prices.subtotal),
            ("shipping", prices.shipping),
            ("discount", prices.discount),
            ("delivery_fee", prices.delivery_fee),
            ("total", prices.total),
        ] {
            if amount.is_negative() {
                return Err(OrderError::NegativeAmount {
                    field: field.to_string(),
                    amount,
                });
            }
        }
        let expected = prices
            .expected_total()
            .ok_or_else(|| OrderError::AmountOverflow {
                field: "total".to_string(),
            })?;
        if expected != prices.total {
            return Err(OrderError::PriceMismatch {
                expected,
                actual: prices.total,
            });
        }
        if cmd.delivery_info.address.trim().is_empty() {
            return Err(OrderError::MissingAddress);
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: cmd.order_id,
            merchant_id: cmd.merchant_id,
            customer_id: cmd.customer_id,
            items: cmd.items.clone(),
            prices: cmd.prices,
            delivery_info: cmd.delivery_info.clone(),
            delivery_code,
            placed_at: cmd.placed_at,
        })])
    }

    /// Moves the order along a merchant edge.
    ///
    /// Entering `READY_TO_DELIVER` issues a pickup code in the same batch,
    /// unless the order already has one.
    pub fn advance(
        &self,
        target: OrderStatus,
        codes: &dyn CodeGenerator,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.status.ensure_transition(target)?;

        let mut events = vec![OrderEvent::status_changed(self.status, target)];
        if target == OrderStatus::ReadyToDeliver && self.pickup_code.is_none() {
            events.push(OrderEvent::pickup_code_issued(codes.generate()));
        }
        Ok(events)
    }

    /// A driver takes a ready order. The code is checked before the status so
    /// a wrong guess never reveals whether the order is still available.
    /// An order that never reached `READY_TO_DELIVER` has no code to match
    /// and is simply not claimable.
    pub fn claim(
        &self,
        driver_id: DriverId,
        supplied_code: &str,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let not_claimable = OrderError::InvalidTransition {
            from: self.status,
            to: OrderStatus::AcceptedByDriver,
        };
        let Some(code) = &self.pickup_code else {
            return Err(not_claimable);
        };
        if !code.matches_ignore_case(supplied_code) {
            return Err(OrderError::PickupCodeMismatch);
        }
        if self.status != OrderStatus::ReadyToDeliver {
            return Err(not_claimable);
        }

        Ok(vec![
            OrderEvent::status_changed(self.status, OrderStatus::AcceptedByDriver),
            OrderEvent::driver_assigned(driver_id),
        ])
    }

    pub fn start_delivery(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.status.ensure_transition(OrderStatus::OnTheWay)?;
        Ok(vec![OrderEvent::status_changed(
            self.status,
            OrderStatus::OnTheWay,
        )])
    }

    /// Status is checked first so a repeated completion fails before any
    /// credit is considered.
    pub fn complete(&self, supplied_code: &str) -> Result<Vec<OrderEvent>, OrderError> {
        self.status.ensure_transition(OrderStatus::Completed)?;

        let code_ok = self
            .delivery_code
            .as_ref()
            .is_some_and(|code| code.matches_exact(supplied_code));
        if !code_ok {
            return Err(OrderError::DeliveryCodeMismatch);
        }

        Ok(vec![OrderEvent::status_changed(
            self.status,
            OrderStatus::Completed,
        )])
    }

    pub fn cancel_delivery(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.status.ensure_transition(OrderStatus::CanceledByDriver)?;
        Ok(vec![OrderEvent::status_changed(
            self.status,
            OrderStatus::CanceledByDriver,
        )])
    }
}

// Event application
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.merchant_id = data.merchant_id;
        self.customer_id = data.customer_id;
        self.status = OrderStatus::Pending;
        self.items = data.items;
        self.prices = Some(data.prices);
        self.delivery_info = data.delivery_info;
        self.delivery_code = Some(data.delivery_code);
        self.created_at = data.placed_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::FixedCodeGenerator;

    fn place_cmd() -> PlaceOrder {
        PlaceOrder::new(
            MerchantId::new(),
            CustomerId::new(),
            vec![OrderItem::new("sku-1", "Burrito", 2, Money::from_cents(850))],
            OrderPrices {
                subtotal: Money::from_cents(1700),
                shipping: Money::zero(),
                discount: Money::from_cents(200),
                delivery_fee: Money::from_cents(399),
                total: Money::from_cents(1899),
            },
            DeliveryInfo {
                address: "12 Main St".to_string(),
                contact: "555-0100".to_string(),
                notes: None,
            },
        )
    }

    fn code(raw: &str) -> HandoffCode {
        HandoffCode::parse(raw).unwrap()
    }

    fn placed() -> Order {
        let mut order = Order::default();
        let events = order.place(&place_cmd(), code("Door42")).unwrap();
        order.apply_events(events);
        order
    }

    fn advanced_to(target: OrderStatus) -> Order {
        let path = [
            OrderStatus::AcceptedByMerchant,
            OrderStatus::InPreparation,
            OrderStatus::ReadyToDeliver,
        ];
        let codes = FixedCodeGenerator::new(code("AB12CD"));
        let mut order = placed();
        for step in path {
            if order.status() == target {
                break;
            }
            let events = order.advance(step, &codes).unwrap();
            order.apply_events(events);
        }
        if target == OrderStatus::AcceptedByDriver || target == OrderStatus::OnTheWay {
            let events = order.claim(DriverId::new(), "AB12CD").unwrap();
            order.apply_events(events);
        }
        if target == OrderStatus::OnTheWay {
            let events = order.start_delivery().unwrap();
            order.apply_events(events);
        }
        assert_eq!(order.status(), target);
        order
    }

    #[test]
    fn place_sets_pending_and_snapshot_fields() {
        let order = placed();
        assert!(order.existing().is_some());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.prices().total.cents(), 1899);
        assert!(order.driver_id().is_none());
        assert!(order.pickup_code().is_none());
        assert_eq!(order.delivery_code().unwrap().as_str(), "Door42");
    }

    #[test]
    fn place_twice_is_rejected() {
        let order = placed();
        assert!(matches!(
            order.place(&place_cmd(), code("X1Y2")),
            Err(OrderError::AlreadyPlaced)
        ));
    }

    #[test]
    fn place_validates_items_and_prices() {
        let order = Order::default();

        let mut cmd = place_cmd();
        cmd.items.clear();
        assert!(matches!(order.place(&cmd, code("A1B2")), Err(OrderError::NoItems)));

        let mut cmd = place_cmd();
        cmd.items[0].quantity = 0;
        assert!(matches!(
            order.place(&cmd, code("A1B2")),
            Err(OrderError::InvalidQuantity { quantity: 0, .. })
        ));

        let mut cmd = place_cmd();
        cmd.prices.total = Money::from_cents(1);
        assert!(matches!(
            order.place(&cmd, code("A1B2")),
            Err(OrderError::PriceMismatch { expected, .. }) if expected.cents() == 1899
        ));

        let mut cmd = place_cmd();
        cmd.delivery_info.address = "  ".to_string();
        assert!(matches!(
            order.place(&cmd, code("A1B2")),
            Err(OrderError::MissingAddress)
        ));
    }

    #[test]
    fn place_rejects_amounts_that_overflow() {
        let order = Order::default();

        let mut cmd = place_cmd();
        cmd.prices = OrderPrices {
            subtotal: Money::from_cents(i64::MAX),
            shipping: Money::zero(),
            discount: Money::zero(),
            delivery_fee: Money::from_cents(1),
            total: Money::zero(),
        };
        let err = order.place(&cmd, code("A1B2")).unwrap_err();
        assert!(matches!(&err, OrderError::AmountOverflow { field } if field == "total"));
        assert_eq!(
            crate::DomainError::from(err).kind(),
            crate::ErrorKind::Validation
        );

        let mut cmd = place_cmd();
        cmd.items[0].quantity = 3;
        cmd.items[0].unit_price = Money::from_cents(i64::MAX / 2);
        assert!(matches!(
            order.place(&cmd, code("A1B2")),
            Err(OrderError::AmountOverflow { field }) if field.starts_with("line total")
        ));
    }

    #[test]
    fn entering_ready_issues_pickup_code_once() {
        let order = advanced_to(OrderStatus::InPreparation);
        let codes = FixedCodeGenerator::new(code("AB12CD"));

        let events = order.advance(OrderStatus::ReadyToDeliver, &codes).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], OrderEvent::PickupCodeIssued(_)));

        let mut order = order;
        order.apply_events(events);
        assert_eq!(order.pickup_code().unwrap().as_str(), "AB12CD");

        // A replayed issue event does not overwrite the first code.
        order.apply(OrderEvent::pickup_code_issued(code("ZZZZ99")));
        assert_eq!(order.pickup_code().unwrap().as_str(), "AB12CD");
    }

    #[test]
    fn claim_checks_code_before_status() {
        let order = advanced_to(OrderStatus::ReadyToDeliver);
        assert!(matches!(
            order.claim(DriverId::new(), "WRONG1"),
            Err(OrderError::PickupCodeMismatch)
        ));

        let taken = advanced_to(OrderStatus::AcceptedByDriver);
        assert!(matches!(
            taken.claim(DriverId::new(), "WRONG1"),
            Err(OrderError::PickupCodeMismatch)
        ));
        assert!(matches!(
            taken.claim(DriverId::new(), "ab12cd"),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn order_without_pickup_code_is_not_claimable() {
        let order = advanced_to(OrderStatus::InPreparation);
        assert!(matches!(
            order.claim(DriverId::new(), "AB12CD"),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::InPreparation,
                to: OrderStatus::AcceptedByDriver
            })
        ));
    }

    #[test]
    fn claim_assigns_driver_once() {
        let mut order = advanced_to(OrderStatus::ReadyToDeliver);
        let driver = DriverId::new();
        let events = order.claim(driver, "ab12cd").unwrap();
        order.apply_events(events);

        assert_eq!(order.status(), OrderStatus::AcceptedByDriver);
        assert_eq!(order.driver_id(), Some(driver));

        order.apply(OrderEvent::driver_assigned(DriverId::new()));
        assert_eq!(order.driver_id(), Some(driver));
    }

    #[test]
    fn complete_requires_on_the_way_and_exact_code() {
        let accepted = advanced_to(OrderStatus::AcceptedByDriver);
        assert!(matches!(
            accepted.complete("Door42"),
            Err(OrderError::InvalidTransition { .. })
        ));

        let on_the_way = advanced_to(OrderStatus::OnTheWay);
        assert!(matches!(
            on_the_way.complete("door42"),
            Err(OrderError::DeliveryCodeMismatch)
        ));
        assert_eq!(on_the_way.complete("Door42").unwrap().len(), 1);
    }

    #[test]
    fn cancel_delivery_from_driver_states_only() {
        assert!(advanced_to(OrderStatus::AcceptedByDriver).cancel_delivery().is_ok());
        assert!(advanced_to(OrderStatus::OnTheWay).cancel_delivery().is_ok());
        assert!(advanced_to(OrderStatus::ReadyToDeliver).cancel_delivery().is_err());
    }
}
