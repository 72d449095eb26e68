//! Order placement command.

use chrono::{DateTime, Utc};
use common::{CustomerId, MerchantId, OrderId};

use super::{DeliveryInfo, OrderItem, OrderPrices};

/// Places a new order in `PENDING`.
///
/// Sent by the checkout collaborator once cart and payment are settled. Prices
/// are computed there; the order only checks they add up.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub prices: OrderPrices,
    pub delivery_info: DeliveryInfo,
    /// Generated when absent.
    pub delivery_code: Option<String>,
    pub placed_at: DateTime<Utc>,
}

impl PlaceOrder {
    pub fn new(
        merchant_id: MerchantId,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        prices: OrderPrices,
        delivery_info: DeliveryInfo,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            merchant_id,
            customer_id,
            items,
            prices,
            delivery_info,
            delivery_code: None,
            placed_at: Utc::now(),
        }
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn with_delivery_code(mut self, code: impl Into<String>) -> Self {
        self.delivery_code = Some(code.into());
        self
    }

    /// Backdates the order. Used by imports and analytics fixtures.
    pub fn placed_at(mut self, at: DateTime<Utc>) -> Self {
        self.placed_at = at;
        self
    }
}
