//! Order read model: one record per order, kept current from the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, DriverId, MerchantId, OrderId};
use domain::{Aggregate, Order, OrderEvent, OrderItem, OrderPrices, OrderStatus};
use ledger::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// The analytics view of one order. Handoff codes are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub driver_id: Option<DriverId>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub prices: OrderPrices,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every order in the ledger, indexed by id.
#[derive(Clone, Default)]
pub struct OrderLedgerView {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl OrderLedgerView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: OrderId) -> Option<OrderRecord> {
        self.orders.read().await.get(&order_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    /// A merchant's orders, oldest first.
    pub async fn merchant_orders(&self, merchant_id: MerchantId) -> Vec<OrderRecord> {
        let orders = self.orders.read().await;
        let mut found: Vec<_> = orders
            .values()
            .filter(|o| o.merchant_id == merchant_id)
            .cloned()
            .collect();
        sort_by_creation(&mut found);
        found
    }

    /// Orders waiting for a driver, oldest first.
    pub async fn available_orders(&self) -> Vec<OrderRecord> {
        let orders = self.orders.read().await;
        let mut found: Vec<_> = orders
            .values()
            .filter(|o| o.status == OrderStatus::ReadyToDeliver)
            .cloned()
            .collect();
        sort_by_creation(&mut found);
        found
    }
}

fn sort_by_creation(orders: &mut [OrderRecord]) {
    orders.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
}

#[async_trait]
impl Projection for OrderLedgerView {
    fn name(&self) -> &'static str {
        "OrderLedgerView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.stream_type == Order::aggregate_type() {
            let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
            let order_id = event.stream_id;
            let mut orders = self.orders.write().await;

            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    orders.insert(
                        order_id,
                        OrderRecord {
                            order_id,
                            merchant_id: data.merchant_id,
                            customer_id: data.customer_id,
                            driver_id: None,
                            status: OrderStatus::Pending,
                            items: data.items,
                            prices: data.prices,
                            delivery_address: data.delivery_info.address,
                            created_at: data.placed_at,
                            updated_at: data.placed_at,
                        },
                    );
                }
                OrderEvent::StatusChanged(data) => {
                    if let Some(order) = orders.get_mut(&order_id) {
                        order.status = data.to;
                        order.updated_at = data.changed_at;
                    }
                }
                OrderEvent::DriverAssigned(data) => {
                    if let Some(order) = orders.get_mut(&order_id) {
                        order.driver_id = Some(data.driver_id);
                    }
                }
                OrderEvent::PickupCodeIssued(_) => {}
            }
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance(event.position);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.orders.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}
