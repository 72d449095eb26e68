//! Merchant-facing order operations.

use std::sync::Arc;

use common::{MerchantId, OrderId};
use ledger::LedgerStore;

use crate::access::{Actor, require_merchant_target, require_ownership};
use crate::codes::{CodeGenerator, HandoffCode, RandomCodeGenerator};
use crate::command::CommandHandler;
use crate::error::DomainError;
use crate::outcome::TransitionOutcome;

use super::{Order, OrderStatus, PlaceOrder};

/// Places orders and applies the merchant's side of the state machine.
///
/// Driver transitions live in [`ClaimCoordinator`](crate::ClaimCoordinator).
pub struct OrderService<S: LedgerStore> {
    handler: CommandHandler<S, Order>,
    codes: Arc<dyn CodeGenerator>,
}

impl<S: LedgerStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self::with_code_generator(store, Arc::new(RandomCodeGenerator::default()))
    }

    pub fn with_code_generator(store: S, codes: Arc<dyn CodeGenerator>) -> Self {
        Self {
            handler: CommandHandler::new(store),
            codes,
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Records a new `PENDING` order handed over by checkout.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, merchant_id = %cmd.merchant_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let delivery_code = match cmd.delivery_code.as_deref() {
            Some(raw) => HandoffCode::parse(raw)?,
            None => self.codes.generate(),
        };

        let result = self
            .handler
            .execute(cmd.order_id, |order: &Order| {
                order.place(&cmd, delivery_code)
            })
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!("order placed");
        Ok(result.aggregate)
    }

    /// Moves an order along a merchant edge.
    ///
    /// Checks run in order: the order exists, the merchant owns it, the edge
    /// is in the transition table, the edge belongs to merchants. Entering
    /// `READY_TO_DELIVER` issues the pickup code in the same write.
    #[tracing::instrument(skip(self))]
    pub async fn apply_merchant_transition(
        &self,
        order_id: OrderId,
        merchant_id: MerchantId,
        target: OrderStatus,
    ) -> Result<TransitionOutcome, DomainError> {
        let actor = Actor::merchant(merchant_id);
        let codes = Arc::clone(&self.codes);

        let result = self
            .handler
            .execute(order_id, |order: &Order| -> Result<_, DomainError> {
                let order = require_ownership(order.existing(), &actor)
                    .map_err(|e| DomainError::from_access(order_id, e))?;
                order.status().ensure_transition(target)?;
                require_merchant_target(target)?;
                Ok(order.advance(target, codes.as_ref())?)
            })
            .await?;

        metrics::counter!("order_transitions_total", "to" => target.as_str()).increment(1);
        tracing::info!(to = %target, "merchant transition committed");
        Ok(TransitionOutcome::from_result(order_id, result))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// Loads an order on behalf of `actor`, who must own it.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for(&self, order_id: OrderId, actor: Actor) -> Result<Order, DomainError> {
        let order = self.handler.load_existing(order_id).await?;
        require_ownership(order.as_ref(), &actor)
            .map_err(|e| DomainError::from_access(order_id, e))?;
        order.ok_or(DomainError::NotFound { order_id })
    }
}
