//! Driver-side transitions: claim, start, complete, cancel.

use common::{DriverId, OrderId};
use ledger::{LedgerStore, WalletTransaction};

use crate::access::{Actor, require_ownership};
use crate::command::CommandHandler;
use crate::error::DomainError;
use crate::order::{Order, OrderStatus};
use crate::outcome::TransitionOutcome;

/// Coordinates drivers racing for ready orders.
///
/// A claim is validated against a loaded order and committed with the
/// ledger's compare-and-set on the version it was validated against. When two
/// drivers pass validation on the same version only one append lands; the
/// other sees the stream moved and gets [`DomainError::ClaimConflict`].
pub struct ClaimCoordinator<S: LedgerStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: LedgerStore> ClaimCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// `READY_TO_DELIVER` to `ACCEPTED_BY_DRIVER`, assigning `driver_id`.
    ///
    /// Fails with `NotFound`, then `CodeMismatch` (case-insensitive compare),
    /// then `InvalidTransition` when the order is not ready, and finally
    /// `ClaimConflict` when another claim committed first.
    #[tracing::instrument(skip(self, pickup_code))]
    pub async fn claim_order(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        pickup_code: &str,
    ) -> Result<TransitionOutcome, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order: &Order| -> Result<_, DomainError> {
                let order = order
                    .existing()
                    .ok_or(DomainError::NotFound { order_id })?;
                Ok(order.claim(driver_id, pickup_code)?)
            })
            .await;

        match result {
            Ok(result) => {
                metrics::counter!("order_claims_total", "outcome" => "won").increment(1);
                metrics::counter!("order_transitions_total", "to" => OrderStatus::AcceptedByDriver.as_str())
                    .increment(1);
                tracing::info!("order claimed");
                Ok(TransitionOutcome::from_result(order_id, result))
            }
            Err(DomainError::ConcurrentUpdate { .. }) => {
                metrics::counter!("order_claims_total", "outcome" => "conflict").increment(1);
                tracing::info!("claim lost to a concurrent driver");
                Err(DomainError::ClaimConflict { order_id })
            }
            Err(err) => {
                metrics::counter!("order_claims_total", "outcome" => "rejected").increment(1);
                Err(err)
            }
        }
    }

    /// `ACCEPTED_BY_DRIVER` to `ON_THE_WAY`. Only the assigned driver may start.
    ///
    /// Driver entry points check the status before the driver, so an order
    /// that is not on a driver edge reports `InvalidTransition` to everyone.
    #[tracing::instrument(skip(self))]
    pub async fn start_delivery(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
    ) -> Result<TransitionOutcome, DomainError> {
        let actor = Actor::driver(driver_id);
        let result = self
            .handler
            .execute(order_id, |order: &Order| -> Result<_, DomainError> {
                let order = order
                    .existing()
                    .ok_or(DomainError::NotFound { order_id })?;
                order.status().ensure_transition(OrderStatus::OnTheWay)?;
                require_ownership(Some(order), &actor)
                    .map_err(|e| DomainError::from_access(order_id, e))?;
                Ok(order.start_delivery()?)
            })
            .await?;

        record_transition(OrderStatus::OnTheWay);
        Ok(TransitionOutcome::from_result(order_id, result))
    }

    /// `ON_THE_WAY` to `COMPLETED`, crediting the delivery fee to the driver's
    /// wallet in the same write.
    ///
    /// A second completion fails with `InvalidTransition` before any credit is
    /// built, and the ledger's one-transaction-per-order rule backs that up
    /// under retries.
    #[tracing::instrument(skip(self, delivery_code))]
    pub async fn complete_delivery(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        delivery_code: &str,
    ) -> Result<TransitionOutcome, DomainError> {
        let actor = Actor::driver(driver_id);
        let result = self
            .handler
            .execute_with_transaction(order_id, |order: &Order| -> Result<_, DomainError> {
                let order = order
                    .existing()
                    .ok_or(DomainError::NotFound { order_id })?;
                order.status().ensure_transition(OrderStatus::Completed)?;
                require_ownership(Some(order), &actor)
                    .map_err(|e| DomainError::from_access(order_id, e))?;
                let events = order.complete(delivery_code)?;
                let credit = WalletTransaction::delivery_earning(
                    driver_id,
                    order_id,
                    order.prices().delivery_fee.cents(),
                );
                Ok((events, credit))
            })
            .await?;

        let fee = result.aggregate.prices().delivery_fee;
        metrics::counter!("driver_credits_total").increment(1);
        record_transition(OrderStatus::Completed);
        tracing::info!(%fee, "delivery completed and driver credited");
        Ok(TransitionOutcome::from_result(order_id, result))
    }

    /// The assigned driver abandons the delivery.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_delivery(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
    ) -> Result<TransitionOutcome, DomainError> {
        let actor = Actor::driver(driver_id);
        let result = self
            .handler
            .execute(order_id, |order: &Order| -> Result<_, DomainError> {
                let order = order
                    .existing()
                    .ok_or(DomainError::NotFound { order_id })?;
                order.status().ensure_transition(OrderStatus::CanceledByDriver)?;
                require_ownership(Some(order), &actor)
                    .map_err(|e| DomainError::from_access(order_id, e))?;
                Ok(order.cancel_delivery()?)
            })
            .await?;

        record_transition(OrderStatus::CanceledByDriver);
        Ok(TransitionOutcome::from_result(order_id, result))
    }
}

fn record_transition(to: OrderStatus) {
    metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
    tracing::info!(%to, "driver transition committed");
}
