//! Integration tests for the order lifecycle.
//!
//! These drive the public services end to end against the in-memory ledger:
//! the full transition table, racing claims, code gating, and exactly-once
//! driver credit.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{CustomerId, DriverId, MerchantId, OrderId};
use domain::{
    ClaimCoordinator, DeliveryInfo, DomainError, ErrorKind, FixedCodeGenerator, HandoffCode, Money,
    Notice, OrderEvent, OrderItem, OrderPrices, OrderService, OrderStatus, PlaceOrder,
};
use ledger::{
    AppendOptions, EventEnvelope, EventStream, InMemoryLedger, LedgerStore,
    LedgerStoreExt, Result as LedgerResult, Version, WalletTransaction,
};
use tokio::sync::Barrier;

const PICKUP_CODE: &str = "AB12CD";
const DELIVERY_CODE: &str = "Knock5";
const DELIVERY_FEE: i64 = 450;

/// An in-memory ledger that can hold writers at the door until all of them
/// have arrived, so racing commands are guaranteed to validate against the
/// same version.
#[derive(Clone, Default)]
struct RendezvousLedger {
    inner: InMemoryLedger,
    gate: Arc<Mutex<Option<Arc<Barrier>>>>,
}

impl RendezvousLedger {
    fn arm(&self, parties: usize) {
        *self.gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    fn disarm(&self) {
        *self.gate.lock().unwrap() = None;
    }

    async fn wait_at_gate(&self) {
        let barrier = self.gate.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl LedgerStore for RendezvousLedger {
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> LedgerResult<Version> {
        self.wait_at_gate().await;
        self.inner.append(events, options).await
    }

    async fn append_with_transaction(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
        transaction: WalletTransaction,
    ) -> LedgerResult<Version> {
        self.wait_at_gate().await;
        self.inner
            .append_with_transaction(events, options, transaction)
            .await
    }

    async fn get_stream(&self, stream_id: OrderId) -> LedgerResult<Vec<EventEnvelope>> {
        self.inner.get_stream(stream_id).await
    }

    async fn stream_all_events(&self, after_position: i64) -> LedgerResult<EventStream> {
        self.inner.stream_all_events(after_position).await
    }

    async fn stream_version(&self, stream_id: OrderId) -> LedgerResult<Option<Version>> {
        self.inner.stream_version(stream_id).await
    }

    async fn transaction_for_order(
        &self,
        order_id: OrderId,
    ) -> LedgerResult<Option<WalletTransaction>> {
        self.inner.transaction_for_order(order_id).await
    }

    async fn wallet_transactions(&self, wallet_id: DriverId) -> LedgerResult<Vec<WalletTransaction>> {
        self.inner.wallet_transactions(wallet_id).await
    }
}

struct Marketplace<S: LedgerStore + Clone> {
    ledger: S,
    orders: OrderService<S>,
    claims: ClaimCoordinator<S>,
    merchant: MerchantId,
}

impl<S: LedgerStore + Clone> Marketplace<S> {
    fn new(ledger: S) -> Self {
        let pickup = HandoffCode::parse(PICKUP_CODE).unwrap();
        Self {
            orders: OrderService::with_code_generator(
                ledger.clone(),
                Arc::new(FixedCodeGenerator::new(pickup)),
            ),
            claims: ClaimCoordinator::new(ledger.clone()),
            ledger,
            merchant: MerchantId::new(),
        }
    }

    async fn place(&self) -> OrderId {
        let cmd = PlaceOrder::new(
            self.merchant,
            CustomerId::new(),
            vec![
                OrderItem::new("sku-1", "Margherita", 1, Money::from_cents(1400)),
                OrderItem::new("sku-2", "Lemonade", 2, Money::from_cents(300)),
            ],
            OrderPrices {
                subtotal: Money::from_cents(2000),
                shipping: Money::zero(),
                discount: Money::from_cents(200),
                delivery_fee: Money::from_cents(DELIVERY_FEE),
                total: Money::from_cents(2250),
            },
            DeliveryInfo {
                address: "12 Harbour St".to_string(),
                contact: "555-0101".to_string(),
                notes: None,
            },
        )
        .with_delivery_code(DELIVERY_CODE);
        let order_id = cmd.order_id;
        self.orders.place_order(cmd).await.unwrap();
        order_id
    }

    async fn merchant(&self, order_id: OrderId, targets: &[OrderStatus]) {
        for target in targets {
            self.orders
                .apply_merchant_transition(order_id, self.merchant, *target)
                .await
                .unwrap();
        }
    }

    async fn ready(&self) -> OrderId {
        let order_id = self.place().await;
        self.merchant(
            order_id,
            &[
                OrderStatus::AcceptedByMerchant,
                OrderStatus::InPreparation,
                OrderStatus::ReadyToDeliver,
            ],
        )
        .await;
        order_id
    }

    async fn on_the_way(&self, driver: DriverId) -> OrderId {
        let order_id = self.ready().await;
        self.claims.claim_order(order_id, driver, PICKUP_CODE).await.unwrap();
        self.claims.start_delivery(order_id, driver).await.unwrap();
        order_id
    }

    /// Builds an order sitting in `status` through the public entry points.
    /// `REJECTED_BY_DRIVER` has no inbound edge, so that one is written to the
    /// ledger directly, the way a stored legacy order would look.
    async fn order_in(&self, status: OrderStatus) -> OrderId {
        use OrderStatus::*;
        match status {
            Pending => self.place().await,
            AcceptedByMerchant | InPreparation | ReadyToDeliver => {
                let order_id = self.place().await;
                let path = [AcceptedByMerchant, InPreparation, ReadyToDeliver];
                let end = path.iter().position(|s| *s == status).unwrap();
                self.merchant(order_id, &path[..=end]).await;
                order_id
            }
            AcceptedByDriver => {
                let order_id = self.ready().await;
                self.claims
                    .claim_order(order_id, DriverId::new(), PICKUP_CODE)
                    .await
                    .unwrap();
                order_id
            }
            OnTheWay => self.on_the_way(DriverId::new()).await,
            Completed => {
                let driver = DriverId::new();
                let order_id = self.on_the_way(driver).await;
                self.claims
                    .complete_delivery(order_id, driver, DELIVERY_CODE)
                    .await
                    .unwrap();
                order_id
            }
            RejectedByMerchant => {
                let order_id = self.place().await;
                self.merchant(order_id, &[RejectedByMerchant]).await;
                order_id
            }
            RejectedByDriver => {
                let order_id = self.ready().await;
                let current = self.ledger.stream_version(order_id).await.unwrap().unwrap();
                let event = OrderEvent::status_changed(ReadyToDeliver, RejectedByDriver);
                let envelope = EventEnvelope::builder()
                    .stream_id(order_id)
                    .stream_type("Order")
                    .event_type("OrderStatusChanged")
                    .version(current.next())
                    .payload(&event)
                    .unwrap()
                    .build()
                    .unwrap();
                self.ledger
                    .append(vec![envelope], AppendOptions::expect_version(current))
                    .await
                    .unwrap();
                order_id
            }
            CanceledByMerchant => {
                let order_id = self.place().await;
                self.merchant(order_id, &[AcceptedByMerchant, CanceledByMerchant])
                    .await;
                order_id
            }
            CanceledByDriver => {
                let driver = DriverId::new();
                let order_id = self.ready().await;
                self.claims.claim_order(order_id, driver, PICKUP_CODE).await.unwrap();
                self.claims.cancel_delivery(order_id, driver).await.unwrap();
                order_id
            }
        }
    }

    async fn status(&self, order_id: OrderId) -> OrderStatus {
        self.orders.get_order(order_id).await.unwrap().unwrap().status()
    }

    /// Requests `target` through whichever entry point owns that edge.
    async fn request(&self, order_id: OrderId, target: OrderStatus) -> Result<OrderStatus, DomainError> {
        let order = self.orders.get_order(order_id).await.unwrap().unwrap();
        let driver = order.driver_id().unwrap_or_default();
        let outcome = match target {
            OrderStatus::AcceptedByDriver => {
                self.claims.claim_order(order_id, driver, PICKUP_CODE).await?
            }
            OrderStatus::OnTheWay => self.claims.start_delivery(order_id, driver).await?,
            OrderStatus::Completed => {
                self.claims
                    .complete_delivery(order_id, driver, DELIVERY_CODE)
                    .await?
            }
            OrderStatus::CanceledByDriver => self.claims.cancel_delivery(order_id, driver).await?,
            _ => {
                self.orders
                    .apply_merchant_transition(order_id, self.merchant, target)
                    .await?
            }
        };
        Ok(outcome.status())
    }
}

mod transition_table {
    use super::*;

    #[tokio::test]
    async fn every_pair_succeeds_exactly_when_it_is_an_edge() {
        let market = Marketplace::new(InMemoryLedger::new());

        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let order_id = market.order_in(from).await;
                assert_eq!(market.status(order_id).await, from);

                let result = market.request(order_id, to).await;
                if from.can_transition_to(to) {
                    assert_eq!(result.unwrap(), to, "{from} -> {to} should succeed");
                    assert_eq!(market.status(order_id).await, to);
                } else {
                    let err = result.unwrap_err();
                    assert_eq!(
                        err.kind(),
                        ErrorKind::InvalidTransition,
                        "{from} -> {to} should be rejected, got {err}"
                    );
                    assert_eq!(market.status(order_id).await, from);
                }
            }
        }
    }

    #[tokio::test]
    async fn terminal_orders_stay_put_and_pay_nothing_extra() {
        let market = Marketplace::new(InMemoryLedger::new());
        let order_id = market.order_in(OrderStatus::Completed).await;
        let events_before = market.ledger.get_stream(order_id).await.unwrap().len();

        for to in OrderStatus::ALL {
            assert!(market.request(order_id, to).await.is_err());
        }

        assert_eq!(market.ledger.get_stream(order_id).await.unwrap().len(), events_before);
        assert_eq!(market.ledger.transaction_count().await, 1);
    }
}

mod claims {
    use super::*;

    #[tokio::test]
    async fn racing_claims_have_exactly_one_winner() {
        let ledger = RendezvousLedger::default();
        let market = Marketplace::new(ledger.clone());
        let order_id = market.ready().await;

        let first = DriverId::new();
        let second = DriverId::new();
        ledger.arm(2);
        let (a, b) = tokio::join!(
            market.claims.claim_order(order_id, first, PICKUP_CODE),
            market.claims.claim_order(order_id, second, "ab12cd"),
        );
        ledger.disarm();

        let (winner, loser_err) = match (a, b) {
            (Ok(_), Err(err)) => (first, err),
            (Err(err), Ok(_)) => (second, err),
            (a, b) => panic!("expected one winner, got {a:?} and {b:?}"),
        };
        assert_eq!(loser_err.kind(), ErrorKind::ClaimConflict);

        let order = market.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::AcceptedByDriver);
        assert_eq!(order.driver_id(), Some(winner));
    }

    #[tokio::test]
    async fn wrong_pickup_code_never_changes_anything() {
        let market = Marketplace::new(InMemoryLedger::new());
        let order_id = market.ready().await;
        let driver = DriverId::new();

        for guess in ["ZZZZZZ", "AB12C", "AB12CDX", ""] {
            let err = market
                .claims
                .claim_order(order_id, driver, guess)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CodeMismatch, "guess {guess:?}");

            let order = market.orders.get_order(order_id).await.unwrap().unwrap();
            assert_eq!(order.status(), OrderStatus::ReadyToDeliver);
            assert_eq!(order.driver_id(), None);
        }

        market
            .claims
            .claim_order(order_id, driver, PICKUP_CODE)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wrong_delivery_code_never_completes_or_credits() {
        let market = Marketplace::new(InMemoryLedger::new());
        let driver = DriverId::new();
        let order_id = market.on_the_way(driver).await;

        for guess in ["knock5", "KNOCK5", "Knock", "nope"] {
            let err = market
                .claims
                .complete_delivery(order_id, driver, guess)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CodeMismatch, "guess {guess:?}");
            assert_eq!(market.status(order_id).await, OrderStatus::OnTheWay);
        }

        assert_eq!(market.ledger.wallet_balance(driver).await.unwrap(), 0);
        assert!(market.ledger.transaction_for_order(order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn another_driver_cannot_act_on_a_claimed_order() {
        let market = Marketplace::new(InMemoryLedger::new());
        let driver = DriverId::new();
        let intruder = DriverId::new();
        let order_id = market.on_the_way(driver).await;

        let err = market
            .claims
            .complete_delivery(order_id, intruder, DELIVERY_CODE)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = market
            .claims
            .cancel_delivery(order_id, intruder)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(market.status(order_id).await, OrderStatus::OnTheWay);
    }
}

mod completion {
    use super::*;

    #[tokio::test]
    async fn second_completion_is_rejected_and_credits_once() {
        let market = Marketplace::new(InMemoryLedger::new());
        let driver = DriverId::new();
        let order_id = market.on_the_way(driver).await;

        market
            .claims
            .complete_delivery(order_id, driver, DELIVERY_CODE)
            .await
            .unwrap();
        let err = market
            .claims
            .complete_delivery(order_id, driver, DELIVERY_CODE)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let transactions = market.ledger.wallet_transactions(driver).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount_cents, DELIVERY_FEE);
        assert_eq!(transactions[0].order_id, order_id);
    }

    #[tokio::test]
    async fn concurrent_completions_credit_once() {
        let ledger = RendezvousLedger::default();
        let market = Marketplace::new(ledger.clone());
        let driver = DriverId::new();
        let order_id = market.on_the_way(driver).await;

        ledger.arm(2);
        let (a, b) = tokio::join!(
            market.claims.complete_delivery(order_id, driver, DELIVERY_CODE),
            market.claims.complete_delivery(order_id, driver, DELIVERY_CODE),
        );
        ledger.disarm();

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let err = a.err().or(b.err()).unwrap();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert_eq!(market.status(order_id).await, OrderStatus::Completed);
        assert_eq!(ledger.wallet_balance(driver).await.unwrap(), DELIVERY_FEE);
        assert_eq!(ledger.wallet_transactions(driver).await.unwrap().len(), 1);
    }
}

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn order_travels_from_checkout_to_driver_wallet() {
        let market = Marketplace::new(InMemoryLedger::new());
        let order_id = market.place().await;
        assert_eq!(market.status(order_id).await, OrderStatus::Pending);

        let mut notices = Vec::new();
        for target in [
            OrderStatus::AcceptedByMerchant,
            OrderStatus::InPreparation,
            OrderStatus::ReadyToDeliver,
        ] {
            let outcome = market
                .orders
                .apply_merchant_transition(order_id, market.merchant, target)
                .await
                .unwrap();
            notices.extend(outcome.notices);
        }
        assert!(notices.iter().any(|n| matches!(n, Notice::OrderAvailable { .. })));

        let order = market.orders.get_order(order_id).await.unwrap().unwrap();
        let pickup = order.pickup_code().unwrap().as_str().to_lowercase();

        let driver = DriverId::new();
        let claimed = market.claims.claim_order(order_id, driver, &pickup).await.unwrap();
        assert_eq!(claimed.order.driver_id(), Some(driver));

        market.claims.start_delivery(order_id, driver).await.unwrap();
        let done = market
            .claims
            .complete_delivery(order_id, driver, DELIVERY_CODE)
            .await
            .unwrap();
        assert_eq!(done.status(), OrderStatus::Completed);
        assert_eq!(
            done.notices,
            vec![Notice::CustomerStatusUpdate {
                customer_id: order.customer_id(),
                order_id,
                merchant_id: market.merchant,
                status: OrderStatus::Completed,
            }]
        );

        assert_eq!(market.ledger.wallet_balance(driver).await.unwrap(), DELIVERY_FEE);

        // Replaying the stream yields the same order.
        let replayed = market.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(replayed.status(), OrderStatus::Completed);
        assert_eq!(replayed.driver_id(), Some(driver));
        assert_eq!(replayed.prices().delivery_fee, Money::from_cents(DELIVERY_FEE));
    }
}
