use std::sync::Arc;

use async_trait::async_trait;
use common::DriverId;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, LedgerError, OrderId, Result, Version, WalletTransaction,
    store::{AppendOptions, EventStream, LedgerStore, validate_append},
};

#[derive(Default)]
struct LedgerState {
    /// Committed events in commit order; `position` is index + 1.
    events: Vec<EventEnvelope>,
    transactions: Vec<WalletTransaction>,
}

impl LedgerState {
    fn stream_version(&self, stream_id: OrderId) -> Version {
        self.events
            .iter()
            .filter(|e| e.stream_id == stream_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial())
    }

    /// Applies the same rules the `events` table enforces with its
    /// `(stream_id, version)` unique key.
    fn check_append(&self, events: &[EventEnvelope], options: &AppendOptions) -> Result<()> {
        validate_append(events, options)?;

        let first = &events[0];
        let current = self.stream_version(first.stream_id);

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(LedgerError::ConcurrencyConflict {
                order_id: first.stream_id,
                expected,
                actual: current,
            });
        }

        if first.version != current.next() {
            return Err(LedgerError::ConcurrencyConflict {
                order_id: first.stream_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        Ok(())
    }

    fn commit(&mut self, events: Vec<EventEnvelope>) -> Version {
        let mut last = Version::initial();
        for mut event in events {
            event.position = self.events.len() as i64 + 1;
            last = event.version;
            self.events.push(event);
        }
        last
    }
}

/// Ledger kept entirely in memory.
///
/// One lock guards both tables so an append and its wallet transaction are
/// observed together or not at all.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let mut state = self.state.write().await;
        state.check_append(&events, &options)?;
        Ok(state.commit(events))
    }

    async fn append_with_transaction(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
        transaction: WalletTransaction,
    ) -> Result<Version> {
        let mut state = self.state.write().await;
        state.check_append(&events, &options)?;

        if state
            .transactions
            .iter()
            .any(|tx| tx.order_id == transaction.order_id)
        {
            return Err(LedgerError::DuplicateTransaction {
                order_id: transaction.order_id,
            });
        }

        let version = state.commit(events);
        state.transactions.push(transaction);
        Ok(version)
    }

    async fn get_stream(&self, stream_id: OrderId) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.stream_id == stream_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_all_events(&self, after_position: i64) -> Result<EventStream> {
        use futures_util::stream;

        let state = self.state.read().await;
        let events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.position > after_position)
            .cloned()
            .collect();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn stream_version(&self, stream_id: OrderId) -> Result<Option<Version>> {
        let state = self.state.read().await;
        let version = state.stream_version(stream_id);
        Ok((version != Version::initial()).then_some(version))
    }

    async fn transaction_for_order(&self, order_id: OrderId) -> Result<Option<WalletTransaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .find(|tx| tx.order_id == order_id)
            .cloned())
    }

    async fn wallet_transactions(&self, wallet_id: DriverId) -> Result<Vec<WalletTransaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.wallet_id == wallet_id)
            .cloned()
            .collect())
    }
}
