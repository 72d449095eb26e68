use std::pin::Pin;

use async_trait::async_trait;
use common::DriverId;
use futures_core::Stream;

use crate::{EventEnvelope, LedgerError, OrderId, Result, Version, WalletTransaction};

/// Options for appending events to a stream.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Version the stream must be at for the append to land.
    /// `None` skips the check and should only be used by tooling.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Events in commit order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Durable storage for order streams and wallet transactions.
///
/// Every write is conditional: order streams are compare-and-set on their
/// version and wallet transactions are unique per order. Implementations must
/// enforce both atomically rather than by reading first and writing after.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends a batch of events to one stream.
    ///
    /// The batch lands entirely or not at all. With `expected_version` set the
    /// call fails with [`LedgerError::ConcurrencyConflict`] if the stream moved.
    /// Returns the stream version after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// Appends events and inserts a wallet transaction in the same atomic write.
    ///
    /// Fails with [`LedgerError::DuplicateTransaction`] when the order already
    /// has a transaction; in that case none of the events are committed either.
    async fn append_with_transaction(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
        transaction: WalletTransaction,
    ) -> Result<Version>;

    /// All events of a stream, oldest first.
    async fn get_stream(&self, stream_id: OrderId) -> Result<Vec<EventEnvelope>>;

    /// Streams every event committed after `after_position`, in commit order.
    async fn stream_all_events(&self, after_position: i64) -> Result<EventStream>;

    /// Current version of a stream, or `None` if it has no events.
    async fn stream_version(&self, stream_id: OrderId) -> Result<Option<Version>>;

    async fn transaction_for_order(&self, order_id: OrderId) -> Result<Option<WalletTransaction>>;

    /// Transactions of one wallet, oldest first.
    async fn wallet_transactions(&self, wallet_id: DriverId) -> Result<Vec<WalletTransaction>>;
}

/// Convenience methods available on every [`LedgerStore`].
#[async_trait]
pub trait LedgerStoreExt: LedgerStore {
    /// Sum of every transaction in a wallet, in cents.
    async fn wallet_balance(&self, wallet_id: DriverId) -> Result<i64> {
        Ok(self
            .wallet_transactions(wallet_id)
            .await?
            .iter()
            .map(|tx| tx.amount_cents)
            .sum())
    }
}

impl<T: LedgerStore + ?Sized> LedgerStoreExt for T {}

/// Checks that a batch targets one stream with consecutive versions that
/// continue from `expected_version` when it is set.
pub fn validate_append(events: &[EventEnvelope], options: &AppendOptions) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(LedgerError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    if let Some(expected) = options.expected_version
        && first.version != expected.next()
    {
        return Err(LedgerError::InvalidAppend(format!(
            "first event carries version {}, expected {}",
            first.version,
            expected.next()
        )));
    }

    let mut version = first.version;
    for event in events.iter().skip(1) {
        if event.stream_id != first.stream_id || event.stream_type != first.stream_type {
            return Err(LedgerError::InvalidAppend(
                "all events in a batch must target the same stream".to_string(),
            ));
        }
        version = version.next();
        if event.version != version {
            return Err(LedgerError::InvalidAppend(format!(
                "versions must be consecutive: expected {version}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stream_id: OrderId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .stream_id(stream_id)
            .stream_type("Order")
            .event_type("Test")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_empty_batch() {
        assert!(matches!(
            validate_append(&[], &AppendOptions::new()),
            Err(LedgerError::InvalidAppend(_))
        ));
    }

    #[test]
    fn rejects_gaps_and_mixed_streams() {
        let id = OrderId::new();
        let gap = [event(id, 1), event(id, 3)];
        assert!(validate_append(&gap, &AppendOptions::new()).is_err());

        let mixed = [event(id, 1), event(OrderId::new(), 2)];
        assert!(validate_append(&mixed, &AppendOptions::new()).is_err());
    }

    #[test]
    fn first_version_must_follow_expected() {
        let id = OrderId::new();
        let batch = [event(id, 3), event(id, 4)];
        assert!(validate_append(&batch, &AppendOptions::expect_version(Version::new(2))).is_ok());
        assert!(validate_append(&batch, &AppendOptions::expect_new()).is_err());
    }
}
