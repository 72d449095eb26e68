//! Core aggregate and domain event traits.

use common::OrderId;
use ledger::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name stored alongside the payload in the ledger.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates rebuilt from an order stream.
///
/// Aggregates are rebuilt by replaying events and produce new events from
/// commands. `apply` must be pure: events are facts, so applying one cannot fail.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Stream type recorded on every envelope.
    fn aggregate_type() -> &'static str;

    /// Returns `None` for an aggregate that has not been created yet.
    fn id(&self) -> Option<OrderId>;

    /// Version starts at 0 for a new aggregate and increments with each event.
    fn version(&self) -> Version;

    /// Called by the command handler after loading events.
    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
