//! Command handling infrastructure.

use std::marker::PhantomData;

use common::OrderId;
use ledger::{AppendOptions, EventEnvelope, LedgerError, LedgerStore, Version, WalletTransaction};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// Loads aggregates from the ledger, runs a command against them and commits
/// the resulting events.
///
/// Every commit is conditional on the stream still being at the version the
/// command saw, so two writers that validated against the same state cannot
/// both land. The loser gets [`DomainError::ConcurrentUpdate`].
pub struct CommandHandler<S, A>
where
    S: LedgerStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: LedgerStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from its stream. Returns a default instance when
    /// the stream is empty.
    pub async fn load(&self, order_id: OrderId) -> Result<A, DomainError> {
        let events = self.store.get_stream(order_id).await?;

        let mut aggregate = A::default();
        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    pub async fn load_existing(&self, order_id: OrderId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(order_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function sees the current state and returns the events to
    /// append, or an error. No events means nothing is written.
    pub async fn execute<F, E>(
        &self,
        order_id: OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, E>,
        DomainError: From<E>,
    {
        let aggregate = self.load(order_id).await?;
        let events = command_fn(&aggregate)?;
        self.commit(order_id, aggregate, events, None).await
    }

    /// Like [`execute`](Self::execute), but the command also yields a wallet
    /// transaction that is committed in the same atomic write as the events.
    pub async fn execute_with_transaction<F, E>(
        &self,
        order_id: OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<(Vec<A::Event>, WalletTransaction), E>,
        DomainError: From<E>,
    {
        let aggregate = self.load(order_id).await?;
        let (events, transaction) = command_fn(&aggregate)?;
        self.commit(order_id, aggregate, events, Some(transaction))
            .await
    }

    async fn commit(
        &self,
        order_id: OrderId,
        mut aggregate: A,
        events: Vec<A::Event>,
        transaction: Option<WalletTransaction>,
    ) -> Result<CommandResult<A>, DomainError> {
        let current_version = aggregate.version();

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(order_id, current_version, &events)?;
        let options = AppendOptions::expect_version(current_version);

        let appended = match transaction {
            Some(tx) => {
                self.store
                    .append_with_transaction(envelopes, options, tx)
                    .await
            }
            None => self.store.append(envelopes, options).await,
        };
        let new_version = appended.map_err(|e| match e {
            LedgerError::ConcurrencyConflict { order_id, .. } => {
                DomainError::ConcurrentUpdate { order_id }
            }
            other => DomainError::Ledger(other),
        })?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_envelopes(
        &self,
        order_id: OrderId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .stream_id(order_id)
                .stream_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()
                .map_err(|missing| {
                    LedgerError::InvalidAppend(format!("envelope is missing {missing}"))
                })?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }
}
