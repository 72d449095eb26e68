//! Feeds committed ledger events to projections.

use futures_util::StreamExt;
use ledger::{EventEnvelope, LedgerStore};

use crate::Result;
use crate::projection::Projection;

/// Delivers ledger events to registered projections.
///
/// - Catch-up: streams everything committed after the furthest-behind
///   projection and hands each event to every projection that has not seen it
/// - Single event delivery
/// - Rebuild: resets every projection and catches up from the start
pub struct ProjectionProcessor<S: LedgerStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: LedgerStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Brings every projection up to the ledger head. Returns how many
    /// events were streamed.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut from = i64::MAX;
        for projection in &self.projections {
            from = from.min(projection.position().await.last_position);
        }
        if self.projections.is_empty() {
            return Ok(0);
        }

        let mut stream = self.store.stream_all_events(from).await?;
        let mut streamed = 0u64;

        while let Some(result) = stream.next().await {
            let event = result?;
            streamed += 1;

            for projection in &self.projections {
                if projection.position().await.last_position < event.position {
                    projection.handle(&event).await?;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        tracing::debug!(events_streamed = streamed, "catch-up complete");
        Ok(streamed)
    }

    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            if projection.position().await.last_position < event.position {
                projection.handle(event).await?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::OrderId;
    use ledger::{AppendOptions, InMemoryLedger, Version};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Clone, Default)]
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, event: &EventEnvelope) -> Result<()> {
            *self.count.write().await += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance(event.position);
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn event(stream_id: OrderId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .stream_id(stream_id)
            .stream_type("Order")
            .event_type("TestEvent")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    async fn ledger_with(n: i64) -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        let id = OrderId::new();
        let events = (1..=n).map(|v| event(id, v)).collect();
        ledger.append(events, AppendOptions::new()).await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn catch_up_is_incremental() {
        let ledger = ledger_with(3).await;
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(ledger.clone());
        processor.register(Box::new(projection.clone()));

        assert_eq!(processor.run_catch_up().await.unwrap(), 3);
        assert_eq!(*projection.count.read().await, 3);

        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert_eq!(*projection.count.read().await, 3);

        ledger
            .append(vec![event(OrderId::new(), 1)], AppendOptions::new())
            .await
            .unwrap();
        assert_eq!(processor.run_catch_up().await.unwrap(), 1);
        assert_eq!(*projection.count.read().await, 4);
    }

    #[tokio::test]
    async fn late_projection_catches_up_without_replaying_others() {
        let ledger = ledger_with(2).await;
        let early = CountingProjection::default();
        let late = CountingProjection::default();

        let mut processor = ProjectionProcessor::new(ledger);
        processor.register(Box::new(early.clone()));
        processor.run_catch_up().await.unwrap();

        processor.register(Box::new(late.clone()));
        processor.run_catch_up().await.unwrap();

        assert_eq!(*early.count.read().await, 2);
        assert_eq!(*late.count.read().await, 2);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let ledger = ledger_with(2).await;
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(ledger);
        processor.register(Box::new(projection.clone()));

        processor.run_catch_up().await.unwrap();
        processor.rebuild_all().await.unwrap();

        assert_eq!(*projection.count.read().await, 2);
        assert_eq!(projection.position.read().await.events_processed, 2);
    }

    #[tokio::test]
    async fn empty_processor_is_a_no_op() {
        let processor = ProjectionProcessor::new(ledger_with(2).await);
        assert_eq!(processor.projection_count(), 0);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
    }
}
