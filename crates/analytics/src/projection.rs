//! Core projection trait and position tracking.

use async_trait::async_trait;
use ledger::EventEnvelope;

use crate::Result;

/// How far into the ledger a projection has read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Commit position of the last event handled. Zero before the first.
    pub last_position: i64,

    pub events_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Moves past the event committed at `position`.
    pub fn advance(&self, position: i64) -> Self {
        Self {
            last_position: position,
            events_processed: self.events_processed + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position({}, {} events)",
            self.last_position, self.events_processed
        )
    }
}

/// Folds ledger events into a read model.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handles one committed event. Called in commit order, once per event.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Drops all state so the projection can be replayed from the start.
    async fn reset(&self) -> Result<()>;
}
