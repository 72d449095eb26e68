//! Shared application state: the order core wired to one ledger.

use std::sync::Arc;

use analytics::{AnalyticsConfig, AnalyticsService};
use domain::{ClaimCoordinator, CodeGenerator, DomainError, OrderService, TransitionOutcome};
use ledger::LedgerStore;
use notifications::{InMemoryChannel, InMemoryDirectory, NotificationDispatcher};

pub type Dispatcher = NotificationDispatcher<InMemoryChannel, InMemoryDirectory>;

/// Everything the handlers share. All services write to and read from the same
/// ledger.
pub struct AppState<S: LedgerStore> {
    pub order_service: OrderService<S>,
    pub claims: ClaimCoordinator<S>,
    pub analytics: AnalyticsService<S>,
    pub dispatcher: Dispatcher,
    pub ledger: S,
}

impl<S: LedgerStore + Clone> AppState<S> {
    pub fn new(
        ledger: S,
        codes: Arc<dyn CodeGenerator>,
        analytics: AnalyticsConfig,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            order_service: OrderService::with_code_generator(ledger.clone(), codes),
            claims: ClaimCoordinator::new(ledger.clone()),
            analytics: AnalyticsService::new(ledger.clone(), analytics),
            dispatcher,
            ledger,
        }
    }
}

impl<S: LedgerStore> AppState<S> {
    /// Sends the notices of a committed transition. Delivery failures are
    /// logged by the dispatcher and never reach the caller.
    pub async fn notify(
        &self,
        result: Result<TransitionOutcome, DomainError>,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome = result?;
        let report = self.dispatcher.dispatch(&outcome.notices).await;
        if !report.is_clean() {
            tracing::debug!(
                status = %outcome.status(),
                failed = report.failed,
                "transition committed with undelivered notifications"
            );
        }
        Ok(outcome)
    }
}
