//! Analytics queries over the order read model.

use std::time::Instant;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use common::MerchantId;
use ledger::LedgerStore;
use tokio::sync::Mutex;

use crate::error::AnalyticsError;
use crate::processor::ProjectionProcessor;
use crate::report::{self, MerchantAnalytics};
use crate::view::{OrderLedgerView, OrderRecord};
use crate::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsConfig {
    /// Offset used to cut calendar days and hours.
    pub utc_offset: FixedOffset,
    pub max_window_days: u32,
}

impl AnalyticsConfig {
    pub const DEFAULT_MAX_WINDOW_DAYS: u32 = 365;

    /// Falls back to UTC when `minutes` is not a valid offset.
    pub fn new(utc_offset_minutes: i32, max_window_days: u32) -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
                .unwrap_or_else(|| Utc.fix()),
            max_window_days: max_window_days.max(1),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_MAX_WINDOW_DAYS)
    }
}

/// Keeps an [`OrderLedgerView`] current and answers merchant and driver
/// queries from it.
///
/// Every query first catches the view up with the ledger, so answers reflect
/// everything committed before the call.
pub struct AnalyticsService<S: LedgerStore> {
    view: OrderLedgerView,
    processor: ProjectionProcessor<S>,
    catch_up: Mutex<()>,
    config: AnalyticsConfig,
}

impl<S: LedgerStore> AnalyticsService<S> {
    pub fn new(store: S, config: AnalyticsConfig) -> Self {
        let view = OrderLedgerView::new();
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(view.clone()));
        Self {
            view,
            processor,
            catch_up: Mutex::new(()),
            config,
        }
    }

    pub fn view(&self) -> &OrderLedgerView {
        &self.view
    }

    pub fn config(&self) -> AnalyticsConfig {
        self.config
    }

    /// Applies everything committed since the last refresh. Returns the
    /// number of events read.
    pub async fn refresh(&self) -> Result<u64, AnalyticsError> {
        let _guard = self.catch_up.lock().await;
        Ok(self.processor.run_catch_up().await?)
    }

    /// The merchant's report for the trailing `days` days ending today.
    #[tracing::instrument(skip(self, now))]
    pub async fn merchant_analytics(
        &self,
        merchant_id: MerchantId,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<MerchantAnalytics, AnalyticsError> {
        let max = self.config.max_window_days;
        if !(1..=max).contains(&days) {
            return Err(AnalyticsError::InvalidWindow { days, max });
        }

        let started = Instant::now();
        self.refresh().await?;

        let window = Window::trailing(now, days, self.config.utc_offset);
        let orders = self.view.merchant_orders(merchant_id).await;
        let report = report::merchant_analytics(merchant_id, &orders, &window);

        metrics::histogram!("analytics_report_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(orders = report.stats.total_orders, "merchant analytics built");
        Ok(report)
    }

    /// Orders in `READY_TO_DELIVER`, oldest first.
    pub async fn available_orders(&self) -> Result<Vec<OrderRecord>, AnalyticsError> {
        self.refresh().await?;
        Ok(self.view.available_orders().await)
    }
}
