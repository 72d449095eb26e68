//! Read side of the delivery marketplace.
//!
//! - [`Projection`] and [`ProjectionProcessor`] feed committed ledger events
//!   into read models, resuming from each projection's commit position
//! - [`OrderLedgerView`] keeps one [`OrderRecord`] per order
//! - [`report`] holds the pure merchant rollups: daily buckets, stats with
//!   half-window trends, top products, customer insights, status breakdown
//!   and peak hours
//! - [`AnalyticsService`] ties them together behind `merchant_analytics`

pub mod error;
pub mod processor;
pub mod projection;
pub mod report;
pub mod service;
pub mod view;
pub mod window;

pub use error::{AnalyticsError, ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use report::{
    CustomerInsights, DailyBucket, HourCount, MerchantAnalytics, MerchantStats, StatusCount,
    TopProduct,
};
pub use service::{AnalyticsConfig, AnalyticsService};
pub use view::{OrderLedgerView, OrderRecord};
pub use window::Window;
