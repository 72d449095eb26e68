//! Shared identifiers for the delivery marketplace.
//!
//! Every actor and entity is addressed by a UUID-backed newtype so an order id
//! can never be passed where a driver id is expected.

mod ids;

pub use ids::{CustomerId, DriverId, MerchantId, OrderId, TransactionId};
