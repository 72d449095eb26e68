//! Ledger store for the delivery marketplace.
//!
//! Two kinds of records live here:
//! - order event streams, appended with optimistic concurrency so that a write
//!   only lands if the stream is still at the version the command validated against
//! - driver wallet transactions, at most one per order
//!
//! [`InMemoryLedger`] backs tests and the default server, [`PostgresLedger`]
//! backs production deployments.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod wallet;

pub use common::OrderId;
pub use error::{LedgerError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;
pub use store::{AppendOptions, EventStream, LedgerStore, LedgerStoreExt};
pub use wallet::{TransactionKind, TransactionStatus, WalletTransaction};
