//! Order lifecycle core for the delivery marketplace.
//!
//! - [`Order`] aggregate and its transition table ([`OrderStatus`])
//! - [`OrderService`] for checkout placement and merchant transitions
//! - [`ClaimCoordinator`] for driver claims, delivery start, completion and cancel
//! - handoff codes ([`HandoffCode`], [`CodeGenerator`])
//! - the capability check every entry point runs ([`require_ownership`])
//!
//! Commands return a [`TransitionOutcome`] carrying the [`Notice`]s owed to
//! customers and drivers. Sending them is left to the caller, after commit.

pub mod access;
pub mod aggregate;
pub mod claim;
pub mod codes;
pub mod command;
pub mod error;
pub mod order;
pub mod outcome;

pub use access::{AccessError, Actor, Role, require_merchant_target, require_ownership};
pub use aggregate::{Aggregate, DomainEvent};
pub use claim::ClaimCoordinator;
pub use codes::{CodeGenerator, FixedCodeGenerator, HandoffCode, RandomCodeGenerator};
pub use command::{CommandHandler, CommandResult};
pub use error::{DomainError, ErrorKind};
pub use order::{
    DeliveryInfo, Money, Order, OrderError, OrderEvent, OrderItem, OrderPrices, OrderService,
    OrderStatus, OutcomeBucket, PlaceOrder, ProductId,
};
pub use outcome::{Notice, TransitionOutcome};
