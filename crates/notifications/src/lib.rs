//! Notification fanout for the delivery marketplace.
//!
//! Commands in the `domain` crate return [`Notice`](domain::Notice)s once a
//! transition has committed. The [`NotificationDispatcher`] turns them into
//! concrete messages:
//! - a status update to the customer on every transition
//! - an "order available" broadcast to the driver pool when an order becomes
//!   ready for pickup
//!
//! Delivery is a single best-effort attempt. Failures are logged and counted,
//! never returned, and never undo the transition that caused them. There is
//! no retry and no outbox.

pub mod channel;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod message;

pub use channel::{InMemoryChannel, NotificationChannel};
pub use directory::{Directory, InMemoryDirectory, MerchantProfile};
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use error::NotificationError;
pub use message::{Notification, Recipient};
