//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::PlaceOrder;
pub use events::{
    DriverAssignedData, OrderEvent, OrderPlacedData, PickupCodeIssuedData, StatusChangedData,
};
pub use service::OrderService;
pub use state::{OrderStatus, OutcomeBucket};
pub use value_objects::{DeliveryInfo, Money, OrderItem, OrderPrices, ProductId};

use thiserror::Error;

/// Business rule violations raised by the order aggregate.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested edge is not in the transition table.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Pickup code does not match")]
    PickupCodeMismatch,

    #[error("Delivery code does not match")]
    DeliveryCodeMismatch,

    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    #[error("Invalid amount for {field}: {amount} (must not be negative)")]
    NegativeAmount { field: String, amount: Money },

    #[error("Order total {actual} does not match subtotal + delivery fee + shipping - discount = {expected}")]
    PriceMismatch { expected: Money, actual: Money },

    #[error("Amount for {field} is out of range")]
    AmountOverflow { field: String },

    #[error("Delivery address is required")]
    MissingAddress,

    #[error("Invalid handoff code {code:?}")]
    InvalidCode { code: String },

    #[error("Unknown order status {status:?}")]
    UnknownStatus { status: String },
}
