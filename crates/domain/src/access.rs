//! Capability checks shared by every entry point.

use common::{CustomerId, DriverId, MerchantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Merchant,
    Driver,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Merchant => "merchant",
            Role::Driver => "driver",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merchant" => Ok(Role::Merchant),
            "driver" => Ok(Role::Driver),
            "customer" => Ok(Role::Customer),
            other => Err(AccessError::UnknownRole(other.to_string())),
        }
    }
}

/// Someone acting on an order, as resolved by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn merchant(id: MerchantId) -> Self {
        Self {
            id: id.as_uuid(),
            role: Role::Merchant,
        }
    }

    pub fn driver(id: DriverId) -> Self {
        Self {
            id: id.as_uuid(),
            role: Role::Driver,
        }
    }

    pub fn customer(id: CustomerId) -> Self {
        Self {
            id: id.as_uuid(),
            role: Role::Customer,
        }
    }

    /// Whether this actor holds the role-scoped relationship to `order`.
    pub fn owns(&self, order: &Order) -> bool {
        match self.role {
            Role::Merchant => order.merchant_id().as_uuid() == self.id,
            Role::Customer => order.customer_id().as_uuid() == self.id,
            Role::Driver => order.driver_id().is_some_and(|d| d.as_uuid() == self.id),
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Order not found")]
    NotFound,

    #[error("{actor} does not own this order")]
    NotOwner { actor: Actor },

    #[error("A {role} cannot move an order to {target}")]
    TargetNotPermitted { role: Role, target: OrderStatus },

    #[error("Unknown role {0:?}")]
    UnknownRole(String),
}

/// Resolves `order` for `actor`: `NotFound` when there is no order,
/// `NotOwner` when the actor has no relationship to it.
pub fn require_ownership<'a>(
    order: Option<&'a Order>,
    actor: &Actor,
) -> Result<&'a Order, AccessError> {
    let order = order.ok_or(AccessError::NotFound)?;
    if actor.owns(order) {
        Ok(order)
    } else {
        Err(AccessError::NotOwner { actor: *actor })
    }
}

/// Merchants may only request merchant edges; the driver edges go through
/// the claim coordinator.
pub fn require_merchant_target(target: OrderStatus) -> Result<(), AccessError> {
    if target.is_merchant_target() {
        Ok(())
    } else {
        Err(AccessError::TargetNotPermitted {
            role: Role::Merchant,
            target,
        })
    }
}
