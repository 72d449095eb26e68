//! Caller identity, as resolved by the upstream auth collaborator.
//!
//! The gateway in front of this service authenticates the caller and forwards
//! `x-user-id` (a UUID) and `x-user-roles` (comma-separated). The core only
//! consumes them.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{CustomerId, DriverId, MerchantId};
use domain::{Actor, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Every actor this user can act as.
    pub fn actors(&self) -> impl Iterator<Item = Actor> + '_ {
        self.roles.iter().map(|&role| Actor { id: self.id, role })
    }

    pub fn as_merchant(&self) -> Result<MerchantId, ApiError> {
        self.require(Role::Merchant).map(MerchantId::from_uuid)
    }

    pub fn as_driver(&self) -> Result<DriverId, ApiError> {
        self.require(Role::Driver).map(DriverId::from_uuid)
    }

    pub fn as_customer(&self) -> Result<CustomerId, ApiError> {
        self.require(Role::Customer).map(CustomerId::from_uuid)
    }

    fn require(&self, role: Role) -> Result<Uuid, ApiError> {
        if self.has_role(role) {
            Ok(self.id)
        } else {
            Err(ApiError::Forbidden(format!("{role} role required")))
        }
    }

    fn from_headers(id: Option<&str>, roles: Option<&str>) -> Result<Self, ApiError> {
        let id = id
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?;
        let id = Uuid::parse_str(id.trim())
            .map_err(|e| ApiError::Unauthenticated(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let roles = roles.ok_or_else(|| {
            ApiError::Unauthenticated(format!("missing {USER_ROLES_HEADER} header"))
        })?;
        let roles = roles
            .split(',')
            .filter(|r| !r.trim().is_empty())
            .map(|r| r.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;
        if roles.is_empty() {
            return Err(ApiError::Unauthenticated(format!(
                "empty {USER_ROLES_HEADER} header"
            )));
        }

        Ok(Self { id, roles })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .map(|v| v.to_str().unwrap_or_default())
        };
        Self::from_headers(header(USER_ID_HEADER), header(USER_ROLES_HEADER))
    }
}
