//! Merchant profiles and driver pool membership used to word and address
//! notifications.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{DriverId, MerchantId};
use ledger::LedgerStore;
use notifications::MerchantProfile;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub pickup_address: String,
}

#[derive(Debug, Serialize)]
pub struct PoolResponse {
    pub driver_id: DriverId,
    pub in_pool: bool,
    pub changed: bool,
}

/// PUT /merchants/:id/profile
#[tracing::instrument(skip(state, user, req))]
pub async fn put_profile<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<MerchantProfile>, ApiError> {
    let merchant_id: MerchantId = parse_id(&id)?;
    if user.as_merchant()? != merchant_id {
        return Err(ApiError::Forbidden(
            "merchants can only edit their own profile".to_string(),
        ));
    }
    if req.name.trim().is_empty() || req.pickup_address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name and pickup_address are required".to_string(),
        ));
    }

    let profile = MerchantProfile::new(req.name.trim(), req.pickup_address.trim());
    state
        .dispatcher
        .directory()
        .register_merchant(merchant_id, profile.clone());
    Ok(Json(profile))
}

/// PUT /drivers/:id/pool — start receiving "order available" broadcasts.
#[tracing::instrument(skip(state, user))]
pub async fn join_pool<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PoolResponse>, ApiError> {
    let driver_id = own_driver_id(&user, &id)?;
    let changed = state.dispatcher.directory().add_driver(driver_id);
    Ok(Json(PoolResponse {
        driver_id,
        in_pool: true,
        changed,
    }))
}

/// DELETE /drivers/:id/pool
#[tracing::instrument(skip(state, user))]
pub async fn leave_pool<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PoolResponse>, ApiError> {
    let driver_id = own_driver_id(&user, &id)?;
    let changed = state.dispatcher.directory().remove_driver(driver_id);
    Ok(Json(PoolResponse {
        driver_id,
        in_pool: false,
        changed,
    }))
}

fn own_driver_id(user: &CurrentUser, raw: &str) -> Result<DriverId, ApiError> {
    let driver_id: DriverId = parse_id(raw)?;
    if user.as_driver()? != driver_id {
        return Err(ApiError::Forbidden(
            "drivers can only change their own pool membership".to_string(),
        ));
    }
    Ok(driver_id)
}
