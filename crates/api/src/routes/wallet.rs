//! Driver wallet endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::DriverId;
use ledger::{LedgerStore, LedgerStoreExt, WalletTransaction};
use serde::Serialize;

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub driver_id: DriverId,
    pub balance: i64,
    pub transactions: Vec<WalletTransaction>,
}

/// GET /drivers/:id/wallet — the driver's earnings, one credit per completed
/// delivery.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let driver_id: DriverId = parse_id(&id)?;
    if user.as_driver()? != driver_id {
        return Err(ApiError::Forbidden(
            "drivers can only read their own wallet".to_string(),
        ));
    }

    let balance = state.ledger.wallet_balance(driver_id).await?;
    let transactions = state.ledger.wallet_transactions(driver_id).await?;

    Ok(Json(WalletResponse {
        driver_id,
        balance,
        transactions,
    }))
}
