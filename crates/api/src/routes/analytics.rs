//! Merchant analytics endpoint.

use std::sync::Arc;

use analytics::MerchantAnalytics;
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use common::MerchantId;
use ledger::LedgerStore;
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::routes::parse_id;
use crate::state::AppState;

pub const DEFAULT_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<u32>,
}

/// GET /merchants/:id/analytics?days=N — only the merchant itself.
#[tracing::instrument(skip(state, user))]
pub async fn merchant<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<MerchantAnalytics>, ApiError> {
    let merchant_id: MerchantId = parse_id(&id)?;
    if user.as_merchant()? != merchant_id {
        return Err(ApiError::Forbidden(
            "merchants can only read their own analytics".to_string(),
        ));
    }

    let days = query.days.unwrap_or(DEFAULT_DAYS);
    let report = state
        .analytics
        .merchant_analytics(merchant_id, days, Utc::now())
        .await?;
    Ok(Json(report))
}
