//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::OrderId;
use ledger::LedgerStore;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ledger: &'static str,
}

/// GET /health — reports whether the ledger answers reads.
pub async fn check<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.ledger.stream_version(OrderId::new()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                ledger: "reachable",
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "ledger health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    ledger: "unreachable",
                }),
            )
        }
    }
}
