//! HTTP API server for the delivery marketplace order core.
//!
//! Exposes order placement, merchant and driver transitions, the driver pool
//! feed, driver wallets and merchant analytics, with structured logging
//! (tracing) and Prometheus metrics. Caller identity arrives in headers set by
//! the upstream auth gateway (see [`identity`]).

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{InMemoryChannel, InMemoryDirectory, NotificationDispatcher};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: LedgerStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/available", get(routes::orders::available::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::update_status::<S>))
        .route("/orders/{id}/claim", post(routes::orders::claim::<S>))
        .route("/orders/{id}/start", post(routes::orders::start::<S>))
        .route("/orders/{id}/complete", post(routes::orders::complete::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/merchants/{id}/analytics",
            get(routes::analytics::merchant::<S>),
        )
        .route(
            "/merchants/{id}/profile",
            put(routes::directory::put_profile::<S>),
        )
        .route("/drivers/{id}/wallet", get(routes::wallet::get::<S>))
        .route(
            "/drivers/{id}/pool",
            put(routes::directory::join_pool::<S>).delete(routes::directory::leave_pool::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the order core to `ledger` with in-memory notification delivery and
/// directory.
pub fn create_default_state<S: LedgerStore + Clone + 'static>(
    ledger: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let codes = Arc::new(domain::RandomCodeGenerator::new(config.code_length));
    let dispatcher = NotificationDispatcher::new(InMemoryChannel::new(), InMemoryDirectory::new());
    Arc::new(AppState::new(ledger, codes, config.analytics(), dispatcher))
}
