//! Order placement, lookup, and lifecycle transition endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CustomerId, DriverId, MerchantId, OrderId};
use domain::{
    DeliveryInfo, DomainError, ErrorKind, Order, OrderItem, OrderPrices, OrderStatus,
    PlaceOrder, Role,
};
use ledger::LedgerStore;
use notifications::Directory;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::routes::parse_id;
use crate::state::AppState;

// -- Request types --

/// Sent by checkout once cart and payment are settled.
#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Lets checkout retry a placement idempotently.
    pub order_id: Option<Uuid>,
    pub merchant_id: Uuid,
    pub items: Vec<OrderItem>,
    pub prices: OrderPrices,
    pub delivery: DeliveryInfo,
    pub delivery_code: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub pickup_code: String,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub delivery_code: String,
}

// -- Response types --

/// An order as one of its actors sees it. The merchant sees the pickup code,
/// the customer sees the delivery code, and the driver sees neither.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub driver_id: Option<DriverId>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub prices: OrderPrices,
    pub delivery: DeliveryInfo,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_code: Option<String>,
}

impl OrderResponse {
    fn for_viewer(order_id: OrderId, order: &Order, viewer: Role) -> Self {
        let pickup_code = match viewer {
            Role::Merchant => order.pickup_code().map(|c| c.to_string()),
            _ => None,
        };
        let delivery_code = match viewer {
            Role::Customer => order.delivery_code().map(|c| c.to_string()),
            _ => None,
        };

        Self {
            id: order_id,
            merchant_id: order.merchant_id(),
            customer_id: order.customer_id(),
            driver_id: order.driver_id(),
            status: order.status(),
            items: order.items().to_vec(),
            prices: order.prices(),
            delivery: order.delivery_info().clone(),
            created_at: order.created_at(),
            pickup_code,
            delivery_code,
        }
    }
}

/// A ready order as the driver pool sees it.
#[derive(Debug, Serialize)]
pub struct AvailableOrderResponse {
    pub id: OrderId,
    pub merchant_id: MerchantId,
    pub merchant_name: Option<String>,
    pub pickup_address: Option<String>,
    pub delivery_address: String,
    pub items: Vec<OrderItem>,
    pub delivery_fee: i64,
    pub created_at: DateTime<Utc>,
}

// -- Handlers --

/// POST /orders — checkout hands over a paid order.
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = user.as_customer()?;

    let mut cmd = PlaceOrder::new(
        MerchantId::from_uuid(req.merchant_id),
        customer_id,
        req.items,
        req.prices,
        req.delivery,
    );
    if let Some(order_id) = req.order_id {
        cmd = cmd.with_order_id(OrderId::from_uuid(order_id));
    }
    if let Some(code) = req.delivery_code {
        cmd = cmd.with_delivery_code(code);
    }
    let order_id = cmd.order_id;

    let order = state.order_service.place_order(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::for_viewer(order_id, &order, Role::Customer)),
    ))
}

/// GET /orders/:id — any actor with a relationship to the order.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;

    let mut denied = None;
    for actor in user.actors() {
        match state.order_service.get_order_for(order_id, actor).await {
            Ok(order) => {
                return Ok(Json(OrderResponse::for_viewer(order_id, &order, actor.role)));
            }
            Err(err) if err.kind() == ErrorKind::Unauthorized => denied = Some(err),
            Err(err) => return Err(err.into()),
        }
    }

    Err(denied.map_or_else(
        || ApiError::Forbidden("no role can view this order".to_string()),
        ApiError::from,
    ))
}

/// GET /orders/available — orders waiting for a driver, oldest first.
#[tracing::instrument(skip(state, user))]
pub async fn available<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<AvailableOrderResponse>>, ApiError> {
    user.as_driver()?;

    let records = state.analytics.available_orders().await?;
    let directory = state.dispatcher.directory();

    let mut responses = Vec::with_capacity(records.len());
    for record in records {
        // A missing profile only costs the display fields.
        let profile = directory
            .merchant_profile(record.merchant_id)
            .await
            .unwrap_or_default();
        responses.push(AvailableOrderResponse {
            id: record.order_id,
            merchant_id: record.merchant_id,
            merchant_name: profile.as_ref().map(|p| p.name.clone()),
            pickup_address: profile.map(|p| p.pickup_address),
            delivery_address: record.delivery_address,
            items: record.items,
            delivery_fee: record.prices.delivery_fee.cents(),
            created_at: record.created_at,
        });
    }

    Ok(Json(responses))
}

/// POST /orders/:id/status — the merchant moves the order along its edges.
#[tracing::instrument(skip(state, user, req))]
pub async fn update_status<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let merchant_id = user.as_merchant()?;
    let order_id: OrderId = parse_id(&id)?;
    let target: OrderStatus = req.status.parse().map_err(DomainError::from)?;

    let outcome = state
        .notify(
            state
                .order_service
                .apply_merchant_transition(order_id, merchant_id, target)
                .await,
        )
        .await?;

    Ok(Json(OrderResponse::for_viewer(order_id, &outcome.order, Role::Merchant)))
}

/// POST /orders/:id/claim — a driver takes a ready order.
#[tracing::instrument(skip(state, user, req))]
pub async fn claim<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let driver_id = user.as_driver()?;
    let order_id: OrderId = parse_id(&id)?;

    let outcome = state
        .notify(
            state
                .claims
                .claim_order(order_id, driver_id, &req.pickup_code)
                .await,
        )
        .await?;

    Ok(Json(driver_view(order_id, &outcome.order)))
}

/// POST /orders/:id/start — the assigned driver leaves with the order.
#[tracing::instrument(skip(state, user))]
pub async fn start<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let driver_id = user.as_driver()?;
    let order_id: OrderId = parse_id(&id)?;

    let outcome = state
        .notify(state.claims.start_delivery(order_id, driver_id).await)
        .await?;

    Ok(Json(driver_view(order_id, &outcome.order)))
}

/// POST /orders/:id/complete — hand-off with the customer's delivery code.
#[tracing::instrument(skip(state, user, req))]
pub async fn complete<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let driver_id = user.as_driver()?;
    let order_id: OrderId = parse_id(&id)?;

    let outcome = state
        .notify(
            state
                .claims
                .complete_delivery(order_id, driver_id, &req.delivery_code)
                .await,
        )
        .await?;

    Ok(Json(driver_view(order_id, &outcome.order)))
}

/// POST /orders/:id/cancel — the assigned driver abandons the delivery.
#[tracing::instrument(skip(state, user))]
pub async fn cancel<S: LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let driver_id = user.as_driver()?;
    let order_id: OrderId = parse_id(&id)?;

    let outcome = state
        .notify(state.claims.cancel_delivery(order_id, driver_id).await)
        .await?;

    Ok(Json(driver_view(order_id, &outcome.order)))
}

fn driver_view(order_id: OrderId, order: &Order) -> OrderResponse {
    OrderResponse::for_viewer(order_id, order, Role::Driver)
}
