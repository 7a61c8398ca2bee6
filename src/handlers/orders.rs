//! Order workflow endpoints
//!
//! POST  /orders
//! GET   /orders?status=
//! GET   /orders/{id}
//! GET   /orders/user/{user_id}
//! GET   /orders/delivery/{user_id}
//! PATCH /orders/{id}           status change or item revision
//! PATCH /orders/{id}/assign
//! PATCH /orders/{id}/status
//! PATCH /orders/{id}/confirm

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use crate::handlers::auth::require_actor;
use crate::handlers::{json_body, map_service_error, ApiError};
use crate::models::order::{
    AssignDeliveryRequest, CreateOrderRequest, OrderListQuery, OrderResponse, OrderStatus,
    PatchOrderRequest, UpdateStatusRequest,
};
use crate::services::error::ServiceError;
use crate::services::order_workflow::{OrderDetails, Revision};
use crate::AppState;

fn to_responses(orders: Vec<OrderDetails>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

/// Checkout
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    info!(
        actor_id = actor.user_id,
        user_id = payload.user_id,
        items = payload.items.len(),
        "Create order request received"
    );

    let details = state
        .orders
        .create_order(&actor, payload.into())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

/// Staff listing, optionally filtered by status
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| map_service_error(ServiceError::Validation(e)))?;

    let orders = state
        .orders
        .list_orders(&actor, status)
        .await
        .map_err(map_service_error)?;

    Ok(Json(to_responses(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let details = state
        .orders
        .find_one(&actor, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(details.into()))
}

/// A client's order history, newest first
pub async fn get_user_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let orders = state
        .orders
        .find_by_user(&actor, user_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(to_responses(orders)))
}

/// Orders assigned to a delivery user
pub async fn get_delivery_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let orders = state
        .orders
        .find_by_delivery_user(&actor, user_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(to_responses(orders)))
}

/// Generic update used by the admin panel: either `{status}` or
/// `{items, total?, motivo?}`
pub async fn patch_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i32>,
    payload: Result<Json<PatchOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;
    payload
        .validate()
        .map_err(|e| map_service_error(ServiceError::Validation(e)))?;

    let PatchOrderRequest {
        status,
        items,
        total,
        reason,
        expected_version,
    } = payload;

    let result = match (status, items) {
        (Some(status), _) => {
            info!(order_id = order_id, actor_id = actor.user_id, status = %status, "Order status patch received");
            state
                .orders
                .update_status(&actor, order_id, &status, expected_version)
                .await
        }
        (None, Some(items)) => {
            info!(order_id = order_id, actor_id = actor.user_id, items = items.len(), "Order items patch received");
            let revision = Revision {
                items: items.into_iter().map(Into::into).collect(),
                reason,
                client_total: total,
                expected_version,
            };
            state.orders.revise_items(&actor, order_id, revision).await
        }
        (None, None) => Err(ServiceError::Validation("nothing to update".to_string())),
    };

    Ok(Json(result.map_err(map_service_error)?.into()))
}

pub async fn assign_delivery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i32>,
    payload: Result<Json<AssignDeliveryRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    info!(
        order_id = order_id,
        actor_id = actor.user_id,
        delivery_user_id = ?payload.delivery_user_id,
        "Assign delivery request received"
    );

    let details = state
        .orders
        .assign_delivery(&actor, order_id, payload.delivery_user_id, payload.expected_version)
        .await
        .map_err(map_service_error)?;

    Ok(Json(details.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i32>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    info!(
        order_id = order_id,
        actor_id = actor.user_id,
        status = %payload.status,
        "Status update request received"
    );

    let details = state
        .orders
        .update_status(&actor, order_id, &payload.status, payload.expected_version)
        .await
        .map_err(map_service_error)?;

    Ok(Json(details.into()))
}

/// Client confirms the order was received
pub async fn confirm_receipt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let details = state
        .orders
        .confirm_receipt(&actor, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(details.into()))
}
