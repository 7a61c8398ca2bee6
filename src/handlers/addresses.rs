//! Address book endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::HeaderMap, StatusCode},
    Json,
};

use crate::handlers::auth::require_actor;
use crate::handlers::{json_body, map_service_error, ApiError};
use crate::models::address::{AddressResponse, CreateAddressRequest};
use crate::AppState;

pub async fn list_addresses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<AddressResponse>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let addresses = state
        .addresses
        .list_by_user(&actor, user_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(addresses.into_iter().map(AddressResponse::from).collect()))
}

pub async fn create_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
    payload: Result<Json<CreateAddressRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddressResponse>), ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    let address = state
        .addresses
        .create(&actor, user_id, payload.into())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(address.into())))
}

pub async fn delete_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(address_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    state
        .addresses
        .delete(&actor, address_id)
        .await
        .map_err(map_service_error)?;

    Ok(StatusCode::NO_CONTENT)
}
