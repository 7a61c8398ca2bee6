//! Catalog endpoints. Listing and lookup are public.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use crate::handlers::auth::require_actor;
use crate::handlers::{json_body, map_service_error, ApiError};
use crate::models::product::{
    CreateProductRequest, ProductListQuery, ProductResponse, UpdateProductRequest,
};
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state
        .catalog
        .list_products(query.category.as_deref())
        .await
        .map_err(map_service_error)?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(product.into()))
}

pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;
    info!(actor_id = actor.user_id, name = %payload.name, "Create product request received");

    let product = state
        .catalog
        .create_product(&actor, payload.into())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

pub async fn update_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i32>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    let product = state
        .catalog
        .update_product(&actor, product_id, payload.into())
        .await
        .map_err(map_service_error)?;

    Ok(Json(product.into()))
}

pub async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    state
        .catalog
        .delete_product(&actor, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(StatusCode::NO_CONTENT)
}
