//! Directory endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use crate::handlers::auth::{optional_actor, require_actor};
use crate::handlers::{json_body, map_service_error, ApiError};
use crate::models::user::{CreateUserRequest, Role, SetRoleRequest, UserListQuery, UserResponse};
use crate::services::directory::NewUser;
use crate::services::error::ServiceError;
use crate::AppState;

/// GET /users?role=delivery feeds the assignment dropdown
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let role = query
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(str::parse::<Role>)
        .transpose()
        .map_err(|e| map_service_error(ServiceError::Validation(e)))?;

    let users = state
        .directory
        .list_by_role(&actor, role)
        .await
        .map_err(map_service_error)?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;

    let user = state
        .directory
        .get_user(&actor, user_id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(user.into()))
}

/// Sign-up without a header creates a client; staff need an admin caller
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let actor = optional_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    let new_user = NewUser {
        email: payload.email,
        full_name: payload.full_name,
        phone: payload.phone,
        role: payload.role.unwrap_or(Role::Client),
    };
    info!(
        actor_id = ?actor.map(|a| a.user_id),
        role = %new_user.role,
        "Create user request received"
    );

    let user = state
        .directory
        .create_user(actor.as_ref(), new_user)
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn set_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
    payload: Result<Json<SetRoleRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let payload = json_body(payload)?;

    let user = state
        .directory
        .set_role(&actor, user_id, payload.role)
        .await
        .map_err(map_service_error)?;

    Ok(Json(user.into()))
}
