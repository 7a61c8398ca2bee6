//! Acting-user resolution from the `x-user-id` header

use axum::{
    http::{header::HeaderMap, StatusCode},
    Json,
};
use tracing::warn;

use crate::handlers::{map_service_error, ApiError};
use crate::models::common::ErrorResponse;
use crate::services::error::ServiceError;
use crate::services::policy::Actor;
use crate::AppState;

pub const USER_HEADER: &str = "x-user-id";

fn unauthorized(message: &str) -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(message, "UNAUTHORIZED")),
    )
}

fn header_user_id(headers: &HeaderMap) -> Result<Option<i32>, ApiError> {
    let Some(raw) = headers.get(USER_HEADER) else {
        return Ok(None);
    };

    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .map(Some)
        .ok_or_else(|| {
            warn!("Malformed x-user-id header");
            unauthorized("Invalid x-user-id header")
        })
}

/// Resolve the acting user, or 401 when absent or unknown
pub async fn require_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    match optional_actor(state, headers).await? {
        Some(actor) => Ok(actor),
        None => {
            warn!("Missing x-user-id header");
            Err(unauthorized("Missing x-user-id header"))
        }
    }
}

/// Resolve the acting user if the header is present
pub async fn optional_actor(state: &AppState, headers: &HeaderMap) -> Result<Option<Actor>, ApiError> {
    let Some(user_id) = header_user_id(headers)? else {
        return Ok(None);
    };

    match state.directory.actor(user_id).await {
        Ok(actor) => Ok(Some(actor)),
        Err(ServiceError::NotFound(_)) => {
            warn!(user_id = user_id, "Unknown acting user");
            Err(unauthorized("Unknown user"))
        }
        Err(e) => Err(map_service_error(e)),
    }
}
