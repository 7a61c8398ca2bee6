//! HTTP handlers. Each handler resolves the acting user, calls one service
//! operation and maps [`ServiceError`] onto a status code and
//! [`ErrorResponse`] body.

pub mod addresses;
pub mod auth;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use tracing::{error, warn};

use crate::models::common::ErrorResponse;
use crate::services::error::ServiceError;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn map_service_error(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %err, "Request failed");
        return (
            status,
            Json(ErrorResponse::new("Internal server error", err.code())),
        );
    }

    warn!(code = err.code(), error = %err, "Request rejected");
    (status, Json(ErrorResponse::new(err.to_string(), err.code())))
}

/// Unwrap a JSON body, reporting malformed payloads as validation errors
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed request body");
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(rejection.body_text(), "VALIDATION_ERROR")),
            ))
        }
    }
}
