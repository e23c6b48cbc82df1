//! HTTP error mapping.

use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use hedgedoc_core::Error;

/// Message returned for every media backend failure. Backend details stay in the logs.
pub const MEDIA_BACKEND_MESSAGE: &str = "There was an error in the media backend";

#[derive(Debug)]
pub enum ApiError {
    Internal(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    MediaBackend,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotInDb(msg) => ApiError::NotFound(msg),
            Error::AlreadyInDb(msg) => ApiError::Conflict(msg),
            Error::Client(msg) => ApiError::BadRequest(msg),
            Error::Permission(msg) | Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::MediaBackend(msg) => {
                error!(subsystem = "api", error = %msg, "Media backend failure");
                ApiError::MediaBackend
            }
            err if err.is_unique_violation() => ApiError::Conflict(err.to_string()),
            other => {
                error!(subsystem = "api", error = %other, "Unhandled error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::MediaBackend => (
                StatusCode::INTERNAL_SERVER_ERROR,
                MEDIA_BACKEND_MESSAGE.to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
