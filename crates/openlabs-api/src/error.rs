//! Unified API error type: one `IntoResponse` impl, a `{detail}` JSON
//! body, and `From<...Error>` conversions from every crate below this
//! one. `Forbidden`/`NotFound` share a status code without sharing a
//! variant so call sites stay self-documenting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    Forbidden,
    NotFound(String),
    ValidationFailed(String),
    NoCredentials(String),
    QueueUnavailable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            // Owner mismatch renders identically to NotFound: never
            // reveal that a resource exists under someone else's account.
            ApiError::Forbidden => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ValidationFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::NoCredentials(provider) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("No credentials found for provider: {provider}"),
            ),
            ApiError::QueueUnavailable(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<openlabs_store::StoreError> for ApiError {
    fn from(e: openlabs_store::StoreError) -> Self {
        match e {
            openlabs_store::StoreError::NotFound(id) => ApiError::NotFound(format!("not found: {id}")),
            openlabs_store::StoreError::Validation(c) => ApiError::ValidationFailed(c.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<openlabs_core::error::CoreError> for ApiError {
    fn from(e: openlabs_core::error::CoreError) -> Self {
        ApiError::ValidationFailed(e.to_string())
    }
}

impl From<openlabs_vault::VaultError> for ApiError {
    fn from(e: openlabs_vault::VaultError) -> Self {
        use openlabs_vault::error::VaultError::*;
        match e {
            InvalidEncryptionKey => ApiError::Unauthenticated("invalid encryption key".to_string()),
            AuthenticationFailure => ApiError::Unauthenticated("authentication failure".to_string()),
            NoCredentials(provider) => ApiError::NoCredentials(provider),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<openlabs_queue::QueueError> for ApiError {
    fn from(e: openlabs_queue::QueueError) -> Self {
        ApiError::QueueUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::ValidationFailed(e.to_string())
    }
}
