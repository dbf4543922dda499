//! API error types mapped to HTTP status codes.
//!
//! Each [`ApiError`] variant maps to a specific HTTP status code and produces
//! a JSON response body `{"error": "message"}`.

use crate::reference::ReloadError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use snpwizard_core::error::{ExportError, QueryError};
use snpwizard_core::wire;

/// Application-level error type that implements `IntoResponse`.
///
/// Each variant maps to an HTTP status code:
/// - `BadRequest` → 400
/// - `Unauthorized` → 401
/// - `NotFound` → 404
/// - `QueryTimeout` → 504
/// - `Internal` → 500
#[derive(Debug)]
pub enum ApiError {
    /// Invalid search parameters (400).
    BadRequest(String),
    /// Missing or invalid admin key (401).
    Unauthorized(String),
    /// Unknown route (404).
    NotFound(String),
    /// Statement exceeded its timeout (504).
    QueryTimeout,
    /// Unexpected server error (500). The detail is logged, never returned.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::QueryTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                wire::QUERY_TIMEOUT_MESSAGE.to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    wire::INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };
        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => ApiError::QueryTimeout,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnknownFormat(_) | ExportError::SheetLimit(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ReloadError> for ApiError {
    fn from(err: ReloadError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
