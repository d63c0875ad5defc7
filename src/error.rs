//! API error taxonomy and its HTTP mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl is
//! the single place where errors become status codes and JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::content::{ContentStoreError, ContentWriteError};

/// Field name -> human-readable message, as produced by the validation layer.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing payload fields; never reaches a store.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// A referenced id (entity or FK target) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation or window overlap.
    #[error("{0}")]
    Conflict(String),

    /// A content write was requested while the content store is unconfigured.
    #[error("Content store is not configured but 'content' was provided.")]
    ContentUnavailable,

    /// Content store failure on a write path (reads swallow these).
    #[error("content store error: {0}")]
    ContentStore(#[from] ContentStoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Shorthand for a single-field validation failure.
    pub fn field(name: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), message.to_string());
        ApiError::Validation(errors)
    }
}

impl From<ContentWriteError> for ApiError {
    fn from(err: ContentWriteError) -> Self {
        match err {
            ContentWriteError::Unavailable => ApiError::ContentUnavailable,
            ContentWriteError::Store(inner) => ApiError::ContentStore(inner),
        }
    }
}

/// Translate a unique-constraint violation into a 409 with the given message;
/// anything else stays a database error.
pub fn unique_conflict(err: sqlx::Error, message: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return ApiError::Conflict(message.to_string());
        }
    }
    ApiError::Database(err)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": errors }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            ApiError::ContentUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Content store is not configured but 'content' was provided."
                })),
            )
                .into_response(),
            ApiError::ContentStore(err) => {
                tracing::error!("content store error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Content store error." })),
                )
                    .into_response()
            }
            ApiError::Database(err) => {
                tracing::error!("database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Database error." })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let res = ApiError::NotFound("blog_cat_id not found.".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let res = ApiError::Conflict("Title or slug already exists.".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let res = ApiError::field("slug", "Slug cannot be empty.").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_content_unavailable_maps_to_503() {
        let res = ApiError::ContentUnavailable.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_database_error_maps_to_500() {
        let res = ApiError::Database(sqlx::Error::PoolClosed).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
