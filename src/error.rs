//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code. The message carried by a
/// variant is what the client sees in the `detail` field, except for
/// `Database` and `Internal` whose details are only logged.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Unique-constraint violations are reported to the client as a conflict,
    /// everything else as a 500.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing, malformed or expired credentials. Returns HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the action. Returns HTTP 403.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Request violates a business rule. Returns HTTP 400.
    #[error("{0}")]
    BadRequest(String),

    /// Request body or parameters are malformed. Returns HTTP 422.
    #[error("{0}")]
    Validation(String),

    /// Resource already exists (duplicate email, company name, review...). Returns HTTP 400.
    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                (StatusCode::BAD_REQUEST, "conflict")
            }
            AppError::Database(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Conflict(_) => (StatusCode::BAD_REQUEST, "conflict"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                "Resource already exists".to_string()
            }
            AppError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

// Extractor rejections (bad JSON, missing fields, unparsable query or path
// parameters) are reported as 422 in the same JSON shape as every other error.
macro_rules! rejection_as_validation {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Validation(rejection.body_text())
                }
            }
        )+
    };
}

rejection_as_validation!(JsonRejection, QueryRejection, FormRejection, PathRejection);

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "detail": "Human-readable error message",
///   "code": "error_type"
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }

        let body = Json(json!({
            "detail": self.public_message(),
            "code": code,
        }));

        let mut response = (status, body).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
