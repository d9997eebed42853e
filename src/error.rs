//! Error types for Birdhouse
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` and renders the uniform
//! `{result: false, error_type, error_message}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every failed API key lookup
pub const UNAUTHENTICATED_MESSAGE: &str = "API key authentication failed";

/// Application-wide error type
///
/// Domain errors are raised where they are detected and rendered here;
/// no handler formats its own error body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or unknown API key (401)
    #[error("{}", UNAUTHENTICATED_MESSAGE)]
    Unauthorized,

    /// Caller may not act on the target (403)
    #[error("{0}")]
    Forbidden(String),

    /// Target entity does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Request violates a domain rule (400)
    #[error("{0}")]
    BadRequest(String),

    /// Malformed request shape (422)
    #[error("{0}")]
    Validation(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Media storage I/O error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Uniform error body
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub result: bool,
    pub error_type: String,
    pub error_message: String,
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the envelope sent to the client.
    ///
    /// `error_type` is the reason phrase of the status code, except for
    /// request validation failures which are reported as `ValidationError`.
    pub fn envelope(&self) -> ErrorEnvelope {
        let status = self.status_code();
        let error_type = match self {
            AppError::Validation(_) => "ValidationError".to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string(),
        };
        let error_message = match self {
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Config(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        ErrorEnvelope {
            result: false,
            error_type,
            error_message,
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation",
            AppError::Database(_) => "database",
            AppError::Storage(_) => "storage",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.metric_label()])
            .inc();

        (status, Json(self.envelope())).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
