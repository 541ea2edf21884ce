use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant renders as `{ "success": false, "error": "<message>" }`. Variants that
/// wrap internal failures log the detail and return a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Absent records and records owned by someone else are indistinguishable.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream quota exceeded: {0}")]
    UpstreamQuotaExceeded(String),

    #[error("Upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Malformed upstream response: {0}")]
    UpstreamMalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::UnsupportedMediaType(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "A required external service is currently unavailable".to_string(),
                )
            }
            AppError::UpstreamQuotaExceeded(msg) => {
                tracing::error!("Upstream quota exceeded: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The AI service quota has been exceeded. Please try again later".to_string(),
                )
            }
            AppError::UpstreamRateLimited(msg) => {
                tracing::warn!("Upstream rate limited: {msg}");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests to the AI service. Please wait a moment and retry"
                        .to_string(),
                )
            }
            AppError::UpstreamTimeout(msg) => {
                tracing::error!("Upstream timeout: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The AI service took too long to respond".to_string(),
                )
            }
            AppError::UpstreamMalformedResponse(msg) => {
                tracing::error!("Malformed upstream response: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The AI service returned an invalid response".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A file storage error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::NotConfigured => {
                AppError::UpstreamUnavailable("OpenAI API key is not configured".to_string())
            }
            LlmError::Timeout => AppError::UpstreamTimeout(e.to_string()),
            LlmError::QuotaExceeded(msg) => AppError::UpstreamQuotaExceeded(msg),
            LlmError::RateLimited(msg) => AppError::UpstreamRateLimited(msg),
            LlmError::Malformed(_) | LlmError::Incomplete(_) | LlmError::EmptyContent => {
                AppError::UpstreamMalformedResponse(e.to_string())
            }
            LlmError::Http(_) | LlmError::Api { .. } => {
                AppError::UpstreamUnavailable(e.to_string())
            }
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::UnsupportedType(mime) => AppError::UnsupportedMediaType(format!(
                "Unsupported file type '{mime}'. Please upload a PDF, DOCX or TXT file"
            )),
            ExtractionError::Empty => AppError::Validation(
                "Could not extract any text from the uploaded file".to_string(),
            ),
            ExtractionError::Pdf(_) | ExtractionError::Docx(_) => {
                AppError::Validation(format!("Failed to read document: {e}"))
            }
            ExtractionError::Io(e) => AppError::Storage(e.to_string()),
        }
    }
}
