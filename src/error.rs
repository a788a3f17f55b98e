//! Error types for the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::store::{NotFoundKind, StoreError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad upload or parameters
    #[error("{0}")]
    InvalidInput(String),

    /// Upload exceeded the configured body limit
    #[error("Upload exceeds the maximum allowed size")]
    PayloadTooLarge,

    /// Unknown session or image
    #[error("Not found: {0}")]
    NotFound(#[from] StoreError),

    /// Opening or rendering the PDF failed
    #[error("Failed to extract PDF: {0}")]
    ExtractionFailed(String),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidInput(msg) => AppError::InvalidInput(msg),
            other => AppError::ExtractionFailed(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExtractionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message
    pub fn detail(&self) -> String {
        match self {
            AppError::NotFound(e) => match e.kind() {
                NotFoundKind::Session => "Session not found".to_string(),
                NotFoundKind::Image => "Image not found".to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::ExtractionFailed(msg) => tracing::error!("Extraction error: {}", msg),
            AppError::NotFound(e) => tracing::debug!("{}", e),
            AppError::InvalidInput(msg) => tracing::warn!("Rejected request: {}", msg),
            AppError::PayloadTooLarge => tracing::warn!("Rejected oversized upload"),
        }

        let body = Json(ErrorResponse {
            detail: self.detail(),
        });

        (status, body).into_response()
    }
}
