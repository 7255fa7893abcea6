//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::PipelineError;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Neither a PDF nor an image (400)
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Run was cancelled before it could finish (503)
    #[error("Verification cancelled")]
    Cancelled,

    /// Outer deadline exceeded (504)
    #[error("Verification did not finish within {0} seconds")]
    Timeout(u64),

    /// OCR or language model failure (502)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnsupportedMedia(_) => StatusCode::BAD_REQUEST,
            ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UnsupportedMedia(_) => "unsupported_media",
            ApiError::Cancelled => "cancelled",
            ApiError::Timeout(_) => "timeout",
            ApiError::ExternalService(_) => "external_service_error",
            ApiError::Internal(_) => "internal_error",
        };

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
        })
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::UnsupportedMedia { .. } => ApiError::UnsupportedMedia(err.to_string()),
            PipelineError::Cancelled => ApiError::Cancelled,
            PipelineError::Extraction(e) => ApiError::ExternalService(e.to_string()),
            PipelineError::FieldExtraction(e) => ApiError::ExternalService(e.to_string()),
            PipelineError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fields::FieldExtractionError;
    use crate::service::ocr::ExtractionError;
    use crate::storage::StorageError;

    #[test]
    fn test_pipeline_error_status_mapping() {
        let cases = [
            (
                PipelineError::UnsupportedMedia {
                    file_name: "a.txt".to_string(),
                    content_type: "text/plain".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (PipelineError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                PipelineError::Extraction(ExtractionError::RetriesExhausted {
                    job_id: "job-1".to_string(),
                    attempts: 7,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::FieldExtraction(FieldExtractionError::ModelCallFailed("x".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::Storage(StorageError::AlreadyExists("k".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
        assert_eq!(ApiError::Timeout(600).status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_error_body_shape() {
        let response = ApiError::BadRequest("missing file_name".to_string()).error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
