//! API error types with FastAPI-style `{"detail": ...}` bodies

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

/// Detail returned for any malformed `start_job` request
pub const START_JOB_INVALID: &str = "Input_data or identifier_from_purchaser is missing or invalid.";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// API-level errors with HTTP status mapping
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Job not found")]
    JobNotFound,
    #[error("Payment service error: {0}")]
    PaymentService(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::JobNotFound => (StatusCode::NOT_FOUND, "Job not found".to_string()),
            ApiError::PaymentService(detail) => {
                tracing::error!(detail, "Payment service error");
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment service is unavailable, please retry later.".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Input(_) => ApiError::BadRequest(START_JOB_INVALID.to_string()),
            AppError::JobNotFound { .. } => ApiError::JobNotFound,
            AppError::Payment(e) => ApiError::PaymentService(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
