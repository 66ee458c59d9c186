//! # Error Handling and Response Types
//!
//! Every failure a handler can hit is an [`AppError`]. The error is converted
//! into an HTTP response exactly once, at the handler boundary, through its
//! [`IntoResponse`] implementation.
//!
//! ## Error Response Format
//!
//! ```json
//! {
//!   "error": "Both Content and URL cannot be set",
//!   "code": "validation_error",
//!   "details": {...},  // Optional additional details
//!   "timestamp": "2024-01-01T12:00:00Z"
//! }
//! ```
//!
//! ## Error Classifications
//!
//! - **Malformed Request** (400): empty or non-JSON bodies, schema mismatches
//! - **Validation Errors** (400): submissions that break a package invariant
//! - **Payload Too Large** (413): content over the configured limit
//! - **Not Found** (404): unknown packages and unmatched routes
//! - **Storage Unavailable** (503): the object store failed or is unreachable
//! - **Internal Errors** (500): everything else

use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Standardized error response structure for consistent API error handling
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

/// Machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MalformedRequest,
    ValidationError,
    PayloadTooLarge,
    NotFound,
    StorageUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedRequest => "malformed_request",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::PayloadTooLarge => "payload_too_large",
            ErrorCode::NotFound => "not_found",
            ErrorCode::StorageUnavailable => "storage_unavailable",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::MalformedRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-specific error types with error codes
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    /// No route matches the request's path and method
    #[error("Not Found")]
    UnknownRoute,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Package not found: {}", key)),
            other => AppError::StorageUnavailable(other),
        }
    }
}

impl AppError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::MalformedRequest(_) => ErrorCode::MalformedRequest,
            AppError::Validation(ValidationError::FileTooLarge { .. }) => {
                ErrorCode::PayloadTooLarge
            }
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::PayloadTooLarge(_) => ErrorCode::PayloadTooLarge,
            AppError::NotFound(_) | AppError::UnknownRoute => ErrorCode::NotFound,
            AppError::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
            AppError::Config(_) | AppError::Internal(_) | AppError::Json(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Get additional error details if available
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation(ValidationError::MissingMetadataField { fields }) => {
                Some(json!({ "missing_fields": fields }))
            }
            AppError::Validation(ValidationError::FileTooLarge { actual, max }) => {
                Some(json!({ "size": actual, "limit": max }))
            }
            AppError::StorageUnavailable(StorageError::Rejected { status, .. }) => {
                Some(json!({ "upstream_status": status }))
            }
            _ => None,
        }
    }

    /// Create a standardized error response
    pub fn to_error_response(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            error: self.to_string(),
            code: self.error_code().as_str().to_string(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.http_status();

        match code {
            ErrorCode::StorageUnavailable | ErrorCode::InternalError => {
                tracing::error!(error = %self, code = code.as_str(), "Request failed")
            }
            ErrorCode::NotFound => tracing::debug!(error = %self, "Request failed"),
            _ => tracing::warn!(error = %self, code = code.as_str(), "Request rejected"),
        }

        let error_response = self.to_error_response();
        tracing::debug!(status = %status, code = %error_response.code, "Returning standardized error response");

        (status, axum::Json(error_response)).into_response()
    }
}

/// Convenient result type for application operations.
pub type AppResult<T> = Result<T, AppError>;
