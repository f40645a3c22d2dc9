use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use insurance_service::{InsuranceError, PaginationInfo};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::StorageError;

const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Error body returned to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub success: bool,
    /// Correlates the response with the server log entry
    pub error_id: String,
    #[schema(example = "validation_error")]
    pub error_type: String,
    pub message: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Message safe to show the client; internal details stay in the log
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal { .. } => INTERNAL_ERROR_MESSAGE.to_string(),
            ApiError::Conflict { message } => conflict_message(message).to_string(),
            other => other.to_string(),
        }
    }
}

/// Client-facing text for a violated constraint
fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "insurance_details_no_active_overlap" => {
            "Another active insurance record overlaps these service dates"
        }
        "insurance_providers_single_default" => "Another provider is already the default",
        c if c.ends_with("_fkey") => "The record references, or is referenced by, another record",
        _ => "The request conflicts with existing records",
    }
}

impl From<InsuranceError> for ApiError {
    fn from(err: InsuranceError) -> Self {
        match err {
            InsuranceError::Validation(message) => ApiError::Validation { message },
            err @ InsuranceError::NotFound { .. } => ApiError::not_found(err.to_string()),
            InsuranceError::Conflict(message) => ApiError::Conflict { message },
            InsuranceError::Database(db_err) => ApiError::internal(db_err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => ApiError::validation(err.to_string()),
            StorageError::Io(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::validation(format!("Invalid multipart request: {}", err.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::validation(format!("Invalid request body: {}", err.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        ApiError::validation(format!("Invalid path parameter: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        ApiError::validation(format!("Invalid multipart request: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();
        let detail = logger_redacted::redact(&self.to_string());

        // Log the error with correlation ID
        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %detail,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %detail,
                "Request rejected"
            );
        }

        let error_response = ApiErrorResponse {
            success: false,
            error_id,
            error_type: self.error_type().to_string(),
            message: self.public_message(),
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(message: impl Into<String>, data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        message: message.into(),
        data,
        pagination: None,
    }
}

/// Helper function to create paginated responses
pub fn api_paginated<T>(message: impl Into<String>, data: T, pagination: PaginationInfo) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        message: message.into(),
        data,
        pagination: Some(pagination),
    }
}

/// `204 No Content` with an empty `data` list
pub fn no_content(message: impl Into<String>) -> Response {
    (
        StatusCode::NO_CONTENT,
        Json(api_success(message, Vec::<serde_json::Value>::new())),
    )
        .into_response()
}
