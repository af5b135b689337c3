//! Error handling for the Rice Planting Advisor
//!
//! Every failure kind maps to its own status code and a stable error code so
//! clients can tell a bad request from a provider outage.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::EngineError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Invalid {field}: {message}")]
    Input { field: String, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Prediction errors
    #[error("Missing baseline: {0}")]
    MissingBaseline(String),

    // External service errors
    #[error("Weather provider unavailable: {0}")]
    Provider(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Input {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Input { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingBaseline(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Input { field, message } => AppError::Input { field, message },
            EngineError::Provider(message) => AppError::Provider(message),
            EngineError::NotFound(resource) => AppError::NotFound(resource),
            missing @ (EngineError::MissingBaseline { .. } | EngineError::NoBaselines { .. }) => {
                AppError::MissingBaseline(missing.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::input("body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::input("path", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::input("query", rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        shared::validation_errors_to_input(errors).into()
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Input { field, message } => ErrorResponse {
                error: "INPUT_ERROR".to_string(),
                message: message.clone(),
                details: Some(serde_json::json!({ "field": field })),
            },
            AppError::Unauthorized(msg) => ErrorResponse::new("UNAUTHORIZED", msg.clone()),
            AppError::NotFound(resource) => {
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::MissingBaseline(msg) => ErrorResponse::new("MISSING_BASELINE", msg.clone()),
            AppError::Provider(_) => ErrorResponse::new(
                "PROVIDER_UNAVAILABLE",
                "Weather data is temporarily unavailable, try again later",
            ),
            AppError::DatabaseError(_) => {
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            AppError::Internal(msg) => ErrorResponse::new("INTERNAL_ERROR", msg.clone()),
            AppError::InternalError(_) => {
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
