//! Standardized error handling for the LeadHub API
//!
//! This module provides a consistent error response format across all endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_ERROR", "NOT_FOUND", "UNAUTHORIZED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional field-level errors for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Request path that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            path: None,
        }
    }

}

/// Application error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),

    NotFound(String),

    ValidationError { details: HashMap<String, Vec<String>> },
    BadRequest(String),

    InternalError(String),
    DatabaseError(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InternalError(_) | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized(msg) => msg.clone(),
            Self::Forbidden(msg) => msg.clone(),
            Self::NotFound(resource) => resource.clone(),
            Self::ValidationError { .. } => "Validation failed".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "A database error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = ApiError::new(self.error_code(), self.message());

        if let Self::ValidationError { details } = &self {
            error.details = Some(details.clone());
        }

        (status, Json(error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("Resource not found".to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(format!("Serialization error: {}", err))
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper to add multiple validation errors
pub struct ValidationBuilder {
    details: HashMap<String, Vec<String>>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self {
            details: HashMap::new(),
        }
    }

    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.details
            .entry(field.to_string())
            .or_insert_with(Vec::new)
            .push(message.to_string());
        self
    }

    pub fn build(self) -> Option<AppError> {
        if self.details.is_empty() {
            None
        } else {
            Some(AppError::ValidationError {
                details: self.details,
            })
        }
    }
}

impl Default for ValidationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_builder() {
        let error = ValidationBuilder::new()
            .error("name", "Name is required")
            .error("name", "Name is too long")
            .error("triggers", "At least one trigger is required")
            .build();

        assert!(error.is_some());
        if let Some(AppError::ValidationError { details }) = error {
            assert_eq!(details.get("name").unwrap().len(), 2);
            assert_eq!(details.get("triggers").unwrap().len(), 1);
        }
    }

    #[test]
    fn test_error_codes() {
        // Every variant the service surfaces, with its wire code and status.
        let cases = [
            (AppError::Unauthorized("no".into()), "UNAUTHORIZED", StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("no".into()), "FORBIDDEN", StatusCode::FORBIDDEN),
            (AppError::NotFound("Workflow not found".into()), "NOT_FOUND", StatusCode::NOT_FOUND),
            (
                AppError::ValidationError { details: HashMap::new() },
                "VALIDATION_ERROR",
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::BadRequest("bad".into()), "BAD_REQUEST", StatusCode::BAD_REQUEST),
            (
                AppError::InternalError("boom".into()),
                "INTERNAL_ERROR",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::DatabaseError("down".into()),
                "DATABASE_ERROR",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, code, status) in cases {
            assert_eq!(error.error_code(), code);
            assert_eq!(error.status_code(), status);
        }
    }
}
