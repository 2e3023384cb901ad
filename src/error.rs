//! Error types for the lending library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error codes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Required field absent
    Missing,
    /// Field present but of the wrong type or shape
    BadType,
    /// Structurally valid request violating a domain rule
    BadReq,
    /// Backend lookup miss
    NotFound,
    /// Opaque persistence failure
    Backend,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Missing => "MISSING",
            ErrorCode::BadType => "BAD_TYPE",
            ErrorCode::BadReq => "BAD_REQ",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Backend => "BACKEND",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error, optionally attributed to the request field ("widget")
/// responsible for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FieldError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
}

impl FieldError {
    pub fn new(code: ErrorCode, message: impl Into<String>, widget: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            widget: Some(widget.into()),
        }
    }

    /// Error not tied to any particular field
    pub fn global(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            widget: None,
        }
    }

    pub fn missing(widget: &str) -> Self {
        Self::new(ErrorCode::Missing, format!("property {} is required", widget), widget)
    }

    pub fn bad_type(widget: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::BadType,
            format!("{} must have type {}", widget, expected),
            widget,
        )
    }

    pub fn bad_req(widget: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadReq, message, widget)
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.widget {
            Some(widget) => write!(f, "{} ({}): {}", self.code, widget, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Structural request defects, all of them at once
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<FieldError>),

    /// First violated business rule
    #[error("Business rule violation: {0}")]
    BusinessRule(FieldError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_req(widget: &str, message: impl Into<String>) -> Self {
        AppError::BusinessRule(FieldError::bad_req(widget, message))
    }

    /// Code of the (first) error carried
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(errors) => errors
                .first()
                .map(|e| e.code)
                .unwrap_or(ErrorCode::BadReq),
            AppError::BusinessRule(e) => e.code,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Database(_) | AppError::Backend(_) | AppError::Internal(_) => {
                ErrorCode::Backend
            }
        }
    }

    /// Flatten into the list form returned to callers
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            AppError::Validation(errors) => errors.clone(),
            AppError::BusinessRule(e) => vec![e.clone()],
            AppError::NotFound(msg) => vec![FieldError::global(ErrorCode::NotFound, msg.clone())],
            AppError::Database(_) => {
                vec![FieldError::global(ErrorCode::Backend, "Database error")]
            }
            AppError::Backend(_) | AppError::Internal(_) => {
                vec![FieldError::global(ErrorCode::Backend, "Internal server error")]
            }
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Backend(msg) => {
                tracing::error!("Storage backend error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            errors: self.field_errors(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
