// ABOUTME: Unified error handling with stable error codes and structured context
// ABOUTME: Defines AppError, ErrorCode, and the plan-engine error taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the workspace ends in an [`AppError`]. Engine
//! internals use the richer [`PlanError`] taxonomy, which converts into
//! `AppError` at the service boundary so callers get a stable [`ErrorCode`].

/// Plan generation, verification and titration errors
pub mod plan;

pub use plan::{JobFailure, ParseError, PipelineStage, PlanError, RetryReason};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Standard error codes used throughout the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication & Authorization (1000-1999)
    /// Caller identity could not be verified
    AuthInvalid = 1001,
    /// Caller may not act on the requested resource
    PermissionDenied = 1004,

    // Rate Limiting (2000-2999)
    /// Daily quota (e.g. plan redos) exhausted
    QuotaExceeded = 2001,

    // Validation (3000-3999)
    /// Input failed validation
    InvalidInput = 3000,
    /// Data could not be parsed
    InvalidFormat = 3002,

    // Resource Management (4000-4999)
    /// Resource not found
    ResourceNotFound = 4000,
    /// Resource already exists
    ResourceAlreadyExists = 4001,
    /// Operation not valid for the resource's current state
    InvalidState = 4003,

    // External Services (5000-5999)
    /// Model completion failed
    ExternalServiceError = 5000,
    /// No model provider reachable
    ExternalServiceUnavailable = 5001,

    // Generation (7000-7999)
    /// Plan generation exhausted its attempts
    GenerationFailed = 7000,
    /// The operation must be retried explicitly by the user
    RetryRequired = 7001,

    // Configuration (6000-6999)
    /// Configuration error
    ConfigError = 6000,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    InternalError = 9000,
    /// Persistence failure
    DatabaseError = 9001,
    /// Serialization failure
    SerializationError = 9003,
}

impl ErrorCode {
    /// HTTP status code equivalent for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput | Self::InvalidFormat => 400,
            Self::AuthInvalid => 401,
            Self::PermissionDenied => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceAlreadyExists | Self::InvalidState => 409,
            Self::QuotaExceeded => 429,
            Self::ExternalServiceError | Self::GenerationFailed => 502,
            Self::ExternalServiceUnavailable | Self::RetryRequired => 503,
            Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError => 500,
        }
    }

    /// User-facing description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthInvalid => "The caller could not be authenticated",
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::QuotaExceeded => "Daily quota exceeded",
            Self::InvalidInput => "The provided input is invalid",
            Self::InvalidFormat => "The data format is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::InvalidState => "The operation is not valid in the current state",
            Self::ExternalServiceError => "The model provider returned an error",
            Self::ExternalServiceUnavailable => "No model provider is currently available",
            Self::GenerationFailed => "Plan generation failed",
            Self::RetryRequired => "The operation failed and must be retried",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// User the failing operation acted on
    pub user_id: Option<Uuid>,
    /// Resource (job, plan) identifier if applicable
    pub resource_id: Option<String>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            user_id: None,
            resource_id: None,
            details: serde_json::Value::Null,
        }
    }
}

/// Unified error type for the engine
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a user ID to the error context
    #[must_use]
    pub const fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.context.user_id = Some(user_id);
        self
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// HTTP status code equivalent for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Caller identity could not be verified
    #[must_use]
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Caller may not act on the resource
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// External service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Error response body for external surfaces
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Structured details, omitted when empty
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub details: serde_json::Value,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            code: error.code,
            message: error.message,
            details: error.context.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthInvalid.http_status(), 401);
        assert_eq!(ErrorCode::QuotaExceeded.http_status(), 429);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::RetryRequired.http_status(), 503);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn test_app_error_context() {
        let user = Uuid::new_v4();
        let error = AppError::not_found("plan")
            .with_user_id(user)
            .with_resource_id("job-1");

        assert_eq!(error.code, ErrorCode::ResourceNotFound);
        assert_eq!(error.context.user_id, Some(user));
        assert_eq!(error.context.resource_id.as_deref(), Some("job-1"));
        assert!(error.to_string().contains("plan not found"));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::invalid_input("bad").with_details(serde_json::json!({"field": "x"}));
        let json = serde_json::to_string(&ErrorResponse::from(error)).unwrap();
        assert!(json.contains("INVALID_INPUT"));
        assert!(json.contains("field"));
    }
}
