//! Error types for the ERx HTTP API.
//!
//! Every failure renders the same JSON envelope:
//!
//! ```json
//! { "success": false, "message": "Medicine not found" }
//! ```
//!
//! `503` responses additionally carry a machine-readable `reason`.
//!
//! # Error Mapping
//!
//! Storage errors from the persistence layer are mapped as follows:
//!
//! | Storage Error | HTTP Status | Message |
//! |--------------|-------------|---------|
//! | NotFound | 404 | `{type} not found` |
//! | AlreadyExists | 409 | `{type} already exists` |
//! | Validation | 400 | the violated constraint |
//! | Search / Backend | 500 | `Server error` |
//!
//! Internal failures are logged with their full detail and never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use erx_persistence::error::{ResourceError, StorageError, ValidationError};
use std::fmt;
use tracing::error;

/// Message returned for every internal failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Server error";

/// The primary error type for REST API operations.
#[derive(Debug)]
pub enum RestError {
    /// Malformed or out-of-range input (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Missing or invalid credentials (HTTP 401).
    Unauthorized {
        /// Error message.
        message: String,
    },

    /// Role or ownership mismatch (HTTP 403).
    Forbidden {
        /// Error message.
        message: String,
    },

    /// Record not found (HTTP 404).
    NotFound {
        /// Error message.
        message: String,
    },

    /// Unique key already taken (HTTP 409).
    Conflict {
        /// Error message.
        message: String,
    },

    /// Optional subsystem not configured (HTTP 503).
    Unavailable {
        /// Machine-readable reason code.
        reason: &'static str,
        /// Error message.
        message: String,
    },

    /// Unexpected failure (HTTP 500). The detail is logged, not returned.
    Internal {
        /// Error detail for the log.
        detail: String,
    },
}

impl RestError {
    /// Creates a 400 error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        RestError::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a 401 error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        RestError::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a 403 error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        RestError::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a 404 error.
    pub fn not_found(message: impl Into<String>) -> Self {
        RestError::NotFound {
            message: message.into(),
        }
    }

    /// Creates a 503 error.
    pub fn unavailable(reason: &'static str, message: impl Into<String>) -> Self {
        RestError::Unavailable {
            reason,
            message: message.into(),
        }
    }

    /// Creates a 500 error and logs the detail.
    pub fn internal(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        error!(%detail, "Internal error");
        RestError::Internal { detail }
    }

    /// Joins a list of validation failures into one 400 error.
    pub fn validation(errors: Vec<ValidationError>) -> Self {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        RestError::BadRequest { message }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RestError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::Conflict { .. } => StatusCode::CONFLICT,
            RestError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RestError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message shown to the caller.
    pub fn public_message(&self) -> &str {
        match self {
            RestError::BadRequest { message }
            | RestError::Unauthorized { message }
            | RestError::Forbidden { message }
            | RestError::NotFound { message }
            | RestError::Conflict { message }
            | RestError::Unavailable { message, .. } => message,
            RestError::Internal { .. } => GENERIC_ERROR_MESSAGE,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            RestError::Forbidden { message } => write!(f, "Forbidden: {}", message),
            RestError::NotFound { message } => write!(f, "Not found: {}", message),
            RestError::Conflict { message } => write!(f, "Conflict: {}", message),
            RestError::Unavailable { reason, message } => {
                write!(f, "Unavailable ({}): {}", reason, message)
            }
            RestError::Internal { detail } => write!(f, "Internal error: {}", detail),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            RestError::Unavailable { reason, message } => serde_json::json!({
                "success": false,
                "message": message,
                "reason": reason,
            }),
            other => serde_json::json!({
                "success": false,
                "message": other.public_message(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

// Implement conversions from storage errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Resource(e) => e.into(),
            StorageError::Validation(e) => e.into(),
            other => RestError::internal(other.to_string()),
        }
    }
}

impl From<ResourceError> for RestError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound { resource_type, .. } => RestError::NotFound {
                message: format!("{} not found", resource_type),
            },
            ResourceError::AlreadyExists { resource_type, .. } => RestError::Conflict {
                message: format!("{} already exists", resource_type),
            },
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidField { message, .. } => RestError::BadRequest { message },
            ValidationError::MissingRequiredField { field } => RestError::BadRequest {
                message: format!("Missing required field: {}", field),
            },
        }
    }
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;
