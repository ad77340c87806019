//! Error types for the persistence layer.
//!
//! This module defines all error types used throughout the persistence layer,
//! following a hierarchy that separates resource state errors, validation
//! errors, search errors and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
///
/// This enum encompasses all possible errors that can occur during persistence
/// operations, organized by category.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Search operation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found.
    #[error("{resource_type} not found: {id}")]
    NotFound { resource_type: String, id: String },

    /// A record with the same unique key already exists.
    #[error("{resource_type} already exists: {key}")]
    AlreadyExists { resource_type: String, key: String },
}

/// Errors related to record validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A field holds a value outside its allowed domain.
    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },
}

/// Errors related to search and listing operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The full-text index is missing or cannot be queried.
    #[error("full-text search not available: {message}")]
    TextSearchNotAvailable { message: String },

    /// A date range bound could not be interpreted as a timestamp.
    #[error("invalid date bound '{value}'")]
    InvalidDateBound { value: String },

    /// Search query parsing failed.
    #[error("failed to parse search query: {message}")]
    QueryParseError { message: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl StorageError {
    /// Shorthand for a [`ResourceError::NotFound`].
    pub fn not_found(resource_type: &str, id: impl Into<String>) -> Self {
        StorageError::Resource(ResourceError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.into(),
        })
    }

    /// Shorthand for a [`ValidationError::InvalidField`].
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        StorageError::Validation(ValidationError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        })
    }

    /// Returns true if this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::NotFound { .. }))
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Validation(ValidationError::InvalidField {
            field: "csv".to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}
