//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Backend Error ==
/// Failure reported by a remote key-value backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered, but the reply could not be interpreted
    #[error("indeterminate backend reply: {0}")]
    Indeterminate(String),
}

// == Cache Error Enum ==
/// Unified error type for the caching layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value is null
    #[error("Invalid value for key: {0}")]
    InvalidValue(String),

    /// Key not present (admin lookups only; cache misses are not errors)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Lock could not be obtained within the wait budget
    #[error("Timed out after {waited:?} waiting for lock {key}")]
    LockTimeout { key: String, waited: Duration },

    /// Remote backend failed during acquire or renewal
    #[error("Lock backend error on {key}: {source}")]
    LockBackend {
        key: String,
        #[source]
        source: BackendError,
    },

    /// The renewal pool refused to start a new renewer
    #[error("Lease renewer pool saturated, lock {0} will not be renewed")]
    RenewerSaturated(String),

    /// The caller-supplied compute callback failed
    #[error("Compute failed: {0}")]
    ComputeFailure(#[source] anyhow::Error),

    /// Remote backend failed during a cache operation
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps a backend failure that happened while working on a lock.
    pub fn lock_backend(key: impl Into<String>, source: BackendError) -> Self {
        CacheError::LockBackend {
            key: key.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) | CacheError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::LockTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            CacheError::RenewerSaturated(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::LockBackend { .. } | CacheError::Backend(_) => StatusCode::BAD_GATEWAY,
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::ComputeFailure(_) | CacheError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
