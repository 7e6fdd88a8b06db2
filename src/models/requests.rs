//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CacheError;

/// Request body for the PUT operation (PUT /cache)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value except `null`
/// - `ttl_seconds`: Lifetime in seconds, negative or absent for no expiry
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Lifetime in seconds
    #[serde(default = "no_expiry")]
    pub ttl_seconds: i64,
}

fn no_expiry() -> i64 {
    -1
}

impl PutRequest {
    /// Validates the request data
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.key.is_empty() {
            return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
        }
        if self.key.len() > 256 {
            return Err(CacheError::InvalidKey(
                "Key exceeds maximum length of 256 characters".to_string(),
            ));
        }
        if self.value.is_null() {
            return Err(CacheError::InvalidValue(self.key.clone()));
        }
        Ok(())
    }
}
