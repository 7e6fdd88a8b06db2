//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for a lookup (GET /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    /// The requested key
    pub key: String,
    /// The cached value
    pub value: Value,
}

impl LookupResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for a put (PUT /cache)
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: String,
}

impl PutResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' stored successfully", key),
            key,
        }
    }
}

/// Response body for a prefix clear (DELETE /cache/:prefix)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// The prefix that was cleared
    pub prefix: String,
    /// Number of keys removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(prefix: impl Into<String>, removed: usize) -> Self {
        Self {
            prefix: prefix.into(),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Active cache backend, `local` or `remote`
    pub backend: String,
    /// Number of local cache hits
    pub hits: u64,
    /// Number of local cache misses
    pub misses: u64,
    /// Entries removed by lazy expiry or the sweep
    pub expirations: u64,
    /// Entries dropped by the admission policy
    pub evictions: u64,
    /// Current number of local entries
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Keys tracked by the admission policy
    pub admitted_keys: usize,
    /// Lease renewers currently running
    pub active_renewers: usize,
    /// Most lease renewers allowed at once
    pub renewer_capacity: usize,
}

impl StatsResponse {
    pub fn new(
        backend: impl Into<String>,
        stats: CacheStats,
        admitted_keys: usize,
        active_renewers: usize,
        renewer_capacity: usize,
    ) -> Self {
        Self {
            backend: backend.into(),
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            admitted_keys,
            active_renewers,
            renewer_capacity,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Active cache backend
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
