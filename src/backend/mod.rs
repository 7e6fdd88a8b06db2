//! Remote Backend Module
//!
//! The shared key-value service used for remote caching and distributed
//! locks. Any service offering these five operations can be plugged in.

mod memory;
#[cfg(feature = "redis")]
mod redis_backend;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;

pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use redis_backend::RedisBackend;

/// Result type for remote backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// == Remote Backend Trait ==
/// Operations the caching layer needs from a shared key-value service.
///
/// Values are opaque strings; the orchestrator stores JSON text.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Reads a key, `None` when absent or expired.
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Writes a key, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> BackendResult<()>;

    /// Deletes keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> BackendResult<usize>;

    /// Lists live keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> BackendResult<Vec<String>>;

    /// Writes a key with a TTL only if it is absent.
    ///
    /// # Returns
    /// `true` if this call created the key.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<bool>;
}
