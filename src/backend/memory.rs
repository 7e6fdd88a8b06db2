//! In-process remote backend
//!
//! Serves the remote contract from a [`CacheStore`]. Useful for
//! single-process deployments and for exercising lock and remote-cache
//! behaviour without a network service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{BackendResult, RemoteBackend};
use crate::cache::CacheStore;
use crate::error::{BackendError, CacheError};

/// Remote backend kept in process memory.
#[derive(Debug)]
pub struct MemoryBackend {
    store: Arc<CacheStore>,
    available: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_store(Arc::new(CacheStore::new()))
    }

    /// Serves the contract from an existing store.
    pub fn with_store(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            available: AtomicBool::new(true),
        }
    }

    /// The store holding the backend's keys.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Simulates an outage: while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    fn ensure_available(&self) -> BackendResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("memory backend offline".to_string()))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn rejected(err: CacheError) -> BackendError {
    BackendError::Indeterminate(err.to_string())
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.ensure_available()?;
        Ok(self.store.get(key).map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> BackendResult<()> {
        self.ensure_available()?;
        self.store
            .set_with_expiry(key, Value::String(value.to_string()), ttl)
            .map_err(rejected)
    }

    async fn delete(&self, keys: &[String]) -> BackendResult<usize> {
        self.ensure_available()?;
        Ok(self.store.delete_all(keys))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> BackendResult<Vec<String>> {
        self.ensure_available()?;
        Ok(self.store.keys_with_prefix(prefix).into_iter().collect())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<bool> {
        self.ensure_available()?;
        self.store
            .set_if_absent(key, Value::String(value.to_string()), Some(ttl))
            .map_err(rejected)
    }
}
