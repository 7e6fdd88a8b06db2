//! Cache-aside, write-through and invalidation over the active backend

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::admission::SharedAdmissionPolicy;
use crate::backend::RemoteBackend;
use crate::cache::CacheStore;
use crate::error::{CacheError, Result};
use crate::orchestrator::directive::{ttl_from_seconds, CacheDirective};

// == Cache Backend ==
/// Where cached values live.
#[derive(Clone)]
pub enum CacheBackend {
    /// In-process store bounded by the admission policy
    Local {
        store: Arc<CacheStore>,
        admission: Arc<SharedAdmissionPolicy>,
    },
    /// Shared key-value service holding JSON text
    Remote(Arc<dyn RemoteBackend>),
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Local { store, admission } => f
                .debug_struct("Local")
                .field("entries", &store.len())
                .field("admitted", &admission.len())
                .finish(),
            CacheBackend::Remote(_) => f.write_str("Remote"),
        }
    }
}

// == Cache Orchestrator ==
/// Runs cache-aside reads, write-through puts and prefix invalidation.
///
/// Concurrent misses on the same key each run their compute callback; the
/// last write wins.
#[derive(Debug, Clone)]
pub struct CacheOrchestrator {
    backend: CacheBackend,
}

impl CacheOrchestrator {
    pub fn new(backend: CacheBackend) -> Self {
        Self { backend }
    }

    pub fn local(store: Arc<CacheStore>, admission: Arc<SharedAdmissionPolicy>) -> Self {
        Self::new(CacheBackend::Local { store, admission })
    }

    pub fn remote(backend: Arc<dyn RemoteBackend>) -> Self {
        Self::new(CacheBackend::Remote(backend))
    }

    /// Name of the active backend, `"local"` or `"remote"`.
    pub fn backend_kind(&self) -> &'static str {
        match self.backend {
            CacheBackend::Local { .. } => "local",
            CacheBackend::Remote(_) => "remote",
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// # Arguments
    /// * `key` - Cache key
    /// * `ttl_seconds` - Lifetime of a stored result, negative for no expiry
    /// * `renew_on_hit` - Re-store a hit so its TTL starts over
    /// * `compute` - Produces the value on a miss; `None` is returned but not cached
    ///
    /// # Returns
    /// The cached or computed value. A failing `compute` is reported as
    /// `ComputeFailure` and nothing is cached.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: i64,
        renew_on_hit: bool,
        compute: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        ensure_key(key)?;
        let ttl = ttl_from_seconds(ttl_seconds);

        if let Some(raw) = self.read(key).await? {
            debug!(key, "cache hit");
            if renew_on_hit {
                self.renew(key, raw.clone(), ttl).await?;
            }
            return Ok(Some(serde_json::from_value(raw)?));
        }

        debug!(key, "cache miss, computing");
        let computed = compute().await.map_err(CacheError::ComputeFailure)?;
        if let Some(value) = &computed {
            self.write(key, serde_json::to_value(value)?, ttl).await?;
        }
        Ok(computed)
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: i64,
    ) -> Result<()> {
        ensure_key(key)?;
        self.write(key, serde_json::to_value(value)?, ttl_from_seconds(ttl_seconds))
            .await
    }

    // == Clear By Prefix ==
    /// Deletes every key starting with `prefix`.
    ///
    /// # Returns
    /// Number of keys removed.
    pub async fn clear_by_prefix(&self, prefix: &str) -> Result<usize> {
        ensure_key(prefix)?;

        let removed = match &self.backend {
            CacheBackend::Local { store, admission } => {
                let keys = store.keys_with_prefix(prefix);
                for key in &keys {
                    admission.forget(key);
                }
                store.delete_all(&keys)
            }
            CacheBackend::Remote(remote) => {
                let keys = remote.keys_with_prefix(prefix).await?;
                remote.delete(&keys).await?
            }
        };

        if removed > 0 {
            info!(prefix, removed, "cleared cache keys");
        }
        Ok(removed)
    }

    // == Lookup ==
    /// Reads `key` without computing anything on a miss.
    pub async fn lookup(&self, key: &str) -> Result<Option<Value>> {
        ensure_key(key)?;
        self.read(key).await
    }

    // == Directive Operations ==
    /// Cache-aside over every key of `directive`.
    ///
    /// Hits are renewed when the directive asks for it. If any key misses,
    /// `compute` runs once and its result is stored under every missed key;
    /// that fresh result is returned. Without a miss, the first hit in key
    /// order is returned.
    pub async fn cached<T, F, Fut>(&self, directive: &CacheDirective, compute: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let keys = directive_keys(directive)?;
        let ttl = ttl_from_seconds(directive.expiration_seconds);

        let mut first_hit = None;
        let mut missed = Vec::new();
        for key in keys {
            match self.read(&key).await? {
                Some(raw) => {
                    if directive.renew_on_hit {
                        self.renew(&key, raw.clone(), ttl).await?;
                    }
                    first_hit.get_or_insert(raw);
                }
                None => missed.push(key),
            }
        }

        if missed.is_empty() {
            return first_hit
                .map(serde_json::from_value)
                .transpose()
                .map_err(CacheError::from);
        }

        debug!(missed = missed.len(), "directive miss, computing");
        let computed = compute().await.map_err(CacheError::ComputeFailure)?;
        match computed {
            Some(value) => {
                let raw = serde_json::to_value(&value)?;
                for key in &missed {
                    self.write(key, raw.clone(), ttl).await?;
                }
                Ok(Some(value))
            }
            None => first_hit
                .map(serde_json::from_value)
                .transpose()
                .map_err(CacheError::from),
        }
    }

    /// Write-through of `value` under every key of `directive`.
    pub async fn put_all<T: Serialize + ?Sized>(
        &self,
        directive: &CacheDirective,
        value: &T,
    ) -> Result<()> {
        let keys = directive_keys(directive)?;
        let raw = serde_json::to_value(value)?;
        let ttl = ttl_from_seconds(directive.expiration_seconds);
        for key in &keys {
            self.write(key, raw.clone(), ttl).await?;
        }
        Ok(())
    }

    /// Clears every key of `directive` as a prefix.
    ///
    /// # Returns
    /// Total number of keys removed.
    pub async fn clear(&self, directive: &CacheDirective) -> Result<usize> {
        let mut removed = 0;
        for prefix in directive_keys(directive)? {
            removed += self.clear_by_prefix(&prefix).await?;
        }
        Ok(removed)
    }

    // == Backend Access ==
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        match &self.backend {
            CacheBackend::Local { store, .. } => {
                let value = store.get(key);
                if value.is_some() {
                    self.admit(key);
                }
                Ok(value)
            }
            CacheBackend::Remote(remote) => match remote.get(key).await? {
                Some(text) => Ok(Some(serde_json::from_str(&text)?)),
                None => Ok(None),
            },
        }
    }

    /// Stores a computed or put value and reports the write for admission.
    async fn write(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        if value.is_null() {
            debug!(key, "null result not cached");
            return Ok(());
        }
        self.store_raw(key, value, ttl).await?;
        self.admit(key);
        Ok(())
    }

    /// Re-stores a hit with a fresh TTL.
    ///
    /// The key may have been evicted since it was read, so the rewrite is
    /// admitted again to keep every stored key tracked.
    async fn renew(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        self.store_raw(key, value, ttl).await?;
        self.admit(key);
        Ok(())
    }

    async fn store_raw(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        match &self.backend {
            CacheBackend::Local { store, .. } => store.set_with_expiry(key, value, ttl),
            CacheBackend::Remote(remote) => {
                let text = serde_json::to_string(&value)?;
                remote.set(key, &text, ttl).await?;
                Ok(())
            }
        }
    }

    /// Records an access and drops whatever the policy evicted.
    fn admit(&self, key: &str) {
        if let CacheBackend::Local { store, admission } = &self.backend {
            let outcome = admission.record_access(key);
            for evicted in &outcome.evicted {
                store.evict(evicted);
            }
            if !outcome.evicted.is_empty() {
                debug!(key, evicted = outcome.evicted.len(), "admission evicted keys");
            }
        }
    }
}

fn ensure_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

fn directive_keys(directive: &CacheDirective) -> Result<Vec<String>> {
    if directive.keys.is_empty() {
        return Err(CacheError::InvalidKey("directive has no keys".to_string()));
    }
    let keys = directive.resolved_keys();
    for key in &keys {
        ensure_key(key)?;
    }
    Ok(keys)
}
