//! Cache Store Module
//!
//! Concurrent expiring key-value map with lazy expiry on access and a
//! periodic sweep for entries nobody reads again.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, StatCounters};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// In-process cache storage with TTL support.
///
/// All operations take `&self`; the map is sharded so callers on different
/// threads can read, write and delete concurrently.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: DashMap<String, CacheEntry>,
    /// Performance statistics
    stats: StatCounters,
    /// Set while a sweep is running
    sweeping: AtomicBool,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a value that never expires.
    ///
    /// Overwrites any existing entry for `key`.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        self.set_with_expiry(key, value, None)
    }

    /// Stores a value that expires `ttl_seconds` from now.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl_seconds: u64) -> Result<()> {
        self.set_with_expiry(key, value, Some(Duration::from_secs(ttl_seconds)))
    }

    /// Stores a value with an optional TTL of any precision.
    pub fn set_with_expiry(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into();
        validate(&key, &value)?;

        let entry = CacheEntry::created_at(value, ttl, current_timestamp_ms());
        self.entries.insert(key, entry);
        Ok(())
    }

    // == Set If Absent ==
    /// Stores the value only when no live entry exists for `key`.
    ///
    /// An expired occupant counts as absent and is replaced. The check and
    /// the write happen under the key's shard lock.
    ///
    /// # Returns
    /// `true` if the value was written.
    pub fn set_if_absent(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let key = key.into();
        validate(&key, &value)?;

        let now = current_timestamp_ms();
        let entry = CacheEntry::created_at(value, ttl, now);

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(now) {
                    occupied.insert(entry);
                    self.stats.record_expirations(1);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(true)
            }
        }
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// An expired entry is removed first and reported as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = current_timestamp_ms();
        self.expire_if_due(key, now);

        let value = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone());

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    // == Exists ==
    /// Reports whether a live entry exists for `key`.
    pub fn exists(&self, key: &str) -> bool {
        let now = current_timestamp_ms();
        self.expire_if_due(key, now);

        self.entries
            .get(key)
            .map(|entry| !entry.is_expired_at(now))
            .unwrap_or(false)
    }

    // == Keys With Prefix ==
    /// Returns every live key starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> HashSet<String> {
        let now = current_timestamp_ms();
        self.expire_if_due(prefix, now);

        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    // == Delete ==
    /// Removes an entry by key. Absent keys are ignored.
    ///
    /// # Returns
    /// `true` if an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every listed key, returning how many were present.
    pub fn delete_all<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .filter(|key| self.delete(key.as_ref()))
            .count()
    }

    /// Removes a key on behalf of a capacity policy and counts the eviction.
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.delete(key);
        if removed {
            self.stats.record_evictions(1);
        }
        removed
    }

    // == Sweep Expired ==
    /// Removes all expired entries.
    ///
    /// Overlapping calls are skipped rather than queued: a second caller
    /// arriving while a sweep is in progress gets `None`.
    ///
    /// # Returns
    /// The number of entries removed, or `None` if the run was skipped.
    pub fn sweep_expired(&self) -> Option<usize> {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("TTL sweep already running, skipping");
            return None;
        }

        let now = current_timestamp_ms();
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            let live = !entry.is_expired_at(now);
            if !live {
                removed += 1;
            }
            live
        });

        self.stats.record_expirations(removed as u64);
        self.sweeping.store(false, Ordering::Release);
        Some(removed)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet
    /// collected.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lazily removes `key` if its TTL has elapsed.
    fn expire_if_due(&self, key: &str, now: u64) {
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            self.stats.record_expirations(1);
        }
    }
}

/// Rejects empty keys and null values before any mutation.
fn validate(key: &str, value: &Value) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if value.is_null() {
        return Err(CacheError::InvalidValue(key.to_string()));
    }
    Ok(())
}
