//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
///
/// `ttl` and `expires_at` are either both set or both `None`. The key is
/// held by the store map, not the entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time to live, None = never expires
    pub ttl: Option<Duration>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry as if it had been written at `now` (Unix ms).
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Optional time to live, saturating at the end of the clock
    /// * `now` - Write time in Unix milliseconds
    pub fn created_at(value: Value, ttl: Option<Duration>, now: u64) -> Self {
        let expires_at = ttl.map(|ttl| now.saturating_add(duration_ms(ttl)));

        Self {
            value,
            created_at: now,
            ttl,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks expiry against an explicit clock reading (Unix ms).
    ///
    /// An entry is expired once `now` reaches its expiration time, so a zero
    /// TTL expires immediately.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or_default()
}

/// Whole milliseconds in `duration`, clamped to `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
