//! Configuration Module
//!
//! Handles loading and validating caching layer configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::lock::{LockSettings, LockWait};

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// In-process store with admission control
    Local,
    /// Shared remote key-value service
    Remote,
}

impl FromStr for BackendType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "simple" => Ok(BackendType::Local),
            "remote" | "redis" => Ok(BackendType::Remote),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache backend '{other}'"
            ))),
        }
    }
}

/// Caching layer configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Active cache backend
    pub backend_type: BackendType,
    /// Lock wait budget in milliseconds, -1 waits forever
    pub lock_wait_timeout_ms: i64,
    /// Keys tracked by the admission policy
    pub capacity: usize,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Lock lease in seconds
    pub lock_lease_seconds: u64,
    /// Lease renewal interval in milliseconds
    pub lock_renew_interval_ms: u64,
    /// Sleep between lock attempts in milliseconds
    pub lock_retry_backoff_ms: u64,
    /// Maximum concurrently running lease renewers
    pub renewer_pool_size: usize,
    /// Remote backend address
    pub redis_url: Option<String>,
    /// Admin HTTP port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `local` or `remote` (default: local)
    /// - `LOCK_WAIT_TIMEOUT_MS` - Lock wait budget, -1 for unbounded (default: 30000)
    /// - `CACHE_CAPACITY` - Admission capacity (default: 10000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 10)
    /// - `LOCK_LEASE_SECONDS` - Lock lease (default: 5)
    /// - `LOCK_RENEW_INTERVAL_MS` - Lease renewal interval (default: 1000)
    /// - `LOCK_RETRY_BACKOFF_MS` - Lock retry backoff (default: 10)
    /// - `RENEWER_POOL_SIZE` - Concurrent renewers (default: 1024)
    /// - `REDIS_URL` - Remote backend address (default: unset)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend_type: parsed("CACHE_BACKEND").unwrap_or(defaults.backend_type),
            lock_wait_timeout_ms: parsed("LOCK_WAIT_TIMEOUT_MS")
                .unwrap_or(defaults.lock_wait_timeout_ms),
            capacity: parsed("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            sweep_interval: parsed("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            lock_lease_seconds: parsed("LOCK_LEASE_SECONDS").unwrap_or(defaults.lock_lease_seconds),
            lock_renew_interval_ms: parsed("LOCK_RENEW_INTERVAL_MS")
                .unwrap_or(defaults.lock_renew_interval_ms),
            lock_retry_backoff_ms: parsed("LOCK_RETRY_BACKOFF_MS")
                .unwrap_or(defaults.lock_retry_backoff_ms),
            renewer_pool_size: parsed("RENEWER_POOL_SIZE").unwrap_or(defaults.renewer_pool_size),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Rejects values the caching layer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval == 0 {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be at least 1 second".to_string(),
            ));
        }
        if self.lock_lease_seconds == 0 || self.lock_renew_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "lock lease and renew interval must be positive".to_string(),
            ));
        }
        if self.lock_renew_interval_ms >= self.lock_lease_seconds.saturating_mul(1000) {
            return Err(CacheError::InvalidConfig(
                "lock renew interval must be shorter than the lease".to_string(),
            ));
        }
        if self.renewer_pool_size == 0 {
            return Err(CacheError::InvalidConfig(
                "renewer pool size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock timing derived from this configuration.
    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            lease: Duration::from_secs(self.lock_lease_seconds),
            renew_interval: Duration::from_millis(self.lock_renew_interval_ms),
            retry_backoff: Duration::from_millis(self.lock_retry_backoff_ms),
            wait: LockWait::from_millis(self.lock_wait_timeout_ms),
            renewer_pool_size: self.renewer_pool_size,
        }
    }
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_type: BackendType::Local,
            lock_wait_timeout_ms: 30_000,
            capacity: 10_000,
            sweep_interval: 10,
            lock_lease_seconds: 5,
            lock_renew_interval_ms: 1000,
            lock_retry_backoff_ms: 10,
            renewer_pool_size: 1024,
            redis_url: None,
            server_port: 3000,
        }
    }
}
