//! Per-operation cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache settings attached to one operation.
///
/// The caller resolves any dynamic key template before building the
/// directive; `dynamic_key_suffix` is that resolved text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDirective {
    /// Base cache keys
    pub keys: Vec<String>,
    /// Appended to every base key as `base:suffix` when non-empty
    #[serde(default)]
    pub dynamic_key_suffix: String,
    /// Entry lifetime in seconds, negative for no expiry
    #[serde(default = "no_expiry")]
    pub expiration_seconds: i64,
    /// Re-store a hit to restart its TTL
    #[serde(default)]
    pub renew_on_hit: bool,
}

fn no_expiry() -> i64 {
    -1
}

impl CacheDirective {
    /// Directive for `keys` with no suffix, no expiry and no renewal.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            dynamic_key_suffix: String::new(),
            expiration_seconds: no_expiry(),
            renew_on_hit: false,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.dynamic_key_suffix = suffix.into();
        self
    }

    pub fn with_expiration(mut self, seconds: i64) -> Self {
        self.expiration_seconds = seconds;
        self
    }

    pub fn renewing(mut self) -> Self {
        self.renew_on_hit = true;
        self
    }

    /// Keys actually used in the cache, in declaration order.
    pub fn resolved_keys(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(|base| {
                if self.dynamic_key_suffix.is_empty() {
                    base.clone()
                } else {
                    format!("{}:{}", base, self.dynamic_key_suffix)
                }
            })
            .collect()
    }
}

/// Converts an expiration in seconds to a TTL, `None` for negative values.
pub fn ttl_from_seconds(seconds: i64) -> Option<Duration> {
    u64::try_from(seconds).ok().map(Duration::from_secs)
}
