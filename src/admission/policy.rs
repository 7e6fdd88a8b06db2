//! Windowed segmented admission policy
//!
//! Tracks keys in two insertion-ordered segments. New keys enter a small
//! cold segment and only reach the hot segment once they are seen again,
//! so one-off keys are evicted before they can push out reused ones.

use std::fmt;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::admission::{FrequencyRecord, Segment};
use crate::cache::current_timestamp_ms;
use crate::error::{CacheError, Result};

/// Share of the configured capacity reserved for the cold segment.
const COLD_SHARE: f64 = 0.02;

// == Access Outcome ==
/// Result of reporting one access to the policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessOutcome {
    /// Segment the key lives in afterwards, None if it was evicted at once
    pub segment: Option<Segment>,
    /// Keys dropped by this access, oldest first
    pub evicted: Vec<String>,
}

// == Admission Policy ==
/// Cold/hot segmented admission policy over key identifiers.
///
/// Both segments are ordered oldest to newest. The policy never holds
/// values; owners of the bounded cache act on [`AccessOutcome::evicted`].
pub struct AdmissionPolicy {
    cold: LruCache<String, FrequencyRecord>,
    hot: LruCache<String, FrequencyRecord>,
    cold_capacity: usize,
    hot_capacity: usize,
}

impl AdmissionPolicy {
    // == Constructor ==
    /// Creates a policy bounding the total number of tracked keys.
    ///
    /// The cold segment gets `max(1, round(capacity * 0.02))` slots and the
    /// hot segment the rest.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "admission capacity must be at least 1".to_string(),
            ));
        }

        let cold_capacity = ((capacity as f64 * COLD_SHARE).round() as usize).max(1);
        let hot_capacity = capacity - cold_capacity;

        Ok(Self {
            cold: LruCache::unbounded(),
            hot: LruCache::unbounded(),
            cold_capacity,
            hot_capacity,
        })
    }

    // == Record Access ==
    /// Reports an access to `key` using the current clock.
    pub fn record_access(&mut self, key: &str) -> AccessOutcome {
        self.record_access_at(key, current_timestamp_ms())
    }

    /// Reports an access to `key` observed at `now` (Unix ms).
    pub fn record_access_at(&mut self, key: &str, now: u64) -> AccessOutcome {
        let mut evicted = Vec::new();

        if let Some(mut record) = self.cold.pop(key) {
            let rate = record.observe(now);
            self.admit_from_cold(key, record, rate, now);
        } else if let Some(record) = self.hot.get_mut(key) {
            // get_mut already moved it to the newest position
            record.observe(now);
        } else {
            // Unseen, including the very first key of an empty policy
            self.cold
                .put(key.to_string(), FrequencyRecord::first_seen(now));
        }

        self.evict_cold_overflow(&mut evicted);

        AccessOutcome {
            segment: self.segment_of(key),
            evicted,
        }
    }

    /// Places a cold key that was just accessed again.
    fn admit_from_cold(&mut self, key: &str, record: FrequencyRecord, rate: f64, now: u64) {
        if self.hot.len() < self.hot_capacity {
            self.hot.put(key.to_string(), record);
            return;
        }

        let beats_weakest = self
            .hot
            .peek_lru()
            .map(|(_, weakest)| rate >= weakest.hourly_rate(now))
            .unwrap_or(false);

        if beats_weakest {
            if let Some((demoted_key, demoted)) = self.hot.pop_lru() {
                debug!(key = %demoted_key, "demoting hot key to cold segment");
                self.cold.put(demoted_key, demoted);
            }
            self.hot.put(key.to_string(), record);
        } else {
            // Back to the cold tail to keep accumulating frequency
            self.cold.put(key.to_string(), record);
        }
    }

    /// Drops the oldest cold keys until the cold segment fits.
    fn evict_cold_overflow(&mut self, evicted: &mut Vec<String>) {
        while self.cold.len() > self.cold_capacity {
            match self.cold.pop_lru() {
                Some((key, _)) => {
                    debug!(key = %key, "evicting cold key");
                    evicted.push(key);
                }
                None => break,
            }
        }
    }

    // == Forget ==
    /// Stops tracking `key`, e.g. after explicit invalidation.
    ///
    /// # Returns
    /// `true` if the key was tracked.
    pub fn forget(&mut self, key: &str) -> bool {
        self.cold.pop(key).is_some() || self.hot.pop(key).is_some()
    }

    // == Queries ==
    /// Segment currently holding `key`, without touching its position.
    pub fn segment_of(&self, key: &str) -> Option<Segment> {
        if self.hot.contains(key) {
            Some(Segment::Hot)
        } else if self.cold.contains(key) {
            Some(Segment::Cold)
        } else {
            None
        }
    }

    /// Access metadata for `key`, if tracked.
    pub fn record(&self, key: &str) -> Option<FrequencyRecord> {
        self.hot
            .peek(key)
            .or_else(|| self.cold.peek(key))
            .copied()
    }

    /// Hot keys, weakest (oldest) first.
    pub fn hot_keys(&self) -> Vec<String> {
        self.hot.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    /// Cold keys, next eviction candidate first.
    pub fn cold_keys(&self) -> Vec<String> {
        self.cold.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    /// Total tracked keys across both segments.
    pub fn len(&self) -> usize {
        self.cold.len() + self.hot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cold_capacity + self.hot_capacity
    }

    pub fn cold_capacity(&self) -> usize {
        self.cold_capacity
    }

    pub fn hot_capacity(&self) -> usize {
        self.hot_capacity
    }
}

impl fmt::Debug for AdmissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionPolicy")
            .field("cold", &self.cold.len())
            .field("hot", &self.hot.len())
            .field("cold_capacity", &self.cold_capacity)
            .field("hot_capacity", &self.hot_capacity)
            .finish()
    }
}

// == Admission Snapshot ==
/// Serializable view of the policy state.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionSnapshot {
    pub capacity: usize,
    pub cold_capacity: usize,
    pub hot_capacity: usize,
    pub cold: Vec<String>,
    pub hot: Vec<String>,
}

// == Shared Admission Policy ==
/// Thread-safe handle applying every transition under one mutex.
#[derive(Debug)]
pub struct SharedAdmissionPolicy {
    inner: Mutex<AdmissionPolicy>,
}

impl SharedAdmissionPolicy {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(AdmissionPolicy::new(capacity)?),
        })
    }

    pub fn record_access(&self, key: &str) -> AccessOutcome {
        self.inner.lock().record_access(key)
    }

    pub fn forget(&self, key: &str) -> bool {
        self.inner.lock().forget(key)
    }

    pub fn segment_of(&self, key: &str) -> Option<Segment> {
        self.inner.lock().segment_of(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        let policy = self.inner.lock();
        AdmissionSnapshot {
            capacity: policy.capacity(),
            cold_capacity: policy.cold_capacity(),
            hot_capacity: policy.hot_capacity(),
            cold: policy.cold_keys(),
            hot: policy.hot_keys(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3_600_000;

    #[test]
    fn test_rejects_zero_capacity() {
        assert!(matches!(
            AdmissionPolicy::new(0),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_segment_capacities() {
        let policy = AdmissionPolicy::new(1000).unwrap();
        assert_eq!(policy.cold_capacity(), 20);
        assert_eq!(policy.hot_capacity(), 980);

        let small = AdmissionPolicy::new(10).unwrap();
        assert_eq!(small.cold_capacity(), 1);
        assert_eq!(small.hot_capacity(), 9);

        let rounded = AdmissionPolicy::new(80).unwrap();
        assert_eq!(rounded.cold_capacity(), 2);
        assert_eq!(rounded.hot_capacity(), 78);

        let single = AdmissionPolicy::new(1).unwrap();
        assert_eq!(single.cold_capacity(), 1);
        assert_eq!(single.hot_capacity(), 0);
    }

    #[test]
    fn test_first_access_goes_cold() {
        let mut policy = AdmissionPolicy::new(100).unwrap();

        let outcome = policy.record_access_at("a", 0);

        assert_eq!(outcome.segment, Some(Segment::Cold));
        assert!(outcome.evicted.is_empty());
        assert_eq!(policy.record("a").unwrap().access_count, 1);
    }

    #[test]
    fn test_second_access_promotes_when_hot_has_room() {
        let mut policy = AdmissionPolicy::new(100).unwrap();

        policy.record_access_at("a", 0);
        let outcome = policy.record_access_at("a", 10);

        assert_eq!(outcome.segment, Some(Segment::Hot));
        assert_eq!(policy.record("a").unwrap().access_count, 2);
        assert!(policy.cold_keys().is_empty());
    }

    #[test]
    fn test_unseen_key_evicts_oldest_cold() {
        // capacity 50 -> cold 1, hot 49
        let mut policy = AdmissionPolicy::new(50).unwrap();

        policy.record_access_at("a", 0);
        let outcome = policy.record_access_at("b", 1);

        assert_eq!(outcome.evicted, vec!["a".to_string()]);
        assert_eq!(outcome.segment, Some(Segment::Cold));
        assert_eq!(policy.segment_of("a"), None);
    }

    #[test]
    fn test_hot_access_moves_to_tail() {
        let mut policy = AdmissionPolicy::new(100).unwrap();
        for key in ["a", "b", "c"] {
            policy.record_access_at(key, 0);
            policy.record_access_at(key, 1);
        }
        assert_eq!(policy.hot_keys(), vec!["a", "b", "c"]);

        let outcome = policy.record_access_at("a", 2);

        assert_eq!(outcome.segment, Some(Segment::Hot));
        assert_eq!(policy.hot_keys(), vec!["b", "c", "a"]);
        assert_eq!(policy.record("a").unwrap().access_count, 3);
    }

    /// capacity 3 -> cold 1, hot 2
    fn full_policy() -> AdmissionPolicy {
        let mut policy = AdmissionPolicy::new(3).unwrap();
        for key in ["h1", "h2"] {
            policy.record_access_at(key, 0);
            policy.record_access_at(key, 0);
        }
        assert_eq!(policy.hot_keys(), vec!["h1", "h2"]);
        policy
    }

    #[test]
    fn test_cold_key_displaces_weaker_hot_key() {
        let mut policy = full_policy();

        // h1 has count 2, the candidate reaches 2 on its second access
        policy.record_access_at("c", 0);
        let outcome = policy.record_access_at("c", 0);
        assert_eq!(outcome.segment, Some(Segment::Hot));
        assert_eq!(policy.segment_of("h1"), Some(Segment::Cold));
        assert_eq!(policy.hot_keys(), vec!["h2", "c"]);
        assert!(policy.len() <= policy.capacity());
    }

    #[test]
    fn test_cold_key_stays_cold_against_stronger_hot_key() {
        let mut policy = full_policy();
        for _ in 0..5 {
            policy.record_access_at("h1", 0);
            policy.record_access_at("h2", 0);
        }

        policy.record_access_at("c", 0);
        let outcome = policy.record_access_at("c", 0);

        assert_eq!(outcome.segment, Some(Segment::Cold));
        assert_eq!(policy.record("c").unwrap().access_count, 2);
        assert_eq!(policy.hot_keys(), vec!["h1", "h2"]);
    }

    #[test]
    fn test_idle_hot_key_loses_to_recent_candidate() {
        let mut policy = full_policy();
        for _ in 0..4 {
            policy.record_access_at("h1", 0);
        }
        policy.record_access_at("h2", 0);
        // h1 (count 6) has sat idle for 10 hours: rate 0.6/h
        let now = 10 * HOUR;

        policy.record_access_at("c", now);
        let outcome = policy.record_access_at("c", now);

        assert_eq!(outcome.segment, Some(Segment::Hot));
        assert_eq!(policy.segment_of("h1"), Some(Segment::Cold));
    }

    #[test]
    fn test_frequent_key_ends_hot_and_one_offs_are_evicted() {
        let mut policy = AdmissionPolicy::new(100).unwrap();
        let mut evicted = Vec::new();

        for i in 0..50 {
            policy.record_access_at("popular", i);
            evicted.extend(policy.record_access_at(&format!("once-{i}"), i).evicted);
        }

        assert_eq!(policy.segment_of("popular"), Some(Segment::Hot));
        assert!(!evicted.contains(&"popular".to_string()));
        assert!(evicted.iter().all(|key| key.starts_with("once-")));
        assert!(policy.hot_keys() == vec!["popular".to_string()]);
    }

    #[test]
    fn test_single_slot_policy() {
        let mut policy = AdmissionPolicy::new(1).unwrap();

        policy.record_access_at("a", 0);
        let outcome = policy.record_access_at("a", 1);
        assert_eq!(outcome.segment, Some(Segment::Cold));

        let outcome = policy.record_access_at("b", 2);
        assert_eq!(outcome.evicted, vec!["a".to_string()]);
        assert_eq!(policy.len(), 1);
    }

    #[test]
    fn test_forget() {
        let mut policy = AdmissionPolicy::new(100).unwrap();
        policy.record_access_at("a", 0);
        policy.record_access_at("b", 0);
        policy.record_access_at("b", 0);

        assert!(policy.forget("a"));
        assert!(policy.forget("b"));
        assert!(!policy.forget("c"));
        assert!(policy.is_empty());
    }

    #[test]
    fn test_shared_policy_snapshot() {
        let shared = SharedAdmissionPolicy::new(100).unwrap();
        shared.record_access("a");
        shared.record_access("b");
        shared.record_access("b");

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.capacity, 100);
        assert_eq!(snapshot.cold, vec!["a".to_string()]);
        assert_eq!(snapshot.hot, vec!["b".to_string()]);
        assert_eq!(shared.len(), 2);
    }
}
