//! Per-key access bookkeeping used by the admission policy.

use serde::{Deserialize, Serialize};

const MS_PER_HOUR: u64 = 3_600_000;

// == Segment ==
/// Which partition of the policy a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Probationary keys, evicted first
    Cold,
    /// Protected keys with proven reuse
    Hot,
}

// == Frequency Record ==
/// Access count and recency for a tracked key.
///
/// The key itself is the map key of the segment holding the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrequencyRecord {
    /// Number of observed accesses, always >= 1
    pub access_count: u64,
    /// Unix milliseconds of the most recent access
    pub last_access_at: u64,
}

impl FrequencyRecord {
    /// Record for a key seen for the first time at `now`.
    pub fn first_seen(now: u64) -> Self {
        Self {
            access_count: 1,
            last_access_at: now,
        }
    }

    /// Estimated accesses per hour as of `now`.
    ///
    /// Elapsed time is counted in whole hours with a floor of one, so keys
    /// touched within the last hour are compared by raw count.
    pub fn hourly_rate(&self, now: u64) -> f64 {
        let hours = (now.saturating_sub(self.last_access_at) / MS_PER_HOUR).max(1);
        self.access_count as f64 / hours as f64
    }

    /// Registers a new access at `now` and returns the rate it implies.
    ///
    /// The rate uses the incremented count over the time since the previous
    /// access.
    pub fn observe(&mut self, now: u64) -> f64 {
        self.access_count = self.access_count.saturating_add(1);
        let rate = self.hourly_rate(now);
        self.last_access_at = self.last_access_at.max(now);
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen() {
        let record = FrequencyRecord::first_seen(10);
        assert_eq!(record.access_count, 1);
        assert_eq!(record.last_access_at, 10);
    }

    #[test]
    fn test_rate_within_first_hour_is_count() {
        let record = FrequencyRecord {
            access_count: 7,
            last_access_at: 0,
        };
        assert_eq!(record.hourly_rate(MS_PER_HOUR - 1), 7.0);
    }

    #[test]
    fn test_rate_decays_with_idle_hours() {
        let record = FrequencyRecord {
            access_count: 8,
            last_access_at: 0,
        };
        assert_eq!(record.hourly_rate(4 * MS_PER_HOUR), 2.0);
    }

    #[test]
    fn test_observe_uses_previous_access_time() {
        let mut record = FrequencyRecord {
            access_count: 5,
            last_access_at: 0,
        };

        let rate = record.observe(2 * MS_PER_HOUR);

        assert_eq!(rate, 3.0);
        assert_eq!(record.access_count, 6);
        assert_eq!(record.last_access_at, 2 * MS_PER_HOUR);
    }
}
