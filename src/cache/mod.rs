//! Cache Module
//!
//! Provides the in-process expiring key-value store.

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, duration_ms, CacheEntry};
pub use stats::{CacheStats, StatCounters};
pub use store::CacheStore;
