//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// Lazy expiry on access already hides expired values; the sweep only
/// reclaims memory held by keys nobody reads again.
///
/// # Arguments
/// * `store` - Shared store to sweep
/// * `interval_secs` - Seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::new());
/// let sweep_handle = spawn_sweep_task(store.clone(), 10);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(store: Arc<CacheStore>, interval_secs: u64) -> JoinHandle<()> {
    spawn_sweep_every(store, Duration::from_secs(interval_secs))
}

fn spawn_sweep_every(store: Arc<CacheStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?period, "Starting TTL sweep task");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the immediate first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match store.sweep_expired() {
                Some(0) => debug!("TTL sweep: no expired entries found"),
                Some(removed) => info!("TTL sweep: removed {} expired entries", removed),
                None => debug!("TTL sweep: previous run still in progress"),
            }
        }
    })
}
