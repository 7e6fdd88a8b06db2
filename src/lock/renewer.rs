//! Lease renewal ("watchdog") tasks
//!
//! A renewer keeps re-asserting a held lock's lease until its guard is
//! released or dropped, then deletes the lock key.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::backend::{BackendResult, RemoteBackend};
use crate::error::{CacheError, Result};

// == Renewer Pool ==
/// Bounds how many renewers may run at once.
///
/// A full pool rejects new renewers instead of queueing them.
#[derive(Debug, Clone)]
pub struct RenewerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl RenewerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Starts `renewer` on the runtime, or fails with `RenewerSaturated`.
    pub(crate) fn spawn(
        &self,
        renewer: LeaseRenewer,
        cancel: oneshot::Receiver<()>,
    ) -> Result<JoinHandle<Result<()>>> {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| CacheError::RenewerSaturated(renewer.key.clone()))?;

        Ok(tokio::spawn(async move {
            let _permit = permit;
            renewer.run(cancel).await
        }))
    }

    /// Renewers currently running.
    pub fn active(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// == Lease Renewer ==
/// Background task extending one lock's lease.
pub(crate) struct LeaseRenewer {
    pub(crate) backend: Arc<dyn RemoteBackend>,
    pub(crate) key: String,
    pub(crate) token: String,
    pub(crate) lease: Duration,
    pub(crate) interval: Duration,
}

impl LeaseRenewer {
    /// Renews until `cancel` fires (sent or dropped), then deletes the key.
    ///
    /// A backend failure stops renewal but the key is only deleted once the
    /// guard lets go; the failure is returned after that final delete.
    async fn run(self, mut cancel: oneshot::Receiver<()>) -> Result<()> {
        let renewal = self.renew_until_cancelled(&mut cancel).await;
        if renewal.is_err() {
            let _ = (&mut cancel).await;
        }

        let cleanup = self
            .backend
            .delete(std::slice::from_ref(&self.key))
            .await
            .map(|_| debug!(key = %self.key, "lock released"))
            .map_err(|err| CacheError::lock_backend(&self.key, err));

        renewal.and(cleanup)
    }

    async fn renew_until_cancelled(&self, cancel: &mut oneshot::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut *cancel => return Ok(()),
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        warn!(key = %self.key, error = %err, "lease renewal failed, no longer renewing");
                        return Err(CacheError::lock_backend(&self.key, err));
                    }
                }
            }
        }
    }

    /// Re-asserts the lease once.
    ///
    /// Re-acquires a lapsed key, extends it while it still carries our
    /// token, and leaves it alone if another owner holds it.
    async fn refresh(&self) -> BackendResult<()> {
        if self
            .backend
            .set_nx(&self.key, &self.token, self.lease)
            .await?
        {
            debug!(key = %self.key, "lease had lapsed, re-acquired");
            return Ok(());
        }

        match self.backend.get(&self.key).await? {
            Some(owner) if owner == self.token => {
                self.backend
                    .set(&self.key, &self.token, Some(self.lease))
                    .await
            }
            Some(_) => {
                warn!(key = %self.key, "lock key owned by another holder, lease not extended");
                Ok(())
            }
            // Expired between the two calls, the next tick re-acquires it
            None => Ok(()),
        }
    }
}
