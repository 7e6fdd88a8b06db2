//! Distributed lock over a remote backend

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::RemoteBackend;
use crate::error::{BackendError, CacheError, Result};
use crate::lock::renewer::{LeaseRenewer, RenewerPool};

/// Namespace for locks taken through [`DistributedLock::with_lock`].
pub const LOCK_KEY_PREFIX: &str = "rainbowDistributedLock:";

// == Lock Settings ==
/// How long to wait for a held lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    Bounded(Duration),
    Unbounded,
}

impl LockWait {
    /// Negative values mean wait forever.
    pub fn from_millis(millis: i64) -> Self {
        if millis < 0 {
            LockWait::Unbounded
        } else {
            LockWait::Bounded(Duration::from_millis(millis as u64))
        }
    }
}

/// Timing knobs for lock acquisition and renewal.
#[derive(Debug, Clone)]
pub struct LockSettings {
    /// TTL written with the lock key
    pub lease: Duration,
    /// Time between lease renewals
    pub renew_interval: Duration,
    /// Sleep between acquisition attempts
    pub retry_backoff: Duration,
    /// Wait budget used by `with_lock`
    pub wait: LockWait,
    /// Maximum concurrently running renewers
    pub renewer_pool_size: usize,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(5),
            renew_interval: Duration::from_secs(1),
            retry_backoff: Duration::from_millis(10),
            wait: LockWait::Bounded(Duration::from_millis(30_000)),
            renewer_pool_size: 1024,
        }
    }
}

// == Distributed Lock ==
/// Cross-process mutual exclusion with automatic lease renewal.
pub struct DistributedLock {
    backend: Arc<dyn RemoteBackend>,
    renewers: RenewerPool,
    settings: LockSettings,
}

impl DistributedLock {
    pub fn new(backend: Arc<dyn RemoteBackend>, settings: LockSettings) -> Self {
        Self {
            backend,
            renewers: RenewerPool::new(settings.renewer_pool_size),
            settings,
        }
    }

    /// Acquires `lock_key`, retrying until `wait` runs out.
    ///
    /// # Arguments
    /// * `lock_key` - Backend key representing the lock
    /// * `wait` - How long to keep retrying while another owner holds it
    ///
    /// # Returns
    /// A guard whose renewer keeps the lease alive until it is released or
    /// dropped.
    pub async fn acquire(&self, lock_key: &str, wait: LockWait) -> Result<LockGuard> {
        if lock_key.is_empty() {
            return Err(CacheError::InvalidKey("lock key must not be empty".to_string()));
        }

        let token = Uuid::new_v4().to_string();
        let started = Instant::now();

        loop {
            let acquired = self
                .backend
                .set_nx(lock_key, &token, self.settings.lease)
                .await
                .map_err(|err| CacheError::lock_backend(lock_key, err))?;
            if acquired {
                break;
            }

            let waited = started.elapsed();
            if let LockWait::Bounded(limit) = wait {
                if waited > limit {
                    debug!(key = lock_key, ?waited, "gave up waiting for lock");
                    return Err(CacheError::LockTimeout {
                        key: lock_key.to_string(),
                        waited,
                    });
                }
            }
            tokio::time::sleep(self.settings.retry_backoff).await;
        }

        let (cancel, cancelled) = oneshot::channel();
        let renewer = LeaseRenewer {
            backend: Arc::clone(&self.backend),
            key: lock_key.to_string(),
            token: token.clone(),
            lease: self.settings.lease,
            interval: self.settings.renew_interval,
        };
        let handle = self.renewers.spawn(renewer, cancelled).map_err(|err| {
            warn!(key = lock_key, "lock acquired but no renewer available");
            err
        })?;

        info!(key = lock_key, waited = ?started.elapsed(), "lock acquired");
        Ok(LockGuard {
            key: lock_key.to_string(),
            token,
            cancel: Some(cancel),
            renewer: Some(handle),
        })
    }

    /// Deletes `lock_key` without checking who holds it.
    pub async fn release(&self, lock_key: &str) -> Result<()> {
        self.backend
            .delete(&[lock_key.to_string()])
            .await
            .map_err(|err| CacheError::lock_backend(lock_key, err))?;
        debug!(key = lock_key, "lock key deleted");
        Ok(())
    }

    /// Runs `work` while holding the lock named `name`.
    ///
    /// The lock key is `name` under [`LOCK_KEY_PREFIX`] and the wait budget
    /// comes from the settings.
    pub async fn with_lock<F, Fut, T>(&self, name: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self
            .acquire(&lock_key_for(name), self.settings.wait)
            .await?;
        let output = work().await;
        guard.release().await?;
        Ok(output)
    }

    /// Renewers currently keeping leases alive.
    pub fn active_renewers(&self) -> usize {
        self.renewers.active()
    }

    /// Most renewers that may run at once.
    pub fn renewer_capacity(&self) -> usize {
        self.renewers.capacity()
    }
}

/// Backend key for the lock named `name`.
pub fn lock_key_for(name: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{name}")
}

// == Lock Guard ==
/// Proof of lock ownership.
///
/// Dropping the guard stops renewal and deletes the key in the background;
/// [`LockGuard::release`] does the same and waits for it.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    token: String,
    cancel: Option<oneshot::Sender<()>>,
    renewer: Option<JoinHandle<Result<()>>>,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Owner token written as the lock value.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Stops renewal and waits for the lock key to be deleted.
    ///
    /// Returns the first renewal or delete failure.
    pub async fn release(mut self) -> Result<()> {
        self.signal();
        match self.renewer.take() {
            Some(handle) => handle.await.unwrap_or_else(|join_err| {
                Err(CacheError::lock_backend(
                    &self.key,
                    BackendError::Indeterminate(format!("renewer task failed: {join_err}")),
                ))
            }),
            None => Ok(()),
        }
    }

    fn signal(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The renewer may already have exited
            let _ = cancel.send(());
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.signal();
    }
}
