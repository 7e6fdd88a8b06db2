//! Process-wide caching state
//!
//! Built once at startup and shared through an `Arc`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::admission::SharedAdmissionPolicy;
use crate::backend::{MemoryBackend, RemoteBackend};
use crate::cache::CacheStore;
use crate::config::{BackendType, Config};
use crate::error::Result;
use crate::lock::DistributedLock;
use crate::orchestrator::CacheOrchestrator;
use crate::tasks::spawn_sweep_task;

/// Everything the caching layer needs, owned in one place.
///
/// Owns the sweep task: it is started on construction and aborted on
/// [`CacheContext::shutdown`] or drop. Construction must happen inside a
/// tokio runtime.
pub struct CacheContext {
    config: Config,
    store: Arc<CacheStore>,
    admission: Arc<SharedAdmissionPolicy>,
    orchestrator: CacheOrchestrator,
    lock: Arc<DistributedLock>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl CacheContext {
    /// Builds the context, connecting to the remote backend when configured.
    ///
    /// An unreachable remote backend is not fatal: caching falls back to the
    /// local store with a warning.
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let remote = match config.backend_type {
            BackendType::Remote => connect_remote(&config).await,
            BackendType::Local => None,
        };
        Self::assemble(config, remote)
    }

    /// Builds the context around an already connected remote backend.
    ///
    /// The backend serves locks in every mode and caching when
    /// `backend_type` is `Remote`.
    pub fn with_remote(config: Config, remote: Arc<dyn RemoteBackend>) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, Some(remote))
    }

    fn assemble(config: Config, remote: Option<Arc<dyn RemoteBackend>>) -> Result<Self> {
        let store = Arc::new(CacheStore::new());
        let admission = Arc::new(SharedAdmissionPolicy::new(config.capacity)?);

        let orchestrator = match (config.backend_type, &remote) {
            (BackendType::Remote, Some(remote)) => CacheOrchestrator::remote(Arc::clone(remote)),
            (BackendType::Remote, None) => {
                warn!("Remote cache backend unavailable, falling back to local store");
                CacheOrchestrator::local(Arc::clone(&store), Arc::clone(&admission))
            }
            (BackendType::Local, _) => {
                CacheOrchestrator::local(Arc::clone(&store), Arc::clone(&admission))
            }
        };

        let lock_backend = remote.unwrap_or_else(|| {
            info!("No remote backend, distributed locks are process-local");
            let local: Arc<dyn RemoteBackend> = Arc::new(MemoryBackend::new());
            local
        });
        let lock = Arc::new(DistributedLock::new(lock_backend, config.lock_settings()));

        let sweep = spawn_sweep_task(Arc::clone(&store), config.sweep_interval);
        info!(
            backend = orchestrator.backend_kind(),
            capacity = config.capacity,
            "Cache context initialized"
        );

        Ok(Self {
            config,
            store,
            admission,
            orchestrator,
            lock,
            sweep: Mutex::new(Some(sweep)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The local store, whether or not it is the active cache backend.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn admission(&self) -> &Arc<SharedAdmissionPolicy> {
        &self.admission
    }

    pub fn orchestrator(&self) -> &CacheOrchestrator {
        &self.orchestrator
    }

    pub fn lock(&self) -> &Arc<DistributedLock> {
        &self.lock
    }

    /// Stops the sweep task. Safe to call more than once.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweep.lock().take() {
            handle.abort();
            info!("TTL sweep task stopped");
        }
    }
}

impl Drop for CacheContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(feature = "redis")]
async fn connect_remote(config: &Config) -> Option<Arc<dyn RemoteBackend>> {
    let Some(url) = config.redis_url.as_deref() else {
        warn!("CACHE_BACKEND=remote but REDIS_URL is not set");
        return None;
    };
    match crate::backend::RedisBackend::connect(url).await {
        Ok(backend) => Some(Arc::new(backend)),
        Err(err) => {
            warn!(error = %err, "Could not connect to remote backend");
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_remote(_config: &Config) -> Option<Arc<dyn RemoteBackend>> {
    warn!("CACHE_BACKEND=remote but no remote backend support is compiled in");
    None
}
