//! Rainbow Cache - declarative operation-level caching
//!
//! Provides a TTL store bounded by a frequency-aware admission policy,
//! cache-aside and write-through orchestration over a local or remote
//! backend, and lease-renewing distributed locks.

pub mod admission;
pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod lock;
pub mod models;
pub mod orchestrator;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use context::CacheContext;
pub use error::{CacheError, Result};
pub use lock::{DistributedLock, LockGuard, LockWait};
pub use orchestrator::{CacheDirective, CacheOrchestrator};
pub use tasks::spawn_sweep_task;
