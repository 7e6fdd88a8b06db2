//! Orchestrator Module
//!
//! Composes the store, admission policy and remote backend into
//! operation-level caching.

mod directive;
mod service;

pub use directive::{ttl_from_seconds, CacheDirective};
pub use service::{CacheBackend, CacheOrchestrator};
