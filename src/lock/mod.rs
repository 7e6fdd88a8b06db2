//! Lock Module
//!
//! Lease-based distributed locking with background lease renewal.

mod distributed;
mod renewer;

pub use distributed::{
    lock_key_for, DistributedLock, LockGuard, LockSettings, LockWait, LOCK_KEY_PREFIX,
};
pub use renewer::RenewerPool;
