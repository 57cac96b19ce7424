//! Named, time-bounded exclusive locks.
//!
//! A lock is keyed by `(namespace, document kind, document id)` and owned by a
//! random token. Acquisition never blocks: a held key yields `Ok(None)`
//! immediately. Every lock carries a lease so a crashed holder cannot starve
//! the key forever; release is token-checked and idempotent.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_lock;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use docforge_core::DocumentId;
use docforge_documents::DocumentKind;

pub use in_memory::InMemoryLockManager;
#[cfg(feature = "redis")]
pub use redis_lock::RedisLockManager;

/// Key of a PDF generation lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub namespace: String,
    pub kind: DocumentKind,
    pub document_id: DocumentId,
}

impl LockKey {
    pub fn new(namespace: impl Into<String>, kind: DocumentKind, document_id: DocumentId) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            document_id,
        }
    }

    /// Flat string form shared by every backend, e.g. `docforge:pdf:invoice:<uuid>`.
    pub fn as_string(&self) -> String {
        format!("{}:pdf:{}:{}", self.namespace, self.kind, self.document_id)
    }
}

impl core::fmt::Display for LockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Proof of ownership of a lock, valid until `expires_at`.
///
/// Serializable so it can travel inside a job message to another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHandle {
    pub key: LockKey,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl LockHandle {
    pub fn new(key: LockKey, ttl: Duration) -> Self {
        Self {
            key,
            token: Uuid::now_v7().to_string(),
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Lock backend failure (distinct from the key simply being held).
#[derive(Debug, Clone, thiserror::Error)]
pub enum LockError {
    #[error("lock backend unavailable: {0}")]
    Backend(String),
    #[error("lock state poisoned")]
    Poisoned,
}

/// Lock manager abstraction.
///
/// Implementations must be safe under arbitrary concurrent callers; the
/// distributed ones must also be safe across process boundaries.
pub trait LockManager: Send + Sync {
    /// Try to take `key` for `ttl`. Returns `Ok(None)` if another owner holds it.
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<LockHandle>, LockError>;

    /// Release the lock if (and only if) `handle` still owns it.
    ///
    /// Releasing an expired, already released, or re-acquired key is a no-op.
    fn release(&self, handle: &LockHandle) -> Result<(), LockError>;

    /// Whether `handle` is still the live owner of its key.
    fn is_held(&self, handle: &LockHandle) -> Result<bool, LockError>;

    /// Atomically exchange a live `handle` for a fresh token and lease.
    ///
    /// Exactly one caller presenting the same handle gets `Some`; every copy
    /// of the old handle stops being the owner. `None` if the handle is no
    /// longer live.
    fn claim(&self, handle: &LockHandle, ttl: Duration) -> Result<Option<LockHandle>, LockError>;
}

impl<L> LockManager for Arc<L>
where
    L: LockManager + ?Sized,
{
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<LockHandle>, LockError> {
        (**self).try_acquire(key, ttl)
    }

    fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        (**self).release(handle)
    }

    fn is_held(&self, handle: &LockHandle) -> Result<bool, LockError> {
        (**self).is_held(handle)
    }

    fn claim(&self, handle: &LockHandle, ttl: Duration) -> Result<Option<LockHandle>, LockError> {
        (**self).claim(handle, ttl)
    }
}

/// Scoped ownership of a lock: released when the guard is dropped, including
/// during unwinding.
pub struct LockGuard<'a, L: LockManager + ?Sized> {
    manager: &'a L,
    handle: Option<LockHandle>,
}

impl<'a, L: LockManager + ?Sized> LockGuard<'a, L> {
    pub fn new(manager: &'a L, handle: LockHandle) -> Self {
        Self {
            manager,
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<&LockHandle> {
        self.handle.as_ref()
    }

    /// Whether the guarded lease is still the live owner of its key.
    pub fn is_live(&self) -> Result<bool, LockError> {
        match &self.handle {
            Some(handle) => self.manager.is_held(handle),
            None => Ok(false),
        }
    }

    /// Release now and surface backend errors to the caller.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.handle.take() {
            Some(handle) => self.manager.release(&handle),
            None => Ok(()),
        }
    }
}

impl<L: LockManager + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            match self.manager.release(&handle) {
                Ok(()) => debug!(lock_key = %handle.key, "lock released"),
                // The lease still expires on its own.
                Err(e) => warn!(lock_key = %handle.key, error = %e, "failed to release lock"),
            }
        }
    }
}
