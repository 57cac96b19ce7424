//! In-process lock manager for tests/dev and single-process deployments.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{LockError, LockHandle, LockKey, LockManager};

#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Mutex-guarded lease table.
///
/// Expired leases are not swept eagerly; they are replaced by the next
/// acquisition of the same key.
#[derive(Debug, Default)]
pub struct InMemoryLockManager {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held by a live lease.
    pub fn held_count(&self) -> usize {
        let now = Utc::now();
        self.leases
            .lock()
            .map(|m| m.values().filter(|l| l.expires_at > now).count())
            .unwrap_or(0)
    }

    fn acquire_at(
        &self,
        key: &LockKey,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<LockHandle>, LockError> {
        let mut leases = self.leases.lock().map_err(|_| LockError::Poisoned)?;
        let flat = key.as_string();

        if let Some(existing) = leases.get(&flat) {
            if existing.expires_at > now {
                return Ok(None);
            }
        }

        let handle = LockHandle {
            key: key.clone(),
            token: uuid::Uuid::now_v7().to_string(),
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        };
        leases.insert(
            flat,
            Lease {
                token: handle.token.clone(),
                expires_at: handle.expires_at,
            },
        );
        Ok(Some(handle))
    }
}

impl LockManager for InMemoryLockManager {
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<LockHandle>, LockError> {
        self.acquire_at(key, ttl, Utc::now())
    }

    fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let mut leases = self.leases.lock().map_err(|_| LockError::Poisoned)?;
        let flat = handle.key.as_string();
        if leases.get(&flat).is_some_and(|l| l.token == handle.token) {
            leases.remove(&flat);
        }
        Ok(())
    }

    fn is_held(&self, handle: &LockHandle) -> Result<bool, LockError> {
        let leases = self.leases.lock().map_err(|_| LockError::Poisoned)?;
        let now = Utc::now();
        Ok(leases
            .get(&handle.key.as_string())
            .is_some_and(|l| l.token == handle.token && l.expires_at > now))
    }

    fn claim(&self, handle: &LockHandle, ttl: Duration) -> Result<Option<LockHandle>, LockError> {
        let mut leases = self.leases.lock().map_err(|_| LockError::Poisoned)?;
        let now = Utc::now();
        let Some(lease) = leases.get_mut(&handle.key.as_string()) else {
            return Ok(None);
        };
        if lease.token != handle.token || lease.expires_at <= now {
            return Ok(None);
        }

        let claimed = LockHandle::new(handle.key.clone(), ttl);
        lease.token = claimed.token.clone();
        lease.expires_at = claimed.expires_at;
        Ok(Some(claimed))
    }
}
