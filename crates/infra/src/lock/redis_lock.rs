//! Redis-backed lock manager (optional, `redis` feature).
//!
//! Acquire is a single `SET key token NX PX ttl`; release and ownership checks
//! compare the stored token so one holder can never free another's lease.
//! Safe across processes sharing the same Redis.

use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use super::{LockError, LockHandle, LockKey, LockManager};

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const CLAIM_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    redis.call("SET", KEYS[1], ARGV[2], "PX", ARGV[3])
    return 1
else
    return 0
end
"#;

#[derive(Debug, Clone)]
pub struct RedisLockManager {
    client: redis::Client,
}

impl RedisLockManager {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, LockError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(Self { client })
    }

    fn connection(&self) -> Result<redis::Connection, LockError> {
        self.client
            .get_connection()
            .map_err(|e| LockError::Backend(e.to_string()))
    }
}

impl LockManager for RedisLockManager {
    #[instrument(skip(self), fields(lock_key = %key))]
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<LockHandle>, LockError> {
        let mut conn = self.connection()?;
        let handle = LockHandle::new(key.clone(), ttl);
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let reply: Option<String> = redis::cmd("SET")
            .arg(key.as_string())
            .arg(&handle.token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query(&mut conn)
            .map_err(|e| LockError::Backend(e.to_string()))?;

        Ok(reply.map(|_| handle))
    }

    #[instrument(skip(self, handle), fields(lock_key = %handle.key))]
    fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        if handle.is_expired_at(Utc::now()) {
            // Redis already dropped it, or someone else owns it now.
            return Ok(());
        }
        let mut conn = self.connection()?;
        let _: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(handle.key.as_string())
            .arg(&handle.token)
            .invoke(&mut conn)
            .map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(())
    }

    fn is_held(&self, handle: &LockHandle) -> Result<bool, LockError> {
        let mut conn = self.connection()?;
        let current: Option<String> = redis::cmd("GET")
            .arg(handle.key.as_string())
            .query(&mut conn)
            .map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(current.as_deref() == Some(handle.token.as_str()))
    }

    #[instrument(skip(self, handle), fields(lock_key = %handle.key))]
    fn claim(&self, handle: &LockHandle, ttl: Duration) -> Result<Option<LockHandle>, LockError> {
        let mut conn = self.connection()?;
        let claimed = LockHandle::new(handle.key.clone(), ttl);
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let swapped: i64 = redis::Script::new(CLAIM_SCRIPT)
            .key(handle.key.as_string())
            .arg(&handle.token)
            .arg(&claimed.token)
            .arg(ttl_ms)
            .invoke(&mut conn)
            .map_err(|e| LockError::Backend(e.to_string()))?;

        Ok((swapped == 1).then_some(claimed))
    }
}
