use std::process;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::debug;
use tracing::warn;

use crate::error::Result;
use crate::store::KvStore;

static TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

// The random part keeps tokens of processes on different hosts apart, even when their pids match.
fn next_token() -> String {
    format!(
        "{}-{:016x}-{}",
        process::id(),
        rand::rng().random::<u64>(),
        TOKEN_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Per-key mutual exclusion over the store's conditional set.
///
/// At most one token exists per lock key at any time. The token's TTL releases the lock on its own if the holder dies
/// before calling [`LockGuard::release`].
#[derive(Debug)]
pub struct DistributedLock<S> {
    store: Arc<S>,
    ttl:   Duration,
}

impl<S> Clone for DistributedLock<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl:   self.ttl,
        }
    }
}

impl<S> DistributedLock<S>
where
    S: KvStore,
{
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Single non-blocking attempt. `Ok(None)` means somebody else holds the lock.
    pub async fn try_acquire(&self, lock_key: &str) -> Result<Option<LockGuard<S>>> {
        let token = next_token();
        if self.store.set_if_absent(lock_key, token.as_bytes(), self.ttl).await? {
            debug!(lock_key, token = %token, "lock acquired");
            Ok(Some(LockGuard {
                store: Arc::clone(&self.store),
                key: lock_key.to_string(),
                token,
            }))
        }
        else {
            debug!(lock_key, "lock is busy");
            Ok(None)
        }
    }

    /// Release a lock by its token when the guard itself is no longer at hand. Same owner check as
    /// [`LockGuard::release`].
    pub async fn release_token(&self, lock_key: &str, token: &str) -> Result<bool> {
        self.store.delete_if_equals(lock_key, token.as_bytes()).await
    }
}

/// Proof of holding a lock. Must be released explicitly since releasing is a store round-trip; a guard that is just
/// dropped keeps the key locked until the token's TTL runs out.
#[must_use = "a lock guard must be released"]
#[derive(Debug)]
pub struct LockGuard<S: KvStore> {
    store: Arc<S>,
    key:   String,
    token: String,
}

impl<S> LockGuard<S>
where
    S: KvStore,
{
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns `false` if the token was already gone, i.e. the lock had expired and might be held by someone else
    /// now. Such a lock is left alone.
    pub async fn release(self) -> Result<bool> {
        let released = self.store.delete_if_equals(&self.key, self.token.as_bytes()).await?;
        if released {
            debug!(lock_key = %self.key, "lock released");
        }
        else {
            warn!(lock_key = %self.key, token = %self.token, "lock expired before release");
        }
        Ok(released)
    }

    /// Release and log a failure instead of returning it. Used where the outcome of the guarded work must not be
    /// replaced by a release error; the token TTL takes care of a lock that could not be deleted.
    pub async fn release_quietly(self) {
        let key = self.key.clone();
        if let Err(err) = self.release().await {
            warn!(lock_key = %key, error = %err, "failed to release lock, leaving it to its TTL");
        }
    }
}
