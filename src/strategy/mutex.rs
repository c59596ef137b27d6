use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;
use tracing::instrument;

use crate::client::CacheClient;
use crate::client::Lookup;
use crate::error::CacheError;
use crate::error::Result;
use crate::loader::Loader;
use crate::store::KvStore;
use crate::strategy::CacheStrategy;
use crate::types::CacheId;
use crate::types::CacheValue;
use crate::types::Keyspace;

/// Cache-aside where a miss is rebuilt by exactly one caller.
///
/// The caller that wins the key's lock loads the record and caches it; everybody else sleeps for the configured
/// backoff and reads again until the record (or its null sentinel) shows up. A holder that never releases the lock
/// stalls the waiters for at most the lock TTL.
pub struct MutexRebuild<S>
where
    S: KvStore,
{
    client:   Arc<CacheClient<S>>,
    keyspace: Keyspace,
}

impl<S> MutexRebuild<S>
where
    S: KvStore,
{
    pub fn new(client: Arc<CacheClient<S>>, keyspace: Keyspace) -> Self {
        Self { client, keyspace }
    }

    async fn rebuild<K, V, L>(&self, key: &str, id: &K, loader: &L, ttl: Duration) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V>,
    {
        // The previous holder may have filled the key between our miss and the lock acquisition.
        match self.client.lookup(key).await? {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Null => Ok(None),
            Lookup::Miss => self.client.load_and_set(key, id, loader, ttl).await,
        }
    }
}

#[async_trait]
impl<S> CacheStrategy for MutexRebuild<S>
where
    S: KvStore,
{
    #[instrument(level = "debug", skip_all, fields(key = %self.keyspace.data_key(id)))]
    async fn fetch<K, V, L>(&self, id: &K, loader: &L, ttl: Duration) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V> + Clone + 'static,
    {
        let key = self.keyspace.data_key(id);
        let lock_key = self.keyspace.lock_key(id);
        let lock = self.client.lock();
        let config = self.client.config();
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            match self.client.lookup(&key).await? {
                Lookup::Hit(value) => return Ok(Some(value)),
                Lookup::Null => return Ok(None),
                Lookup::Miss => (),
            }

            if let Some(guard) = lock.try_acquire(&lock_key).await? {
                debug!(attempts, "rebuilding under lock");
                let outcome = self.rebuild(&key, id, loader, ttl).await;
                guard.release_quietly().await;
                return outcome;
            }

            let waited = started.elapsed();
            if waited >= config.max_lock_wait() {
                return Err(CacheError::LockWaitTimeout { key: lock_key, waited });
            }

            attempts += 1;
            tokio::time::sleep(config.retry_backoff()).await;
        }
    }

    async fn invalidate<K>(&self, id: &K) -> Result<()>
    where
        K: CacheId,
    {
        self.client.invalidate(&self.keyspace.data_key(id)).await
    }

    fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }
}
