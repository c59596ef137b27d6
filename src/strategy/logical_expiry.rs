use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tracing::error;
use tracing::instrument;
use tracing::warn;

use crate::client::CacheClient;
use crate::codec::CacheRecord;
use crate::codec::Envelope;
use crate::error::Result;
use crate::loader::Loader;
use crate::store::KvStore;
use crate::strategy::CacheStrategy;
use crate::types::CacheId;
use crate::types::CacheValue;
use crate::types::Keyspace;

/// Stale-while-revalidate over pre-warmed keys.
///
/// Records are stored as [`Envelope`]s without a physical TTL (see
/// [`CacheClient::set_with_logical_expire`]). A fresh envelope is returned as is. An outdated one is returned as well,
/// but the first reader to notice the expiry also queues a reload on the client's
/// [`RebuildScheduler`](crate::RebuildScheduler). Readers never wait for a reload.
///
/// A key that was never warmed reads as absent; the backing store is not consulted.
pub struct LogicalExpiry<S>
where
    S: KvStore,
{
    client:   Arc<CacheClient<S>>,
    keyspace: Keyspace,
}

impl<S> LogicalExpiry<S>
where
    S: KvStore,
{
    pub fn new(client: Arc<CacheClient<S>>, keyspace: Keyspace) -> Self {
        Self { client, keyspace }
    }

    async fn read_envelope<V: CacheValue>(&self, key: &str) -> Result<Option<Envelope<V>>> {
        Ok(match self.client.read(key).await? {
            CacheRecord::Present(bytes) => Some(self.client.decode(key, &bytes)?),
            CacheRecord::Miss | CacheRecord::Null => None,
        })
    }

    /// Warm `id` with `value`, logically valid for `ttl`.
    pub async fn warm<K, V>(&self, id: &K, value: V, ttl: Duration) -> Result<()>
    where
        K: CacheId,
        V: CacheValue,
    {
        self.client
            .set_with_logical_expire(&self.keyspace.data_key(id), value, ttl)
            .await
    }
}

#[async_trait]
impl<S> CacheStrategy for LogicalExpiry<S>
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
        let Some(envelope) = self.read_envelope::<V>(&key).await?
        else {
            debug!("key is not warmed");
            return Ok(None);
        };

        if envelope.is_fresh() {
            return Ok(Some(envelope.data));
        }

        let scheduler = self.client.scheduler();
        if scheduler.is_closed() {
            return Ok(Some(envelope.data));
        }

        let lock_key = self.keyspace.lock_key(id);
        let Some(guard) = self.client.lock().try_acquire(&lock_key).await?
        else {
            debug!("rebuild already in progress, serving stale value");
            return Ok(Some(envelope.data));
        };

        // Another reader could have completed a rebuild between our read and the lock acquisition.
        match self.read_envelope::<V>(&key).await {
            Ok(Some(current)) if current.is_fresh() => {
                guard.release_quietly().await;
                return Ok(Some(current.data));
            }
            Ok(_) => (),
            Err(err) => {
                guard.release_quietly().await;
                return Err(err);
            }
        }

        let token = guard.token().to_string();
        let client = Arc::clone(&self.client);
        let loader = loader.clone();
        let id = id.clone();
        let rebuild_key = key.clone();
        let submitted = scheduler.submit(async move {
            match client.load_and_set_logical::<K, V, L>(&rebuild_key, id, &loader, ttl).await {
                Ok(()) => debug!(key = %rebuild_key, "logical-expiry record rebuilt"),
                Err(err) => error!(key = %rebuild_key, error = %err, "rebuild failed, stale value stays"),
            }
            guard.release_quietly().await;
        });

        if let Err(err) = submitted {
            // The guard went down with the rejected task.
            warn!(key = %key, error = %err, "could not queue rebuild");
            if let Err(err) = self.client.lock().release_token(&lock_key, &token).await {
                warn!(lock_key = %lock_key, error = %err, "failed to release lock, leaving it to its TTL");
            }
        }

        Ok(Some(envelope.data))
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
