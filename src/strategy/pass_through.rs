use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tracing::instrument;

use crate::client::CacheClient;
use crate::client::Lookup;
use crate::error::Result;
use crate::loader::Loader;
use crate::store::KvStore;
use crate::strategy::CacheStrategy;
use crate::types::CacheId;
use crate::types::CacheValue;
use crate::types::Keyspace;

/// Plain cache-aside with null caching.
///
/// A miss loads from the backing store and caches the outcome, including "no such record", so a missing id reaches
/// the store at most once per null TTL. Concurrent misses on the same key are not coordinated; every one of them calls
/// the loader.
pub struct PassThrough<S>
where
    S: KvStore,
{
    client:   Arc<CacheClient<S>>,
    keyspace: Keyspace,
}

impl<S> PassThrough<S>
where
    S: KvStore,
{
    pub fn new(client: Arc<CacheClient<S>>, keyspace: Keyspace) -> Self {
        Self { client, keyspace }
    }
}

#[async_trait]
impl<S> CacheStrategy for PassThrough<S>
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
        match self.client.lookup(&key).await? {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Null => Ok(None),
            Lookup::Miss => {
                debug!("cache miss");
                self.client.load_and_set(&key, id, loader, ttl).await
            }
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
