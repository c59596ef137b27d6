use std::sync::Arc;
use std::time::Duration;

use fieldx::fxstruct;
use rand::Rng;
use serde::Serialize;
use tracing::debug;
use tracing::instrument;

use crate::codec::CacheRecord;
use crate::codec::Envelope;
use crate::codec::NULL_SENTINEL;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::error::Result;
use crate::loader::Loader;
use crate::lock::DistributedLock;
use crate::scheduler::RebuildScheduler;
use crate::store::KvStore;
use crate::strategy::CacheStrategy;
use crate::strategy::LogicalExpiry;
use crate::strategy::MutexRebuild;
use crate::strategy::PassThrough;
use crate::types::CacheId;
use crate::types::CacheValue;
use crate::types::Keyspace;

/// Decoded content of a plain data key.
#[derive(Debug)]
pub(crate) enum Lookup<V> {
    Miss,
    Null,
    Hit(V),
}

/// Entry point of the cache layer: owns the store handle, the configuration and the rebuild scheduler, and hands out
/// strategies.
///
/// ```ignore
/// let store = Arc::new(MemoryStore::builder().build()?);
/// let client = Arc::new(CacheClient::new(store, CacheConfig::standard()?)?);
///
/// let shops = client.mutex(Keyspace::shop());
/// let shop: Option<Shop> = shops.fetch(&id, &loader, CACHE_SHOP_TTL).await?;
///
/// // On the write path, after the database update has been committed:
/// shops.invalidate(&id).await?;
/// ```
#[fxstruct(sync, no_new, default(off), builder)]
pub struct CacheClient<S>
where
    S: KvStore,
{
    #[fieldx(get(clone), builder(required, into))]
    store: Arc<S>,

    #[fieldx(get, builder(required))]
    config: CacheConfig,

    /// The pool running logical-expiry rebuilds. Pass the same scheduler to several clients to bound the combined
    /// rebuild load on the backing store.
    #[fieldx(get(clone), builder(into), default(Arc::new(RebuildScheduler::default())))]
    scheduler: Arc<RebuildScheduler>,
}

impl<S> CacheClient<S>
where
    S: KvStore,
{
    pub fn new(store: Arc<S>, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Self::builder()
            .store(store)
            .config(config)
            .build()
            .map_err(|e| CacheError::Config(e.to_string()))
    }

    pub fn pass_through(self: &Arc<Self>, keyspace: Keyspace) -> PassThrough<S> {
        PassThrough::new(Arc::clone(self), keyspace)
    }

    pub fn mutex(self: &Arc<Self>, keyspace: Keyspace) -> MutexRebuild<S> {
        MutexRebuild::new(Arc::clone(self), keyspace)
    }

    pub fn logical_expiry(self: &Arc<Self>, keyspace: Keyspace) -> LogicalExpiry<S> {
        LogicalExpiry::new(Arc::clone(self), keyspace)
    }

    pub fn lock(&self) -> DistributedLock<S> {
        DistributedLock::new(self.store(), self.config().lock_ttl())
    }

    /// Cache `value` under `key` as a plain record. The physical TTL is `ttl` plus the configured jitter.
    pub async fn set<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let bytes = self.config().wire_format().encode(value)?;
        self.store.set_with_ttl(key, &bytes, self.jittered(ttl)).await
    }

    /// Warm `key` with a logical-expiry envelope. The record never expires physically; readers consider it stale
    /// once `ttl` has passed.
    pub async fn set_with_logical_expire<V>(&self, key: &str, value: V, ttl: Duration) -> Result<()>
    where
        V: Serialize,
    {
        let bytes = self.config().wire_format().encode(&Envelope::new(value, ttl))?;
        self.store.set(key, &bytes).await
    }

    /// Cache `value` under `key` with no expiry at all. For small, rarely changing datasets that are dropped by
    /// explicit invalidation only.
    pub async fn set_persistent<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let bytes = self.config().wire_format().encode(value)?;
        self.store.set(key, &bytes).await
    }

    /// Remember that the backing store has no record for `key`.
    pub async fn set_null(&self, key: &str) -> Result<()> {
        self.store
            .set_with_ttl(key, NULL_SENTINEL, self.config().null_ttl())
            .await
    }

    /// Drop `key` from the cache. Meant to be called right after the backing store was updated. A failed delete is
    /// reported but not retried: the stale record lives until its TTL or logical expiry.
    #[instrument(level = "debug", skip(self))]
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }

    pub async fn read(&self, key: &str) -> Result<CacheRecord> {
        Ok(CacheRecord::from_raw(self.store.get(key).await?))
    }

    pub fn decode<V: CacheValue>(&self, key: &str, bytes: &[u8]) -> Result<V> {
        self.config().wire_format().decode(key, bytes)
    }

    pub(crate) async fn lookup<V: CacheValue>(&self, key: &str) -> Result<Lookup<V>> {
        Ok(match self.read(key).await? {
            CacheRecord::Miss => Lookup::Miss,
            CacheRecord::Null => Lookup::Null,
            CacheRecord::Present(bytes) => Lookup::Hit(self.decode(key, &bytes)?),
        })
    }

    /// Call the loader and cache whatever it returns: the value as a plain record, or a null sentinel for a missing
    /// record.
    pub(crate) async fn load_and_set<K, V, L>(&self, key: &str, id: &K, loader: &L, ttl: Duration) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V>,
    {
        match loader.load(id.clone()).await.map_err(|e| CacheError::load(key, e))? {
            Some(value) => {
                self.set(key, &value, ttl).await?;
                Ok(Some(value))
            }
            None => {
                debug!(key, "no such record, caching null sentinel");
                self.set_null(key).await?;
                Ok(None)
            }
        }
    }

    /// Reload a logical-expiry record and write a fresh envelope.
    pub(crate) async fn load_and_set_logical<K, V, L>(&self, key: &str, id: K, loader: &L, ttl: Duration) -> Result<()>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V>,
    {
        match loader.load(id).await.map_err(|e| CacheError::load(key, e))? {
            Some(value) => self.set_with_logical_expire(key, value, ttl).await,
            None => {
                debug!(key, "record is gone from the backing store, caching null sentinel");
                self.set_null(key).await
            }
        }
    }

    fn jittered(&self, ttl: Duration) -> Duration {
        let jitter = self.config().ttl_jitter();
        if jitter.is_zero() {
            return ttl;
        }
        let max_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=max_ms);
        ttl.saturating_add(Duration::from_millis(extra))
    }

    /// Read `key_prefix + id` through a [`PassThrough`] strategy.
    pub async fn query_with_pass_through<K, V, L>(
        self: &Arc<Self>,
        key_prefix: &str,
        id: &K,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V> + Clone + 'static,
    {
        self.pass_through(Keyspace::new(key_prefix, ""))
            .fetch(id, loader, ttl)
            .await
    }

    /// Read `key_prefix + id` through a [`MutexRebuild`] strategy locking `lock_prefix + id`.
    pub async fn query_with_mutex<K, V, L>(
        self: &Arc<Self>,
        key_prefix: &str,
        lock_prefix: &str,
        id: &K,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V> + Clone + 'static,
    {
        self.mutex(Keyspace::new(key_prefix, lock_prefix))
            .fetch(id, loader, ttl)
            .await
    }

    /// Read `key_prefix + id` through a [`LogicalExpiry`] strategy locking `lock_prefix + id`.
    pub async fn query_with_logical_expire<K, V, L>(
        self: &Arc<Self>,
        key_prefix: &str,
        lock_prefix: &str,
        id: &K,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V> + Clone + 'static,
    {
        self.logical_expiry(Keyspace::new(key_prefix, lock_prefix))
            .fetch(id, loader, ttl)
            .await
    }

    /// Let pending rebuilds finish and stop the scheduler. A scheduler shared with other clients is stopped for them
    /// too.
    pub async fn close(&self) {
        self.scheduler().close().await;
    }
}
