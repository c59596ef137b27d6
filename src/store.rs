use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use fieldx::fxstruct;
use moka::future::Cache;
use moka::ops::compute::CompResult;
use moka::ops::compute::Op;
use moka::Expiry;

use crate::error::Result;

/// The remote key-value store the cache lives in.
///
/// Every method is a single round-trip. There are no transactions spanning multiple keys; an implementation for a
/// real server (Redis, Memcached, ...) maps its transport errors to
/// [`CacheError::StoreUnavailable`](crate::CacheError::StoreUnavailable).
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set `key` only if it doesn't exist. Returns `true` if this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool>;

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Set `key` with no physical expiry.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete `key` only if it currently holds `expected`. Returns `true` if the key was deleted.
    ///
    /// The default implementation is a get followed by a delete and is therefore not atomic. Stores that can do
    /// better (a Lua script in Redis, for example) should override it.
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool> {
        if self.get(key).await?.as_deref() == Some(expected) {
            self.delete(key).await?;
            Ok(true)
        }
        else {
            Ok(false)
        }
    }
}

#[async_trait]
impl<S> KvStore for Arc<S>
where
    S: KvStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        (**self).set_if_absent(key, value, ttl).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        (**self).set_with_ttl(key, value, ttl).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool> {
        (**self).delete_if_equals(key, expected).await
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredValue {
    bytes: Arc<[u8]>,
    ttl:   Option<Duration>,
}

impl StoredValue {
    fn new(bytes: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            bytes: Arc::from(bytes),
            ttl,
        }
    }
}

// Every write carries its own physical TTL, including "none" for records that must never expire at store level.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process [`KvStore`] over a [moka](https://crates.io/crates/moka) cache.
///
/// Good for tests and single-node deployments. Conditional writes go through moka's per-key entry API, so
/// `set_if_absent` is atomic.
#[fxstruct(sync, no_new, builder)]
pub struct MemoryStore {
    /// Store name. Shows up in moka's diagnostics.
    #[fieldx(get(clone), builder(into), default("memory".to_string()))]
    name: String,

    #[fieldx(get(copy), default(1_000_000))]
    max_capacity: u64,

    #[fieldx(private, lazy, get(clone), builder(off))]
    cache: Cache<String, StoredValue>,
}

impl MemoryStore {
    fn build_cache(&self) -> Cache<String, StoredValue> {
        Cache::builder()
            .name(&self.name())
            .max_capacity(self.max_capacity())
            .expire_after(PerEntryTtl)
            .build()
    }

    /// Number of live entries. Approximate, as moka applies pending writes lazily.
    pub fn entry_count(&self) -> u64 {
        self.cache().entry_count()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache().get(key).await.map(|v| v.bytes.to_vec()))
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let stored = StoredValue::new(value, Some(ttl));
        let entry = self
            .cache()
            .entry(key.to_string())
            .or_insert_with(async move { stored })
            .await;
        Ok(entry.is_fresh())
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.cache()
            .insert(key.to_string(), StoredValue::new(value, Some(ttl)))
            .await;
        Ok(())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.cache().insert(key.to_string(), StoredValue::new(value, None)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache().invalidate(key).await;
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool> {
        let result = self
            .cache()
            .entry(key.to_string())
            .and_compute_with(|entry| {
                let owned = entry.is_some_and(|e| &*e.value().bytes == expected);
                std::future::ready(if owned { Op::Remove } else { Op::Nop })
            })
            .await;
        Ok(matches!(result, CompResult::Removed(_)))
    }
}
