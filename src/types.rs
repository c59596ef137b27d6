use std::fmt::Display;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const CACHE_SHOP_KEY: &str = "cache:shop:";
pub const LOCK_SHOP_KEY: &str = "lock:shop:";
pub const CACHE_SHOP_TYPE_KEY: &str = "cache:shopType";
pub const CACHE_SHOP_TTL: Duration = Duration::from_secs(30 * 60);

pub const DEFAULT_NULL_TTL: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(50);
pub const DEFAULT_REBUILD_WORKERS: usize = 10;

/// Anything usable as a record id: it becomes part of the data and lock keys.
pub trait CacheId: Display + Clone + Send + Sync + 'static {}
impl<T> CacheId for T where T: Display + Clone + Send + Sync + 'static {}

/// Anything that can be stored in the cache.
pub trait CacheValue: Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Data and lock key prefixes of one family of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    data_prefix: String,
    lock_prefix: String,
}

impl Keyspace {
    pub fn new(data_prefix: impl Into<String>, lock_prefix: impl Into<String>) -> Self {
        Self {
            data_prefix: data_prefix.into(),
            lock_prefix: lock_prefix.into(),
        }
    }

    pub fn shop() -> Self {
        Self::new(CACHE_SHOP_KEY, LOCK_SHOP_KEY)
    }

    pub fn data_key<K: Display>(&self, id: &K) -> String {
        format!("{}{id}", self.data_prefix)
    }

    pub fn lock_key<K: Display>(&self, id: &K) -> String {
        format!("{}{id}", self.lock_prefix)
    }

    pub fn data_prefix(&self) -> &str {
        &self.data_prefix
    }

    pub fn lock_prefix(&self) -> &str {
        &self.lock_prefix
    }
}
