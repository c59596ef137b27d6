#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aside_cache::prelude::*;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id:   i64,
    pub name: String,
}

impl Shop {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Error)]
#[error("backing store is down")]
pub struct BackendDown;

/// In-memory stand-in for the database behind the cache. Counts every load.
#[derive(Clone, Default)]
pub struct Backend {
    rows:  Arc<Mutex<HashMap<i64, Shop>>>,
    loads: Arc<AtomicUsize>,
    down:  Arc<AtomicBool>,
    delay: Duration,
}

impl Backend {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn put(&self, shop: Shop) {
        self.rows.lock().insert(shop.id, shop);
    }

    pub fn remove(&self, id: i64) {
        self.rows.lock().remove(&id);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// The row is read first, the artificial delay comes after it.
    pub async fn load(&self, id: i64) -> Result<Option<Shop>, BackendDown> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let row = if self.down.load(Ordering::SeqCst) {
            Err(BackendDown)
        }
        else {
            Ok(self.rows.lock().get(&id).cloned())
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        row
    }

    pub fn loader(&self) -> impl Loader<i64, Shop> + Clone + 'static {
        let backend = self.clone();
        move |id: i64| {
            let backend = backend.clone();
            async move { backend.load(id).await }
        }
    }
}

/// A store that can be switched off to simulate a lost connection.
pub struct FlakyStore {
    inner: MemoryStore,
    down:  AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::builder().build().unwrap(),
            down:  AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::store_unavailable("connection refused"))
        }
        else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        self.check()?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.inner.delete(key).await
    }
}

pub fn flaky_client(config: CacheConfig) -> (Arc<FlakyStore>, Arc<CacheClient<FlakyStore>>) {
    let store = Arc::new(FlakyStore::new());
    let client = Arc::new(CacheClient::new(Arc::clone(&store), config).unwrap());
    (store, client)
}

pub fn memory_client(config: CacheConfig) -> Arc<CacheClient<MemoryStore>> {
    let store = Arc::new(MemoryStore::builder().build().unwrap());
    Arc::new(CacheClient::new(store, config).unwrap())
}

pub fn standard_client() -> Arc<CacheClient<MemoryStore>> {
    memory_client(CacheConfig::standard().unwrap())
}
