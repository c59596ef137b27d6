//! Read policies.
//!
//! All three share the [`CacheStrategy`] contract and differ only in how they rebuild a missing or outdated record:
//!
//! | Strategy | Miss | Concurrent misses | Protects against |
//! | -------- | ---- | ----------------- | ---------------- |
//! | [`PassThrough`] | load, cache value or null sentinel | each caller loads | penetration |
//! | [`MutexRebuild`] | one caller loads under a lock, others wait | one load | penetration, breakdown |
//! | [`LogicalExpiry`] | absent, the key must be warmed | stale value served, one background reload | breakdown, avalanche |
pub mod logical_expiry;
pub mod mutex;
pub mod pass_through;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::Loader;
use crate::types::CacheId;
use crate::types::CacheValue;
use crate::types::Keyspace;

#[doc(inline)]
pub use logical_expiry::LogicalExpiry;
#[doc(inline)]
pub use mutex::MutexRebuild;
#[doc(inline)]
pub use pass_through::PassThrough;

#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Read the record for `id`, falling back to `loader` as the strategy sees fit. `ttl` is the cache duration of
    /// the record: physical for plain records, logical for envelopes.
    async fn fetch<K, V, L>(&self, id: &K, loader: &L, ttl: Duration) -> Result<Option<V>>
    where
        K: CacheId,
        V: CacheValue,
        L: Loader<K, V> + Clone + 'static;

    /// Drop the cached record for `id`.
    async fn invalidate<K>(&self, id: &K) -> Result<()>
    where
        K: CacheId;

    fn keyspace(&self) -> &Keyspace;
}

/// Policy selector, mostly for configuration and command lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyKind {
    PassThrough,
    #[default]
    Mutex,
    LogicalExpiry,
}
