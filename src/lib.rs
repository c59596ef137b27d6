//! # aside-cache
//!
//! Cache-aside layer between an application and a slow backing store, with the cache kept in a remote key-value store.
//!
//! The crate defends against the three classic failure modes of such a cache:
//!
//! - **penetration**: lookups for ids that exist neither in the cache nor in the store. Answered by caching a null
//!   sentinel with a short TTL.
//! - **breakdown**: a hot key expires and every concurrent reader rushes to rebuild it. Answered by a per-key
//!   distributed lock ([`MutexRebuild`](strategy::MutexRebuild)) or by logical expiry with a background rebuild
//!   ([`LogicalExpiry`](strategy::LogicalExpiry)).
//! - **avalanche**: many keys expire at the same moment. Answered by TTL jitter and by records that never expire
//!   physically.
//!
//! # The Basics
//!
//! The cache is backend-agnostic on both sides:
//!
//! - the key-value store is anything implementing [`KvStore`]; [`MemoryStore`] is an in-process one built on
//!   [moka](https://crates.io/crates/moka);
//! - the backing store is reached through a [`Loader`], and any `Fn(id) -> impl Future<Output = Result<Option<V>, E>>`
//!   closure is one.
//!
//! The cache never writes to the backing store. The write path updates the store itself and then calls
//! [`CacheStrategy::invalidate`] (or [`CacheClient::invalidate`]). Consistency is eventual: a rebuild racing an
//! invalidation may write back the value it loaded before the update.
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::builder().build()?);
//! let client = Arc::new(CacheClient::new(store, CacheConfig::standard()?)?);
//! let shops = client.mutex(Keyspace::shop());
//!
//! let loader = move |id: i64| {
//!     let db = db.clone();
//!     async move { shop::Entity::find_by_id(id).one(&db).await }
//! };
//!
//! let shop: Option<shop::Model> = shops.fetch(&1, &loader, CACHE_SHOP_TTL).await?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod loader;
pub mod lock;
pub mod scheduler;
pub mod store;
pub mod strategy;
pub mod types;

#[doc(inline)]
pub use client::CacheClient;
#[doc(inline)]
pub use config::CacheConfig;
#[doc(inline)]
pub use error::CacheError;
#[doc(inline)]
pub use loader::Loader;
#[doc(inline)]
pub use scheduler::RebuildScheduler;
#[doc(inline)]
pub use store::KvStore;
#[doc(inline)]
pub use store::MemoryStore;
#[doc(inline)]
pub use strategy::CacheStrategy;

pub mod prelude {
    pub use crate::client::CacheClient;
    pub use crate::codec::CacheRecord;
    pub use crate::codec::Envelope;
    pub use crate::codec::WireFormat;
    pub use crate::config::CacheConfig;
    pub use crate::error::CacheError;
    pub use crate::loader::Loader;
    pub use crate::scheduler::RebuildScheduler;
    pub use crate::store::KvStore;
    pub use crate::store::MemoryStore;
    pub use crate::strategy::CacheStrategy;
    pub use crate::strategy::LogicalExpiry;
    pub use crate::strategy::MutexRebuild;
    pub use crate::strategy::PassThrough;
    pub use crate::strategy::StrategyKind;
    pub use crate::types::*;
}
