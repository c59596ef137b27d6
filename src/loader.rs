use std::error::Error as StdError;
use std::future::Future;

use async_trait::async_trait;

/// Fetches the authoritative record for an id from the backing store.
///
/// `Ok(None)` is a definitive "no such record" and results in a null sentinel being cached. Errors are never retried
/// by the cache; any retry policy belongs to the loader.
///
/// Any `Fn(K) -> impl Future<Output = Result<Option<V>, E>>` closure is a loader:
///
/// ```ignore
/// let loader = move |id: i64| {
///     let db = db.clone();
///     async move { shop::Entity::find_by_id(id).one(&db).await }
/// };
/// ```
#[async_trait]
pub trait Loader<K, V>: Send + Sync {
    type Error: StdError + Send + Sync + 'static;

    async fn load(&self, id: K) -> Result<Option<V>, Self::Error>;
}

#[async_trait]
impl<K, V, E, F, Fut> Loader<K, V> for F
where
    K: Send + 'static,
    V: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<V>, E>> + Send,
    E: StdError + Send + Sync + 'static,
{
    type Error = E;

    async fn load(&self, id: K) -> Result<Option<V>, E> {
        (self)(id).await
    }
}
