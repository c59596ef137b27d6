use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// Everything that can go wrong on a cache read or write path.
///
/// Lock contention is deliberately absent: it is a control-flow signal, not a failure.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key-value store could not serve a request. Adapters map their transport errors here.
    #[error("key-value store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("loading '{key}' from the backing store failed: {source}")]
    Load {
        key:    String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("malformed cache record under '{key}': {reason}")]
    Deserialize { key: String, reason: String },

    #[error("failed to encode value: {0}")]
    Serialize(String),

    #[error("gave up waiting for lock '{key}' after {waited:?}")]
    LockWaitTimeout { key: String, waited: Duration },

    #[error("rebuild scheduler is closed")]
    SchedulerClosed,

    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    pub fn store_unavailable<E: ToString>(err: E) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    pub(crate) fn load<E>(key: &str, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Load {
            key:    key.to_string(),
            source: Box::new(err),
        }
    }

    pub(crate) fn deserialize<E: ToString>(key: &str, err: E) -> Self {
        Self::Deserialize {
            key:    key.to_string(),
            reason: err.to_string(),
        }
    }
}
