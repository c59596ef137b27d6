use std::time::Duration;

use fieldx::fxstruct;

use crate::codec::WireFormat;
use crate::error::CacheError;
use crate::error::Result;
use crate::types::DEFAULT_LOCK_TTL;
use crate::types::DEFAULT_NULL_TTL;
use crate::types::DEFAULT_RETRY_BACKOFF;

/// Tunables shared by all strategies of a [`CacheClient`](crate::CacheClient).
///
/// ```ignore
/// let config = CacheConfig::builder()
///     .lock_ttl(Duration::from_secs(5))
///     .ttl_jitter(Duration::from_secs(60))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
#[fxstruct(sync, no_new, builder, get(copy))]
pub struct CacheConfig {
    /// Physical TTL of a null sentinel.
    #[fieldx(default(DEFAULT_NULL_TTL))]
    null_ttl: Duration,

    /// Physical TTL of a lock token. This is how long a crashed holder keeps a key locked.
    #[fieldx(default(DEFAULT_LOCK_TTL))]
    lock_ttl: Duration,

    /// Sleep between two lock attempts of the mutex strategy.
    #[fieldx(default(DEFAULT_RETRY_BACKOFF))]
    retry_backoff: Duration,

    /// How long the mutex strategy keeps retrying before giving up. Unbounded by default; the lock TTL still
    /// guarantees progress once a stuck holder's token expires.
    #[fieldx(default(Duration::MAX))]
    max_lock_wait: Duration,

    /// Upper bound of the random extension added to plain record TTLs so that records loaded together do not expire
    /// together.
    #[fieldx(default(Duration::ZERO))]
    ttl_jitter: Duration,

    #[fieldx(default(WireFormat::Json))]
    wire_format: WireFormat,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.null_ttl().is_zero() {
            return Err(CacheError::Config("null_ttl must be positive".into()));
        }
        if self.lock_ttl().is_zero() {
            return Err(CacheError::Config("lock_ttl must be positive".into()));
        }
        if self.retry_backoff().is_zero() {
            return Err(CacheError::Config("retry_backoff must be positive".into()));
        }
        Ok(())
    }

    /// Configuration with every tunable at its default value.
    pub fn standard() -> Result<Self> {
        Self::builder().build().map_err(|e| CacheError::Config(e.to_string()))
    }
}
