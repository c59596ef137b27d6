//! Wire representation of cached records.
//!
//! A data key holds one of three things:
//!
//! - nothing at all: the key was never checked (or its TTL ran out);
//! - the null sentinel, an empty byte string: the key was checked and the backing store has no such record;
//! - a non-empty payload: either a plain serialized value or a logical-expiry [`Envelope`].
//!
//! [`CacheRecord`] is the read-side view of these states. Since every encoded payload is required to be non-empty, the
//! three states never overlap.
use std::time::Duration;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::error::CacheError;
use crate::error::Result;

pub const NULL_SENTINEL: &[u8] = b"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRecord {
    Miss,
    Null,
    Present(Vec<u8>),
}

impl CacheRecord {
    pub fn from_raw(raw: Option<Vec<u8>>) -> Self {
        match raw {
            None => Self::Miss,
            Some(bytes) if bytes.is_empty() => Self::Null,
            Some(bytes) => Self::Present(bytes),
        }
    }
}

/// Value wrapper carrying a logical expiry. Stored without a physical TTL; readers compare `expires_at` against the
/// current time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<V> {
    pub expires_at: DateTime<Utc>,
    pub data:       V,
}

impl<V> Envelope<V> {
    pub fn new(data: V, ttl: Duration) -> Self {
        Self {
            expires_at: expiry_after(Utc::now(), ttl),
            data,
        }
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WireFormat {
    #[default]
    Json,
    Postcard,
}

impl WireFormat {
    pub fn encode<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let bytes = match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| CacheError::Serialize(e.to_string()))?,
            Self::Postcard => postcard::to_stdvec(value).map_err(|e| CacheError::Serialize(e.to_string()))?,
        };
        if bytes.is_empty() {
            return Err(CacheError::Serialize(format!(
                "{} encoding of {} is empty and cannot be told apart from the null sentinel",
                self,
                std::any::type_name::<T>()
            )));
        }
        Ok(bytes)
    }

    /// `key` is only used to give the error some context.
    pub fn decode<T>(&self, key: &str, bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| CacheError::deserialize(key, e)),
            Self::Postcard => postcard::from_bytes(bytes).map_err(|e| CacheError::deserialize(key, e)),
        }
    }
}
