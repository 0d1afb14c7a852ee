//! Provider Module
//!
//! Typed get/set/delete against the backing store, single and batched.
//! `CacheCore` does the work; `CacheProvider` wraps it in the read/write
//! lock that keeps concurrent refills from stampeding the store.

mod cache_core;
mod guard;

#[cfg(test)]
mod property_tests;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

// Re-export public types
pub use self::cache_core::CacheCore;
pub use self::guard::CacheProvider;

// == TTL ==
/// Lifetime applied to an entry when it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Entry never expires
    Persistent,
    /// Entry expires this many seconds after the write
    Seconds(u64),
}

impl Ttl {
    /// Raw TTL value meaning "no expiry".
    pub const NO_EXPIRY: i64 = -1;

    /// Converts a raw TTL in seconds: `-1` is persistent, `>= 0` expires.
    pub fn from_secs(secs: i64) -> Result<Self> {
        match secs {
            Self::NO_EXPIRY => Ok(Ttl::Persistent),
            secs if secs >= 0 => Ok(Ttl::Seconds(secs as u64)),
            secs => Err(CacheError::InvalidTtl(secs)),
        }
    }

    /// Raw TTL value, `-1` for persistent entries.
    pub fn as_secs(&self) -> i64 {
        match self {
            Ttl::Persistent => Self::NO_EXPIRY,
            Ttl::Seconds(secs) => i64::try_from(*secs).unwrap_or(i64::MAX),
        }
    }

    /// Expiry to send after the write, if any.
    pub fn expiry(&self) -> Option<u64> {
        match self {
            Ttl::Persistent => None,
            Ttl::Seconds(secs) => Some(*secs),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Seconds(duration.as_secs())
    }
}

// == Operations ==
/// Lock mode an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Shared: any number may run together
    Read,
    /// Exclusive: runs alone
    Write,
}

/// Every operation of the cache capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single-key read
    Get,
    /// Pipelined multi-key read
    GetBatch,
    /// Single-key write
    Set,
    /// Pipelined multi-key write
    SetBatch,
    /// Single-key removal
    Delete,
    /// Pipelined multi-key removal
    DeleteBatch,
}

impl Operation {
    /// Name used in errors and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::GetBatch => "get_batch",
            Operation::Set => "set",
            Operation::SetBatch => "set_batch",
            Operation::Delete => "delete",
            Operation::DeleteBatch => "delete_batch",
        }
    }

    /// Lock mode the guard takes for this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Get | Operation::GetBatch => OperationKind::Read,
            Operation::Set | Operation::SetBatch | Operation::Delete | Operation::DeleteBatch => {
                OperationKind::Write
            }
        }
    }
}

// == Cache Operations Trait ==
/// The cache capability shared by the core and the guarded provider.
///
/// Single-key reads degrade decode failures to a miss. Batch reads fail
/// closed: one undecodable entry empties the whole result. Writes fail on any
/// error.
#[async_trait]
pub trait CacheOperations: Send + Sync {
    /// Reads one value; `Ok(None)` on a miss.
    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static;

    /// Reads many values in one round trip, in the order of `keys`.
    async fn get_batch<T, K>(&self, keys: &[K]) -> Result<Vec<Option<T>>>
    where
        T: DeserializeOwned + Send + 'static,
        K: AsRef<str> + Sync;

    /// Writes one value.
    async fn set<T>(&self, key: &str, value: &T, ttl: Ttl) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + 'static;

    /// Writes many values in one round trip, all with the same TTL.
    async fn set_batch<T>(&self, entries: &HashMap<String, T>, ttl: Ttl) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + 'static;

    /// Removes one key; absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes many keys in one round trip.
    async fn delete_batch<K>(&self, keys: &[K]) -> Result<()>
    where
        K: AsRef<str> + Sync;
}
