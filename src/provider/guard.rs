//! Concurrency Guard Module
//!
//! Wraps the cache core in one read/write lock per provider: reads share it,
//! writes hold it alone. A single coarse lock orders all keys against each
//! other within this process; it does not coordinate separate processes that
//! share the same backing store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::{CacheCore, CacheOperations, Operation, OperationKind, Ttl};
use crate::codec::{EnvelopeSerializer, ValueSerializer};
use crate::config::ProviderConfig;
use crate::error::{CacheError, Result};
use crate::stats::CacheStats;
use crate::store::{KvClient, MemoryStore};
use crate::tasks::spawn_cleanup_task;

// == Cache Provider ==
/// Stampede-guarded cache facade exposed to application code.
///
/// Share it with `Arc`; every clone of the `Arc` uses the same lock.
#[derive(Debug)]
pub struct CacheProvider<S, Z = EnvelopeSerializer> {
    core: CacheCore<S, Z>,
    lock: RwLock<()>,
    config: ProviderConfig,
}

impl<S: KvClient> CacheProvider<S> {
    /// Creates a provider with the envelope serializer and default configuration.
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, EnvelopeSerializer::new(), ProviderConfig::default())
    }
}

impl<S, Z> CacheProvider<S, Z>
where
    S: KvClient,
    Z: ValueSerializer,
{
    // == Constructor ==
    /// Creates a provider with its own lock over a new core.
    pub fn new(store: S, serializer: Z, config: ProviderConfig) -> Self {
        Self {
            core: CacheCore::new(store, serializer, config.text_encoding),
            lock: RwLock::new(()),
            config,
        }
    }

    /// The unguarded core.
    pub fn core(&self) -> &CacheCore<S, Z> {
        &self.core
    }

    /// Configuration the provider was built with.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.core.stats()
    }

    // == Lock Acquisition ==
    async fn acquire<G>(&self, operation: Operation, lock: impl Future<Output = G>) -> Result<G> {
        match self.config.lock_timeout {
            None => Ok(lock.await),
            Some(limit) => tokio::time::timeout(limit, lock).await.map_err(|_| {
                warn!(
                    "Lock for {} not acquired within {:?}",
                    operation.name(),
                    limit
                );
                CacheError::LockAcquisition {
                    operation: operation.name(),
                    reason: format!("lock wait exceeded {:?}", limit),
                }
            }),
        }
    }

    // == Guarded Call ==
    /// Runs `call` while holding the lock mode `operation` needs.
    ///
    /// The guard drops on every exit path, including when the caller drops
    /// this future.
    async fn guarded<R>(
        &self,
        operation: Operation,
        call: impl Future<Output = Result<R>>,
    ) -> Result<R> {
        let result = match operation.kind() {
            OperationKind::Read => {
                let _shared = self.acquire(operation, self.lock.read()).await?;
                call.await
            }
            OperationKind::Write => {
                let _exclusive = self.acquire(operation, self.lock.write()).await?;
                call.await
            }
        };

        result.map_err(|source| {
            error!("Cache {} failed: {}", operation.name(), source);
            CacheError::OperationFailed {
                operation: operation.name(),
                source: Box::new(source),
            }
        })
    }

    /// Lock wait bound in effect, if any.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.config.lock_timeout
    }
}

impl<Z: ValueSerializer> CacheProvider<Arc<MemoryStore>, Z> {
    // == Store Maintenance ==
    /// Starts sweeping expired entries from the in-process store every
    /// `cleanup_interval` seconds of the provider's configuration.
    ///
    /// Abort the returned handle on shutdown.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        spawn_cleanup_task(Arc::clone(self.core.store()), self.config.cleanup_interval)
    }
}

#[async_trait]
impl<S, Z> CacheOperations for CacheProvider<S, Z>
where
    S: KvClient,
    Z: ValueSerializer,
{
    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded(Operation::Get, self.core.get(key)).await
    }

    async fn get_batch<T, K>(&self, keys: &[K]) -> Result<Vec<Option<T>>>
    where
        T: DeserializeOwned + Send + 'static,
        K: AsRef<str> + Sync,
    {
        self.guarded(Operation::GetBatch, self.core.get_batch(keys))
            .await
    }

    async fn set<T>(&self, key: &str, value: &T, ttl: Ttl) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + 'static,
    {
        self.guarded(Operation::Set, self.core.set(key, value, ttl))
            .await
    }

    async fn set_batch<T>(&self, entries: &HashMap<String, T>, ttl: Ttl) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + 'static,
    {
        self.guarded(Operation::SetBatch, self.core.set_batch(entries, ttl))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.guarded(Operation::Delete, self.core.delete(key)).await
    }

    async fn delete_batch<K>(&self, keys: &[K]) -> Result<()>
    where
        K: AsRef<str> + Sync,
    {
        self.guarded(Operation::DeleteBatch, self.core.delete_batch(keys))
            .await
    }
}
