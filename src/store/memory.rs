//! Memory Store Module
//!
//! In-process key-value store speaking the `KvClient` contract, with TTL
//! expiration. Used for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::entry::{KeyExpiry, StoredEntry};
use super::{Command, KvClient, Pipeline, Reply};
use crate::error::Result;

// == Memory Store ==
/// HashMap-backed store with lazy and periodic expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, StoredEntry>>,
    /// Number of calls served, a pipeline counting once
    round_trips: AtomicU64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Expiry ==
    /// Reports the remaining lifetime of `key`.
    pub async fn expiry(&self, key: &str) -> KeyExpiry {
        let entries = self.entries.read().await;
        entries.get(key).map_or(KeyExpiry::Missing, StoredEntry::expiry)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of round trips served so far.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    fn record_round_trip(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    /// Applies one command against the locked map.
    fn apply(entries: &mut HashMap<String, StoredEntry>, command: Command) -> Reply {
        match command {
            Command::Get(key) => {
                let expired = entries.get(&key).is_some_and(StoredEntry::is_expired);
                if expired {
                    entries.remove(&key);
                }
                Reply::Value(entries.get(&key).map(|entry| entry.value.clone()))
            }
            Command::Set(key, value) => {
                entries.insert(key, StoredEntry::new(value));
                Reply::Ok
            }
            Command::Expire(key, seconds) => match entries.get_mut(&key) {
                Some(entry) if !entry.is_expired() => {
                    entry.expire_in(seconds);
                    Reply::Expire(true)
                }
                _ => Reply::Expire(false),
            },
            Command::Del(key) => {
                let removed = entries
                    .remove(&key)
                    .is_some_and(|entry| !entry.is_expired());
                Reply::Deleted(u64::from(removed))
            }
        }
    }

    async fn run(&self, command: Command) -> Reply {
        self.record_round_trip();
        let mut entries = self.entries.write().await;
        Self::apply(&mut entries, command)
    }
}

#[async_trait]
impl KvClient for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.run(Command::Get(key.to_string())).await {
            Reply::Value(value) => Ok(value),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.run(Command::Set(key.to_string(), value)).await;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        Ok(matches!(
            self.run(Command::Expire(key.to_string(), seconds)).await,
            Reply::Expire(true)
        ))
    }

    async fn del(&self, key: &str) -> Result<u64> {
        match self.run(Command::Del(key.to_string())).await {
            Reply::Deleted(count) => Ok(count),
            _ => Ok(0),
        }
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<Vec<Reply>> {
        self.record_round_trip();
        debug!("Executing pipeline of {} commands", pipeline.len());

        let mut entries = self.entries.write().await;
        Ok(pipeline
            .into_commands()
            .into_iter()
            .map(|command| Self::apply(&mut entries, command))
            .collect())
    }
}
