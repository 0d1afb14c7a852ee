//! Store Module
//!
//! Boundary to the remote key-value store. The cache core only speaks this
//! trait; connection pooling and the wire protocol live behind it.

mod entry;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use entry::{current_timestamp_ms, KeyExpiry, StoredEntry};
pub use memory::MemoryStore;

// == Command ==
/// A single store command queued in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(String),
    Set(String, String),
    Expire(String, u64),
    Del(String),
}

impl Command {
    /// Key addressed by the command.
    pub fn key(&self) -> &str {
        match self {
            Command::Get(key) | Command::Set(key, _) | Command::Expire(key, _) | Command::Del(key) => {
                key
            }
        }
    }

    /// Returns true for commands that mutate the store.
    pub fn is_write(&self) -> bool {
        !matches!(self, Command::Get(_))
    }
}

// == Reply ==
/// Result of one pipelined command, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer to `Get`; `None` when the key is absent
    Value(Option<String>),
    /// Answer to `Set`
    Ok,
    /// Answer to `Expire`; false when the key does not exist
    Expire(bool),
    /// Answer to `Del`; number of keys removed
    Deleted(u64),
}

// == Pipeline ==
/// Batch of commands sent to the store in one round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pipeline with room for `capacity` commands.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Queues a `GET`.
    pub fn get(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Get(key.into()));
        self
    }

    /// Queues a `SET`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Set(key.into(), value.into()));
        self
    }

    /// Queues an `EXPIRE` in seconds.
    pub fn expire(&mut self, key: impl Into<String>, seconds: u64) -> &mut Self {
        self.commands.push(Command::Expire(key.into(), seconds));
        self
    }

    /// Queues a `DEL`.
    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Del(key.into()));
        self
    }

    /// Queued commands in submission order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns true if any queued command mutates the store.
    pub fn has_writes(&self) -> bool {
        self.commands.iter().any(Command::is_write)
    }

    /// Consumes the pipeline, yielding its commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

// == Key-Value Client ==
/// Client of the backing key-value store.
///
/// Implementations acquire a connection for the duration of each call and
/// release it on every exit path, errors included.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Reads the text stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, clearing any previous expiry.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Expires `key` after `seconds`. Returns false if the key does not exist.
    async fn expire(&self, key: &str, seconds: u64) -> Result<bool>;

    /// Removes `key`, returning the number of keys removed.
    async fn del(&self, key: &str) -> Result<u64>;

    /// Runs every queued command in one round trip, replies in submission order.
    async fn execute(&self, pipeline: Pipeline) -> Result<Vec<Reply>>;
}

#[async_trait]
impl<C: KvClient + ?Sized> KvClient for Arc<C> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        (**self).expire(key, seconds).await
    }

    async fn del(&self, key: &str) -> Result<u64> {
        (**self).del(key).await
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<Vec<Reply>> {
        (**self).execute(pipeline).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_preserves_submission_order() {
        let mut pipeline = Pipeline::new();
        pipeline.set("a", "1").expire("a", 60).get("b").del("c");

        assert_eq!(pipeline.len(), 4);
        assert_eq!(
            pipeline.commands(),
            &[
                Command::Set("a".to_string(), "1".to_string()),
                Command::Expire("a".to_string(), 60),
                Command::Get("b".to_string()),
                Command::Del("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_pipeline_write_detection() {
        let mut reads = Pipeline::with_capacity(2);
        reads.get("a").get("b");
        assert!(!reads.has_writes());

        let mut mixed = Pipeline::new();
        mixed.get("a").del("a");
        assert!(mixed.has_writes());
        assert_eq!(mixed.commands()[1].key(), "a");
    }
}
