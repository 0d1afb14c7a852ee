//! Ranger Cache - A typed caching facade over a remote key-value store
//!
//! Provides typed get/set/delete with pipelined batch variants, pluggable
//! serialization, and a read/write guard against cache stampedes.
//!
//! # Read policy
//! A single-key read that finds an undecodable entry reports a miss. A batch
//! read that finds one returns an empty result for the whole batch. Asking
//! for a type the serializer cannot decode is an error on reads and writes.

pub mod codec;
pub mod config;
pub mod encoding;
pub mod error;
pub mod provider;
pub mod stats;
pub mod store;
pub mod tasks;

pub use codec::{CodecRegistry, EnvelopeSerializer, JsonSerializer, ValueSerializer};
pub use config::ProviderConfig;
pub use encoding::TextEncoding;
pub use error::{CacheError, Result};
pub use provider::{CacheCore, CacheOperations, CacheProvider, Operation, OperationKind, Ttl};
pub use stats::CacheStats;
pub use store::{KeyExpiry, KvClient, MemoryStore, Pipeline, Reply};
pub use tasks::spawn_cleanup_task;
