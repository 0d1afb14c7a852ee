//! Cache Core Module
//!
//! Translates the typed cache contract into store commands: serialize, map the
//! bytes to text, write with TTL; and the reverse on reads.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{CacheOperations, Ttl};
use crate::codec::{EnvelopeSerializer, ValueSerializer};
use crate::encoding::TextEncoding;
use crate::error::{CacheError, Result};
use crate::stats::{CacheStats, StatsRecorder};
use crate::store::{KvClient, Pipeline, Reply};

// == Cache Core ==
/// Unguarded cache operations over a store client and a serializer.
///
/// Safe to call concurrently, but nothing orders reads against writes; use
/// `CacheProvider` for that.
#[derive(Debug)]
pub struct CacheCore<S, Z = EnvelopeSerializer> {
    store: S,
    serializer: Z,
    encoding: TextEncoding,
    stats: StatsRecorder,
}

impl<S, Z> CacheCore<S, Z>
where
    S: KvClient,
    Z: ValueSerializer,
{
    // == Constructor ==
    /// Creates a core writing `encoding` text through `serializer` into `store`.
    pub fn new(store: S, serializer: Z, encoding: TextEncoding) -> Self {
        Self {
            store,
            serializer,
            encoding,
            stats: StatsRecorder::new(),
        }
    }

    /// The backing store client.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The value serializer.
    pub fn serializer(&self) -> &Z {
        &self.serializer
    }

    /// Text encoding applied to payloads.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Switches the text encoding used for subsequent calls.
    ///
    /// Entries written under the previous encoding read back as misses.
    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn encode<T>(&self, value: &T) -> Result<String>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let bytes = self.serializer.serialize(value)?;
        self.encoding.encode(&bytes)
    }

    fn decode<T>(&self, text: &str) -> Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        let bytes = self.encoding.decode(text)?;
        self.serializer.deserialize(&bytes)
    }

    fn unexpected_reply(command: &str, key: &str, reply: &Reply) -> CacheError {
        CacheError::Store(format!("unexpected reply {:?} to {} {}", reply, command, key))
    }

    fn check_reply_count(sent: usize, replies: &[Reply]) -> Result<()> {
        if replies.len() != sent {
            return Err(CacheError::Store(format!(
                "pipeline returned {} replies for {} commands",
                replies.len(),
                sent
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S, Z> CacheOperations for CacheCore<S, Z>
where
    S: KvClient,
    Z: ValueSerializer,
{
    // == Get ==
    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let text = match self.store.get(key).await? {
            Some(text) if !text.is_empty() => text,
            _ => {
                debug!("Cache lookup {}: miss", key);
                self.stats.record_misses(1);
                return Ok(None);
            }
        };

        match self.decode::<T>(&text) {
            Ok(value) => {
                debug!("Cache lookup {}: hit", key);
                self.stats.record_hits(1);
                Ok(Some(value))
            }
            Err(e) if e.is_decode_failure() => {
                warn!("Cache lookup {}: undecodable entry treated as miss: {}", key, e);
                self.stats.record_decode_failure();
                self.stats.record_misses(1);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // == Get Batch ==
    async fn get_batch<T, K>(&self, keys: &[K]) -> Result<Vec<Option<T>>>
    where
        T: DeserializeOwned + Send + 'static,
        K: AsRef<str> + Sync,
    {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipeline = Pipeline::with_capacity(keys.len());
        for key in keys {
            pipeline.get(key.as_ref());
        }
        let replies = self.store.execute(pipeline).await?;
        Self::check_reply_count(keys.len(), &replies)?;

        let mut values = Vec::with_capacity(keys.len());
        for (key, reply) in keys.iter().zip(replies) {
            let key = key.as_ref();
            match reply {
                Reply::Value(Some(text)) if !text.is_empty() => match self.decode::<T>(&text) {
                    Ok(value) => values.push(Some(value)),
                    Err(e) if e.is_decode_failure() => {
                        warn!(
                            "Batch lookup of {} keys discarded, entry {} undecodable: {}",
                            keys.len(),
                            key,
                            e
                        );
                        self.stats.record_decode_failure();
                        return Ok(Vec::new());
                    }
                    Err(e) => return Err(e),
                },
                Reply::Value(_) => values.push(None),
                other => return Err(Self::unexpected_reply("GET", key, &other)),
            }
        }

        let hits = values.iter().filter(|v| v.is_some()).count();
        self.stats.record_hits(hits as u64);
        self.stats.record_misses((values.len() - hits) as u64);
        debug!("Batch lookup of {} keys: {} hits", values.len(), hits);

        Ok(values)
    }

    // == Set ==
    async fn set<T>(&self, key: &str, value: &T, ttl: Ttl) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + 'static,
    {
        let text = self.encode(value).map_err(|e| {
            error!("Cache write {} rejected: {}", key, e);
            e
        })?;

        match ttl.expiry() {
            None => self.store.set(key, text).await?,
            Some(seconds) => {
                let mut pipeline = Pipeline::with_capacity(2);
                pipeline.set(key, text).expire(key, seconds);
                let replies = self.store.execute(pipeline).await?;
                Self::check_reply_count(2, &replies)?;
            }
        }

        info!("Cache write {} (ttl {})", key, ttl.as_secs());
        self.stats.record_writes(1);
        Ok(())
    }

    // == Set Batch ==
    async fn set_batch<T>(&self, entries: &HashMap<String, T>, ttl: Ttl) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + 'static,
    {
        if entries.is_empty() {
            return Ok(());
        }

        // Encode everything up front so a bad entry aborts before anything is sent.
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let text = self.encode(value).map_err(|e| {
                error!(
                    "Batch write of {} entries rejected, entry {}: {}",
                    entries.len(),
                    key,
                    e
                );
                e
            })?;
            encoded.push((key.as_str(), text));
        }

        let per_entry = if ttl.expiry().is_some() { 2 } else { 1 };
        let mut pipeline = Pipeline::with_capacity(encoded.len() * per_entry);
        for (key, text) in encoded {
            pipeline.set(key, text);
            if let Some(seconds) = ttl.expiry() {
                pipeline.expire(key, seconds);
            }
        }

        let sent = pipeline.len();
        let replies = self.store.execute(pipeline).await?;
        Self::check_reply_count(sent, &replies)?;

        info!("Batch write of {} entries (ttl {})", entries.len(), ttl.as_secs());
        self.stats.record_writes(entries.len() as u64);
        Ok(())
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<()> {
        let removed = self.store.del(key).await?;
        info!("Cache delete {} ({} removed)", key, removed);
        self.stats.record_deletes(1);
        Ok(())
    }

    // == Delete Batch ==
    async fn delete_batch<K>(&self, keys: &[K]) -> Result<()>
    where
        K: AsRef<str> + Sync,
    {
        if keys.is_empty() {
            return Ok(());
        }

        let mut pipeline = Pipeline::with_capacity(keys.len());
        for key in keys {
            pipeline.del(key.as_ref());
        }
        let replies = self.store.execute(pipeline).await?;
        Self::check_reply_count(keys.len(), &replies)?;

        info!("Batch delete of {} keys", keys.len());
        self.stats.record_deletes(keys.len() as u64);
        Ok(())
    }
}
