//! Value Serializer Module
//!
//! The serialization capability consumed by the cache core. Any supported
//! value, primitive, collection or record, is stored without the caller
//! special-casing its shape.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::envelope::{Envelope, EnvelopeRef};
use super::registry::CodecRegistry;
use crate::error::{CacheError, Result};

// == Value Serializer Trait ==
/// Converts typed values to bytes and back.
pub trait ValueSerializer: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Encodes `value` into an opaque payload.
    ///
    /// Fails with `UnsupportedType` when the payload could not be decoded
    /// back into `T`.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + DeserializeOwned + 'static;

    /// Decodes a payload produced by `serialize` for the same type.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned + 'static;
}

// == Envelope Serializer ==
/// Compact binary serializer backed by the codec registry.
///
/// This is the default serializer of the cache provider.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeSerializer {
    registry: Arc<CodecRegistry>,
}

impl EnvelopeSerializer {
    /// Creates a serializer with its own registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer sharing an existing registry.
    pub fn with_registry(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }

    /// Registry holding the derived codecs.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }
}

impl ValueSerializer for EnvelopeSerializer {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.registry.codec::<T>().encode(value)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        self.registry.codec::<T>().decode(bytes)
    }
}

// == JSON Serializer ==
/// Self-describing serializer producing `{"value": ...}` documents.
///
/// Larger than the envelope encoding, but readable from any client of the
/// backing store.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl ValueSerializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        serde_json::to_vec(&EnvelopeRef::new(value)).map_err(|e| CacheError::UnsupportedType {
            type_name: std::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        serde_json::from_slice::<Envelope<T>>(bytes)
            .map(|envelope| envelope.value)
            .map_err(|e| CacheError::MalformedPayload {
                type_name: std::any::type_name::<T>(),
                reason: e.to_string(),
            })
    }
}
