//! Codec Registry Module
//!
//! Maps a value's type identity to its reusable codec. Codecs are created on
//! first use and never evicted.

use std::any::{type_name, Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use bincode::Options;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::envelope::{Envelope, EnvelopeRef};
use super::FINGERPRINT_LEN;
use crate::error::{CacheError, Result};

// == Codec ==
/// Per-type encoding metadata.
///
/// Payloads are framed as a little-endian type fingerprint followed by the
/// bincode image of the value's envelope. Two codecs derived for the same type
/// are interchangeable.
///
/// Every encoded payload is decoded once before it is handed out. A type whose
/// payloads do not decode is marked unsupported and refused from then on.
pub struct Codec<T> {
    type_name: &'static str,
    fingerprint: u32,
    rejected: OnceLock<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Codec<T> {
    // == Derive ==
    /// Builds the codec for `T` from its type identity.
    pub fn derive() -> Self {
        let type_name = type_name::<T>();
        let mut hasher = DefaultHasher::new();
        type_name.hash(&mut hasher);
        let fingerprint = hasher.finish() as u32;

        debug!("Derived codec for {} (fingerprint {:08x})", type_name, fingerprint);

        Self {
            type_name,
            fingerprint,
            rejected: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    /// Fully qualified name of the encoded type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type fingerprint written ahead of every payload.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Returns true once a payload of this type failed to decode.
    pub fn is_rejected(&self) -> bool {
        self.rejected.get().is_some()
    }

    fn unsupported(&self, reason: &str) -> CacheError {
        CacheError::UnsupportedType {
            type_name: self.type_name,
            reason: reason.to_string(),
        }
    }

    fn wire_options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
    }

    fn classify(&self, err: bincode::Error, decoding: bool) -> CacheError {
        match *err {
            bincode::ErrorKind::DeserializeAnyNotSupported
            | bincode::ErrorKind::SequenceMustHaveLength => CacheError::UnsupportedType {
                type_name: self.type_name,
                reason: err.to_string(),
            },
            _ if decoding => CacheError::MalformedPayload {
                type_name: self.type_name,
                reason: err.to_string(),
            },
            _ => CacheError::UnsupportedType {
                type_name: self.type_name,
                reason: err.to_string(),
            },
        }
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Codec<T> {
    // == Encode ==
    /// Wraps `value` in the envelope and encodes it behind the fingerprint.
    ///
    /// Fails with `UnsupportedType` when the payload would not decode back,
    /// e.g. for self-describing types or fields skipped only when empty.
    pub fn encode(&self, value: &T) -> Result<Vec<u8>> {
        if let Some(reason) = self.rejected.get() {
            return Err(self.unsupported(reason));
        }

        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.fingerprint.to_le_bytes());
        Self::wire_options()
            .serialize_into(&mut buf, &EnvelopeRef::new(value))
            .map_err(|e| self.classify(e, false))?;

        if let Err(e) = self.decode(&buf) {
            let reason = self
                .rejected
                .get_or_init(|| format!("encoded payload does not decode: {}", e));
            warn!("Codec for {} rejected: {}", self.type_name, reason);
            return Err(self.unsupported(reason));
        }
        Ok(buf)
    }
}

impl<T: DeserializeOwned + 'static> Codec<T> {
    // == Decode ==
    /// Checks the fingerprint, decodes the envelope and unwraps the value.
    pub fn decode(&self, bytes: &[u8]) -> Result<T> {
        if bytes.len() < FINGERPRINT_LEN {
            return Err(CacheError::MalformedPayload {
                type_name: self.type_name,
                reason: format!("payload of {} bytes has no fingerprint", bytes.len()),
            });
        }

        let (header, body) = bytes.split_at(FINGERPRINT_LEN);
        let mut fingerprint = [0u8; FINGERPRINT_LEN];
        fingerprint.copy_from_slice(header);
        let found = u32::from_le_bytes(fingerprint);
        if found != self.fingerprint {
            return Err(CacheError::MalformedPayload {
                type_name: self.type_name,
                reason: format!(
                    "fingerprint {:08x} does not match expected {:08x}",
                    found, self.fingerprint
                ),
            });
        }

        Self::wire_options()
            .deserialize::<Envelope<T>>(body)
            .map(|envelope| envelope.value)
            .map_err(|e| self.classify(e, true))
    }
}

impl<T: 'static> fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("type_name", &self.type_name)
            .field("fingerprint", &format_args!("{:08x}", self.fingerprint))
            .field("rejected", &self.is_rejected())
            .finish()
    }
}

// == Codec Registry ==
/// Concurrent map from type identity to its codec.
///
/// Shared by `Arc` between serializers and providers; lookups and inserts are
/// safe from any thread.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl CodecRegistry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // == Lookup ==
    /// Returns the codec for `T`, deriving and caching it on first use.
    pub fn codec<T: 'static>(&self) -> Arc<Codec<T>> {
        let id = TypeId::of::<T>();

        if let Some(cached) = self.codecs.get(&id) {
            if let Ok(codec) = Arc::clone(cached.value()).downcast::<Codec<T>>() {
                return codec;
            }
        }

        let entry = self.codecs.entry(id).or_insert_with(|| {
            let codec: Arc<dyn Any + Send + Sync> = Arc::new(Codec::<T>::derive());
            codec
        });
        match Arc::clone(entry.value()).downcast::<Codec<T>>() {
            Ok(codec) => codec,
            // keyed by TypeId, so the stored codec always has this type
            Err(_) => Arc::new(Codec::derive()),
        }
    }

    /// Number of types with a cached codec.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns true if no codec has been derived yet.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.codecs.len())
            .finish()
    }
}
