//! Codec Module
//!
//! Converts typed values to and from the byte payloads kept in the store.
//! Per-type codecs are derived lazily and cached for the registry's lifetime.

mod envelope;
mod registry;
mod serializer;

// Re-export public types
pub use registry::{Codec, CodecRegistry};
pub use serializer::{EnvelopeSerializer, JsonSerializer, ValueSerializer};

// == Public Constants ==
/// Length of the type fingerprint that prefixes every envelope payload
pub const FINGERPRINT_LEN: usize = 4;
