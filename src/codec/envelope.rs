//! Single-field carrier used as the encoding envelope.
//!
//! Every value is nested one level deep before encoding, so primitives,
//! collections and records all take the same path through the codec.

use serde::{Deserialize, Serialize};

/// Borrowing side of the envelope, used when encoding.
#[derive(Serialize)]
pub(crate) struct EnvelopeRef<'a, T> {
    pub value: &'a T,
}

/// Owning side of the envelope, used when decoding.
#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    pub value: T,
}

impl<'a, T> EnvelopeRef<'a, T> {
    pub fn new(value: &'a T) -> Self {
        Self { value }
    }
}
