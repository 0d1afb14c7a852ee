//! Text Encoding Module
//!
//! The backing store only persists text, so every encoded payload crosses a
//! byte-to-text boundary before it is written and after it is read.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CacheError, Result};

// == Text Encoding ==
/// Byte-to-text mapping applied to payloads on their way to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// ISO-8859-1: every byte maps to the char with the same code point
    #[default]
    Latin1,
    /// Standard base64 alphabet with padding
    Base64,
    /// Strict UTF-8; rejects payloads that are not valid UTF-8
    Utf8,
}

impl TextEncoding {
    /// Canonical lowercase name, as accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Base64 => "base64",
            TextEncoding::Utf8 => "utf8",
        }
    }

    // == Encode ==
    /// Converts a binary payload into store-safe text.
    pub fn encode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Base64 => Ok(STANDARD.encode(bytes)),
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| CacheError::Encoding {
                encoding: self.name(),
                reason: e.to_string(),
            }),
        }
    }

    // == Decode ==
    /// Converts text read from the store back into the original payload.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| CacheError::Encoding {
                        encoding: self.name(),
                        reason: format!("character {:?} is outside ISO-8859-1", c),
                    })
                })
                .collect(),
            TextEncoding::Base64 => STANDARD.decode(text).map_err(|e| CacheError::Encoding {
                encoding: self.name(),
                reason: e.to_string(),
            }),
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latin1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            "base64" => Ok(TextEncoding::Base64),
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown text encoding '{}'",
                other
            ))),
        }
    }
}
