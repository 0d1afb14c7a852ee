//! Stored Entry Module
//!
//! Defines the text payload kept by the in-process store, with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Stored Entry ==
/// A text payload with optional expiry.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Text-encoded payload
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a persistent entry. Expiry is applied separately, as in the
    /// remote store's `SET` followed by `EXPIRE`.
    pub fn new(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    // == Expire ==
    /// Sets the entry to expire `seconds` from now.
    pub fn expire_in(&mut self, seconds: u64) {
        self.expires_at = Some(current_timestamp_ms().saturating_add(seconds.saturating_mul(1000)));
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time,
    /// so a zero-second TTL expires immediately.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Expiry ==
    /// Remaining lifetime of the entry.
    pub fn expiry(&self) -> KeyExpiry {
        match self.expires_at {
            None => KeyExpiry::Persistent,
            Some(expires) => {
                let now = current_timestamp_ms();
                if expires > now {
                    KeyExpiry::ExpiresIn(Duration::from_millis(expires - now))
                } else {
                    KeyExpiry::Missing
                }
            }
        }
    }
}

// == Key Expiry ==
/// Expiry introspection result, mirroring the remote store's `TTL` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExpiry {
    /// Key does not exist (or has already expired)
    Missing,
    /// Key exists without expiry
    Persistent,
    /// Key expires after the given duration
    ExpiresIn(Duration),
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
