//! Configuration Module
//!
//! Handles loading and managing provider configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::encoding::TextEncoding;

/// Provider configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Byte-to-text encoding applied to payloads
    pub text_encoding: TextEncoding,
    /// Upper bound on waiting for the provider lock, None = wait forever
    pub lock_timeout: Option<Duration>,
    /// Memory store sweep interval in seconds, used by `CacheProvider::spawn_cleanup`
    pub cleanup_interval: u64,
}

impl ProviderConfig {
    /// Creates a new ProviderConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TEXT_ENCODING` - `latin1`, `base64` or `utf8` (default: latin1)
    /// - `CACHE_LOCK_TIMEOUT_MS` - Lock wait bound in milliseconds, 0 = none (default: none)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            text_encoding: env::var("CACHE_TEXT_ENCODING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.text_encoding),
            lock_timeout: env::var("CACHE_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Returns a copy using `encoding` for payload text.
    pub fn with_text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    /// Returns a copy sweeping the memory store every `secs` seconds.
    pub fn with_cleanup_interval(mut self, secs: u64) -> Self {
        self.cleanup_interval = secs;
        self
    }

    /// Returns a copy that gives up waiting for the lock after `timeout`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            text_encoding: TextEncoding::Latin1,
            lock_timeout: None,
            cleanup_interval: 1,
        }
    }
}
