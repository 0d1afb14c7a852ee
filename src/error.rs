//! Error types for the caching facade
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No codec can be derived for the requested type
    #[error("Unsupported type {type_name}: {reason}")]
    UnsupportedType {
        type_name: &'static str,
        reason: String,
    },

    /// Stored bytes do not match the layout expected for the type
    #[error("Malformed payload for {type_name}: {reason}")]
    MalformedPayload {
        type_name: &'static str,
        reason: String,
    },

    /// Payload could not cross the text encoding boundary
    #[error("Encoding error ({encoding}): {reason}")]
    Encoding {
        encoding: &'static str,
        reason: String,
    },

    /// The provider lock could not be acquired
    #[error("Failed to acquire lock for {operation}: {reason}")]
    LockAcquisition {
        operation: &'static str,
        reason: String,
    },

    /// The wrapped cache operation failed
    #[error("Operation {operation} failed: {source}")]
    OperationFailed {
        operation: &'static str,
        #[source]
        source: Box<CacheError>,
    },

    /// The backing store rejected or failed a command
    #[error("Store error: {0}")]
    Store(String),

    /// TTL outside of `-1` or `>= 0`
    #[error("Invalid TTL: {0}")]
    InvalidTtl(i64),

    /// Configuration value could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Returns true for errors raised while turning stored text back into a value.
    ///
    /// Single-key reads treat these as a miss; batch reads fail closed on them.
    /// `UnsupportedType` is not one of them: it is a property of the requested
    /// type, not of the stored entry, and is returned to the caller.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            CacheError::MalformedPayload { .. } | CacheError::Encoding { .. }
        )
    }

    /// Name of the guarded operation, if this error came out of the provider.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            CacheError::OperationFailed { operation, .. }
            | CacheError::LockAcquisition { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching facade.
pub type Result<T> = std::result::Result<T, CacheError>;
