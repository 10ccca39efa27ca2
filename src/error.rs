//! Error types for courier
//!
//! All modules use `CourierResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for courier operations
pub type CourierResult<T> = Result<T, CourierError>;

/// All errors that can occur in courier
#[derive(Error, Debug)]
pub enum CourierError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Encryption enabled but no recipient public key configured")]
    RecipientKeyMissing,

    // Encryption errors
    #[error("Unusable recipient public key: {reason}")]
    KeyFormat { reason: String },

    #[error("Payload decryption failed: {reason}")]
    Unseal { reason: String },

    // Transport errors
    #[error("Transport failed for {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CourierError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a key format error
    pub fn key_format(reason: impl Into<String>) -> Self {
        Self::KeyFormat {
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Whether a later delivery attempt for the same artifact could succeed.
    ///
    /// Key material problems are permanent until reconfigured; transport and
    /// IO failures are transient.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Io { .. })
    }
}
