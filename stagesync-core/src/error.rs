//! Error types for snapshot synchronization.
//!
//! Every failure class the engine distinguishes maps to one variant here:
//! remote-store call failures keep their context and source, checkpoint
//! problems are separated from ordinary I/O because they threaten
//! resumability, and lock contention is its own variant so callers can tell
//! "someone else is extracting this collection" apart from a broken disk.

use thiserror::Error;

/// Main error type for StageSync operations.
#[derive(Debug, Error)]
pub enum StageSyncError {
    /// A remote store call failed (network, transport, or decode)
    #[error("Remote store call failed: {context}")]
    Store {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The remote store answered with a non-success status
    #[error("Remote store rejected {context}: status {status}")]
    Api { status: u16, context: String },

    /// Checkpoint file could not be read, written, or renamed
    #[error("Checkpoint operation failed: {context}")]
    Checkpoint {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the extraction lock for this resource
    #[error("Checkpoint for {key} is locked by another extraction")]
    CheckpointLocked { key: String },

    /// A checkpoint file was written by a newer, incompatible version
    #[error("Unsupported checkpoint format version {found} (supported: {supported})")]
    CheckpointVersion { found: u32, supported: u32 },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with StageSyncError
pub type Result<T> = std::result::Result<T, StageSyncError>;

impl StageSyncError {
    /// Creates a store error with context
    pub fn store_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an API status error
    pub fn api(status: u16, context: impl Into<String>) -> Self {
        Self::Api {
            status,
            context: context.into(),
        }
    }

    /// Creates a checkpoint error with context
    pub fn checkpoint_failed(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Checkpoint {
            context: context.into(),
            source,
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io_failed(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization_failed(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}
