//! Error types for the stream pet engine.
//!
//! Reaction paths (events, commands, states) never surface errors to their
//! callers; they log and degrade. The variants here cover the boundaries
//! that do fail loudly: the configuration store and the message bus.

use thiserror::Error;

/// The main error type for stream-pet-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a value from the backing storage.
    #[error("failed to read storage key '{key}': {source}")]
    StorageRead {
        /// The storage key that could not be read.
        key: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a value to the backing storage.
    #[error("failed to write storage key '{key}': {source}")]
    StorageWrite {
        /// The storage key that could not be written.
        key: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The stored configuration is not valid JSON or does not fit the schema.
    #[error("failed to parse configuration: {source}")]
    ConfigParse {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configuration could not be written out as JSON.
    #[error("failed to serialize configuration: {source}")]
    ConfigSerialize {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configuration is structurally invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A named entry already exists.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// The kind of entry (event, command, state).
        kind: &'static str,
        /// The entry name.
        name: String,
    },

    /// A named entry does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// The kind of entry (event, command, state).
        kind: &'static str,
        /// The entry name.
        name: String,
    },

    /// A bus message was rejected at the boundary.
    #[error("invalid control message: {message}")]
    InvalidMessage {
        /// Why the message was rejected.
        message: String,
    },

    /// A bus message carried a type this engine does not know.
    #[error("unknown control message type: '{kind}'")]
    UnknownMessage {
        /// The unrecognised `type` tag.
        kind: String,
    },

    /// A bus message came from an origin outside the allow-list.
    #[error("message from untrusted origin '{origin}'")]
    UntrustedOrigin {
        /// The rejected origin.
        origin: String,
    },

    /// The pet has been shut down.
    #[error("pet has been shut down")]
    ShutDown,
}

impl Error {
    /// Create a new `InvalidConfig` error with the given message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new `InvalidMessage` error with the given message.
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Create a new `NotFound` error.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a new `AlreadyExists` error.
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }
}

/// A specialized `Result` type for stream-pet-core operations.
pub type Result<T> = std::result::Result<T, Error>;
