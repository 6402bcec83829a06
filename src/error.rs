//! Error type shared by every engine in the crate.

use thiserror::Error;

use crate::replica::ReplicaId;

/// Unified error type for converge operations.
#[derive(Debug, Error)]
pub enum Error {
    // Operation algebra
    #[error("operation needs a document of at least {required} characters, got {actual}")]
    DocumentTooShort { required: usize, actual: usize },

    #[error("operation lengths overflow")]
    LengthOverflow,

    // RGA local edits
    #[error("position {position} out of bounds (visible length {len})")]
    PositionOutOfBounds { position: usize, len: usize },

    #[error("nothing to insert")]
    EmptyInsert,

    // Counters
    #[error("counter entry for replica '{replica}' would overflow")]
    CounterOverflow { replica: ReplicaId },

    // OT server
    #[error("client claims version {version} but the server is at {current}")]
    UnknownVersion { version: u64, current: u64 },

    #[error("version {version} is older than the retained history (oldest {oldest}); resnapshot required")]
    VersionTooOld { version: u64, oldest: u64 },

    #[error("client '{0}' is not connected")]
    UnknownClient(ReplicaId),

    // Encoding and configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for converge operations.
pub type Result<T> = std::result::Result<T, Error>;
