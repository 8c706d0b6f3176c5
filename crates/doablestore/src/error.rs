//! Error types for doablestore

use std::io;
use std::path::PathBuf;

use crate::kind::EntityKind;

/// Result type alias for doablestore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for entity store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No file backs the requested entity
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Kind of the missing entity
        kind: EntityKind,
        /// Requested id
        id: String,
    },

    /// The id cannot be used as a file name
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    /// The file exists but does not hold a valid entity
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        /// File that failed to decode
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// The entity could not be serialized
    #[error("cannot encode entity: {0}")]
    Encode(#[source] serde_json::Error),

    /// I/O error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error means "no such entity"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
