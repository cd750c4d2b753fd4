//! Error types for reconciliation and storage
//!
//! Every failure the reconciler or a storage adapter can report is an
//! [`Error`]. Callers that only care about the category use [`Error::kind`].
//!
//! | Kind | Meaning |
//! |------|---------|
//! | NotFound | A patch-only operation referenced a missing parent |
//! | Conflict | Storage rejected a conflict-tolerant write |
//! | UnsupportedUpdateType | Malformed update, nothing was written |
//! | InvalidTimestamp | Timestamp past the storable range, nothing was written |
//! | StorageUnavailable | Adapter disconnected or engine unreachable |
//! | Storage | Engine reported a failure for a single operation |
//! | Serialization | A stored document could not be (de)serialized |
//! | Corruption | Persisted data failed an integrity check |

use serde::Serialize;
use thiserror::Error;

/// Result type for Stepline core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Referenced entity missing
    NotFound,
    /// Write rejected despite conflict handling
    Conflict,
    /// Unknown `updateType`
    UnsupportedUpdateType,
    /// Timestamp outside the storable range
    InvalidTimestamp,
    /// Adapter cannot serve requests
    StorageUnavailable,
    /// Engine-level failure
    Storage,
    /// Encoding failure
    Serialization,
    /// Integrity failure of persisted data
    Corruption,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::UnsupportedUpdateType => "UnsupportedUpdateType",
            ErrorKind::InvalidTimestamp => "InvalidTimestamp",
            ErrorKind::StorageUnavailable => "StorageUnavailable",
            ErrorKind::Storage => "Storage",
            ErrorKind::Serialization => "Serialization",
            ErrorKind::Corruption => "Corruption",
        };
        f.write_str(name)
    }
}

/// Reconciliation and storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A parent entity required by a patch-only operation does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage rejected a write that should have been conflict-tolerant
    #[error("conflict: {0}")]
    Conflict(String),

    /// The update carried an `updateType` outside start/step/label/end
    #[error("unsupported update type: {0:?}")]
    UnsupportedUpdateType(String),

    /// The update carried a timestamp no backend can store
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    /// The adapter is disconnected or the engine cannot be reached
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The engine failed a single operation
    #[error("storage error: {0}")]
    Storage(String),

    /// A document or payload could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted data failed an integrity check
    #[error("corruption: {0}")]
    Corruption(String),
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::UnsupportedUpdateType(_) => ErrorKind::UnsupportedUpdateType,
            Error::InvalidTimestamp(_) => ErrorKind::InvalidTimestamp,
            Error::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Error::Storage(_) => ErrorKind::Storage,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Corruption(_) => ErrorKind::Corruption,
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if retrying the same update later may succeed
    ///
    /// Only connectivity failures qualify. Every protocol operation is
    /// idempotent, so replaying the whole update is always safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
