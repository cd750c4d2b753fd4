//! Unified error type for Stepline.
//!
//! Wraps the reconciliation/storage errors of `stepline-core` and
//! configuration errors behind one enum.

use stepline_core::ErrorKind;
use stepline_engine::ConfigError;
use thiserror::Error;

/// All Stepline errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Reconciliation or storage failure
    #[error(transparent)]
    Core(#[from] stepline_core::Error),

    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for Stepline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Category of a reconciliation or storage failure.
    ///
    /// `None` for configuration errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Core(e) => Some(e.kind()),
            Error::Config(_) => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_not_found())
    }

    /// Check if this error is retryable.
    ///
    /// Only an unavailable backend is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_retryable())
    }
}
