//! Error types for the stamp card service.

use stampcard_core::CoreError;
use thiserror::Error;

/// Result type for stamp card operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stamp card operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Store unreachable or write rejected; the caller may retry
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored document does not match its schema
    #[error("Invalid document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// Caller may not touch another user's data
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No signed-in user
    #[error("Not signed in")]
    Unauthenticated,

    /// Rejected by the stamp card rules
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Media upload failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upload(e.to_string())
    }
}

impl Error {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Upload(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampcard_core::CoreError;

    #[test]
    fn transient_errors() {
        assert!(Error::Unavailable("store down".into()).is_transient());
        assert!(Error::Upload("timeout".into()).is_transient());
        assert!(!Error::Forbidden("not yours".into()).is_transient());
        assert!(!Error::from(CoreError::SlotLocked { slot: 3, unlocked: 1 }).is_transient());
    }
}
