//! Error types and result aliases for Gridlink.
//!
//! Errors are structured for programmatic handling: a lost conditional
//! write, a missing document, and a transport fault are distinct variants,
//! never collapsed into a generic failure. Transport faults keep their
//! source so root causes survive propagation.

use crate::store::VersionToken;

/// The result type used throughout Gridlink.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Gridlink core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid entity identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the identifier invalid.
        message: String,
    },

    /// No document or task exists at the identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write lost the race: the supplied version token does
    /// not match the store's current token for the identifier.
    ///
    /// The stored document is unchanged. `current` is the token the store
    /// holds now, including [`VersionToken::NotExists`] when the caller
    /// expected a revision but the document is absent.
    #[error("concurrency conflict: current version is {current}")]
    Conflict {
        /// The store's current token for the identifier.
        current: VersionToken,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A storage or transport operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true if this is a concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
