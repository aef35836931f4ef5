//! Error types for the orchestration client.

use std::time::Duration;

/// The result type used throughout gridlink-client.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in orchestration client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument violated an operation precondition.
    ///
    /// Never retried; surfaced immediately.
    #[error("precondition violation: {message}")]
    Precondition {
        /// Description of the violated precondition.
        message: String,
    },

    /// A poll exceeded its deadline without observing acceptable state.
    ///
    /// Distinct from `NotFound`: the document exists but no new revision
    /// arrived in time.
    #[error("poll timed out after {waited:?}")]
    Timeout {
        /// How long the poll waited before giving up.
        waited: Duration,
    },

    /// A poll was cancelled through its cancellation token.
    #[error("poll cancelled")]
    Cancelled,

    /// A resolved task's payload kind does not match the caller's
    /// expectation. A caller error, not a stream fault.
    #[error("task kind mismatch: expected {expected}, found {actual}")]
    TaskKindMismatch {
        /// The kind the caller asked for.
        expected: &'static str,
        /// The kind the record actually carries.
        actual: &'static str,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An error from gridlink-core (storage, conflict, not-found).
    #[error("core error: {0}")]
    Core(#[from] gridlink_core::Error),
}

impl Error {
    /// Creates a new precondition violation.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true if this is a concurrency conflict from the state store.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Core(gridlink_core::Error::Conflict { .. }))
    }

    /// Returns true if this is a not-found error from either layer.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(gridlink_core::Error::NotFound(_)))
    }

    /// Returns true if this is a poll timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
