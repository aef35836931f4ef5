//! Versioned state store contract and in-memory backend.
//!
//! The store holds at most one state document per entity identifier,
//! versioned by an opaque token that changes on every successful write.
//! Writes are conditional: the caller names the token it believes is
//! current, and the store commits only on a match. The distinguished
//! [`VersionToken::NotExists`] sentinel lets "create" and "update" share
//! one compare-and-swap primitive, so an orchestrator and an executor can
//! coordinate first-write-wins creation without distributed locking.
//!
//! ## Multi-Backend Compatibility
//!
//! Revision tags are opaque `String`s so backends can surface whatever
//! their wire offers: an HTTP ETag, an object-store generation, a row
//! version. Equality is the only operation defined on them.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::id::EntityId;

/// Opaque concurrency token naming one revision of a stored document.
///
/// A fresh token is minted on every successful write. The only defined
/// operations are equality and serialization; callers must not interpret
/// revision contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionToken {
    /// No document is currently stored at the identifier. This is the only
    /// token a conditional create may match.
    NotExists,
    /// A backend-minted revision tag.
    Revision(String),
}

impl VersionToken {
    /// Returns true if this is the absence sentinel.
    #[must_use]
    pub const fn is_not_exists(&self) -> bool {
        matches!(self, Self::NotExists)
    }

    /// Returns the revision tag, if any.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        match self {
            Self::NotExists => None,
            Self::Revision(tag) => Some(tag),
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotExists => f.write_str("not-exists"),
            Self::Revision(tag) => f.write_str(tag),
        }
    }
}

/// An atomically consistent document + token pair returned by reads.
///
/// The token names exactly the revision the bytes were read from; a read
/// never pairs a document with a stale or newer token.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The stored document bytes.
    pub data: Bytes,
    /// The token for this revision of the document.
    pub version: VersionToken,
    /// When this revision was committed, if the backend records it.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a conditional put.
///
/// A lost race is a normal outcome at this seam, never an `Err`. The
/// typed layers above decide whether a conflict is an error for their
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    /// The write committed; the document is now at `version`.
    Committed {
        /// The freshly minted token for the new revision.
        version: VersionToken,
    },
    /// The expected token did not match; the stored document is unchanged.
    Conflict {
        /// The store's current token, including [`VersionToken::NotExists`]
        /// when the caller expected a revision but no document exists.
        current: VersionToken,
    },
}

impl PutResult {
    /// Returns true if the write committed.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Converts the result into the new token, surfacing a conflict as
    /// [`Error::Conflict`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] carrying the store's current token if
    /// the precondition failed.
    pub fn into_version(self) -> Result<VersionToken> {
        match self {
            Self::Committed { version } => Ok(version),
            Self::Conflict { current } => Err(Error::Conflict { current }),
        }
    }
}

/// Versioned state store transport contract.
///
/// One document (or none) exists per identifier at any instant; writes to
/// one identifier are linearized via the version token. Implementations
/// must make a committed write visible to every subsequent `get` of the
/// same identifier.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` so orchestrators and executor fleets can
/// call concurrently; contention is scoped per identifier.
#[async_trait]
pub trait StateBackend: Send + Sync + 'static {
    /// Reads the current document and its token atomically.
    ///
    /// Returns [`Error::NotFound`] if no document exists at `id`.
    async fn get(&self, id: &EntityId) -> Result<Snapshot>;

    /// Conditionally stores `data` at `id`.
    ///
    /// Commits iff the store's current token equals `expected`, including
    /// the [`VersionToken::NotExists`] create case. A failed precondition
    /// is reported as [`PutResult::Conflict`], never as an error.
    async fn put(&self, id: &EntityId, data: Bytes, expected: &VersionToken)
        -> Result<PutResult>;

    /// Returns the current token without reading the document.
    ///
    /// Returns `None` if no document exists. Pollers use this as a cheap
    /// change probe before paying for a full read.
    async fn head(&self, id: &EntityId) -> Result<Option<VersionToken>>;
}

/// In-memory state backend for tests and single-process deployments.
///
/// Thread-safe via `RwLock`. Revisions are a per-document generation
/// counter exposed as an opaque string, mimicking object-store semantics.
#[derive(Debug, Default, Clone)]
pub struct MemoryStateBackend {
    documents: Arc<RwLock<HashMap<EntityId, StoredDocument>>>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Bytes,
    generation: u64,
    last_modified: DateTime<Utc>,
}

impl StoredDocument {
    fn token(&self) -> VersionToken {
        VersionToken::Revision(self.generation.to_string())
    }
}

impl MemoryStateBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateBackend for MemoryStateBackend {
    async fn get(&self, id: &EntityId) -> Result<Snapshot> {
        let documents = self.documents.read().map_err(|_| Error::Internal {
            message: "state lock poisoned".into(),
        })?;

        documents
            .get(id)
            .map(|doc| Snapshot {
                data: doc.data.clone(),
                version: doc.token(),
                last_modified: Some(doc.last_modified),
            })
            .ok_or_else(|| Error::NotFound(format!("no document at {id}")))
    }

    async fn put(
        &self,
        id: &EntityId,
        data: Bytes,
        expected: &VersionToken,
    ) -> Result<PutResult> {
        let mut documents = self.documents.write().map_err(|_| Error::Internal {
            message: "state lock poisoned".into(),
        })?;

        let current = documents.get(id);
        match (expected, current) {
            (VersionToken::NotExists, Some(doc)) => {
                return Ok(PutResult::Conflict {
                    current: doc.token(),
                });
            }
            (VersionToken::Revision(_), None) => {
                return Ok(PutResult::Conflict {
                    current: VersionToken::NotExists,
                });
            }
            (VersionToken::Revision(tag), Some(doc)) if doc.generation.to_string() != *tag => {
                return Ok(PutResult::Conflict {
                    current: doc.token(),
                });
            }
            _ => {}
        }

        let generation = current.map_or(1, |doc| doc.generation + 1);
        documents.insert(
            id.clone(),
            StoredDocument {
                data,
                generation,
                last_modified: Utc::now(),
            },
        );
        drop(documents);

        Ok(PutResult::Committed {
            version: VersionToken::Revision(generation.to_string()),
        })
    }

    async fn head(&self, id: &EntityId) -> Result<Option<VersionToken>> {
        let documents = self.documents.read().map_err(|_| Error::Internal {
            message: "state lock poisoned".into(),
        })?;

        Ok(documents.get(id).map(StoredDocument::token))
    }
}
