//! Typed conditional access to the versioned state store.
//!
//! [`StateWriter`] and [`StateReader`] sit between typed state documents
//! and the byte-level [`StateBackend`] seam. The writer is where a lost
//! compare-and-swap turns from a normal backend outcome into an
//! [`Error::Conflict`](gridlink_core::Error::Conflict) for the caller;
//! that conversion happens here exactly once.

use std::sync::Arc;

use bytes::Bytes;

use gridlink_core::{EntityId, PutResult, StateBackend, VersionToken};

use crate::error::{Error, Result};
use crate::state::StateDocument;

/// Typed conditional writer over an injected state backend.
#[derive(Clone)]
pub struct StateWriter {
    backend: Arc<dyn StateBackend>,
}

impl StateWriter {
    /// Creates a writer over the given backend handle.
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Serializes and conditionally stores `document` at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`gridlink_core::Error::Conflict`] (wrapped in
    /// [`Error::Core`]) if the store's current token does not equal
    /// `expected`; the stored document is unchanged in that case.
    pub async fn put<D: StateDocument>(
        &self,
        id: &EntityId,
        document: &D,
        expected: &VersionToken,
    ) -> Result<VersionToken> {
        let data = serde_json::to_vec(document)
            .map_err(|e| Error::serialization(format!("encoding {}: {e}", D::KIND)))?;

        match self.backend.put(id, Bytes::from(data), expected).await? {
            PutResult::Committed { version } => {
                tracing::debug!(entity = %id, kind = D::KIND, version = %version, "state committed");
                Ok(version)
            }
            PutResult::Conflict { current } => {
                tracing::debug!(entity = %id, kind = D::KIND, current = %current, "state write lost race");
                Err(gridlink_core::Error::Conflict { current }.into())
            }
        }
    }
}

/// Typed one-shot reader over an injected state backend.
#[derive(Clone)]
pub struct StateReader {
    backend: Arc<dyn StateBackend>,
}

impl StateReader {
    /// Creates a reader over the given backend handle.
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Reads the current document and its token.
    ///
    /// # Errors
    ///
    /// Returns [`gridlink_core::Error::NotFound`] if no document exists
    /// at `id`, or [`Error::Serialization`] if the stored bytes do not
    /// decode as `D`.
    pub async fn get<D: StateDocument>(&self, id: &EntityId) -> Result<(D, VersionToken)> {
        let snapshot = self.backend.get(id).await?;
        let document = serde_json::from_slice(&snapshot.data)
            .map_err(|e| Error::serialization(format!("decoding {} at {id}: {e}", D::KIND)))?;
        Ok((document, snapshot.version))
    }

    /// Returns the store's current token for `id` without reading the
    /// document, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Propagates backend transport failures.
    pub async fn head(&self, id: &EntityId) -> Result<Option<VersionToken>> {
        Ok(self.backend.head(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ServiceOrchestratorState;
    use gridlink_core::MemoryStateBackend;

    fn service_id() -> EntityId {
        EntityId::parse("grid://test/services/web").unwrap()
    }

    fn wired() -> (StateWriter, StateReader) {
        let backend = Arc::new(MemoryStateBackend::new());
        (
            StateWriter::new(backend.clone()),
            StateReader::new(backend),
        )
    }

    #[tokio::test]
    async fn typed_roundtrip() {
        let (writer, reader) = wired();
        let id = service_id();

        let mut state = ServiceOrchestratorState::new();
        state.record_dispatch(id.child("tasks/1").unwrap());

        let token = writer
            .put(&id, &state, &VersionToken::NotExists)
            .await
            .unwrap();

        let (read, read_token): (ServiceOrchestratorState, _) = reader.get(&id).await.unwrap();
        assert_eq!(read, state);
        assert_eq!(read_token, token);
    }

    #[tokio::test]
    async fn conflict_surfaces_current_token() {
        let (writer, _) = wired();
        let id = service_id();
        let state = ServiceOrchestratorState::new();

        let t1 = writer
            .put(&id, &state, &VersionToken::NotExists)
            .await
            .unwrap();

        let err = writer
            .put(&id, &state, &VersionToken::NotExists)
            .await
            .unwrap_err();
        match err {
            Error::Core(gridlink_core::Error::Conflict { current }) => assert_eq!(current, t1),
            other => panic!("expected conflict, got {other}"),
        }
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_, reader) = wired();
        let err = reader
            .get::<ServiceOrchestratorState>(&service_id())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn head_reflects_writes() {
        let (writer, reader) = wired();
        let id = service_id();

        assert!(reader.head(&id).await.unwrap().is_none());
        let token = writer
            .put(&id, &ServiceOrchestratorState::new(), &VersionToken::NotExists)
            .await
            .unwrap();
        assert_eq!(reader.head(&id).await.unwrap(), Some(token));
    }
}
