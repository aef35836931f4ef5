//! Append-only task streams with globally addressable records.
//!
//! Each target entity owns an ordered sequence of task records. Producers
//! append and receive a freshly minted identifier, unique across the whole
//! grid; consumers resolve identifiers back to records with a point
//! lookup, or page through a target's sequence in append order. Records
//! are write-once: no update or delete exists at this seam.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use ulid::Ulid;

use gridlink_core::EntityId;

use crate::error::{Error, Result};
use crate::task::Task;

/// Task stream transport contract.
///
/// ## Ordering
///
/// Appends to one target are assigned *some* order, fixed at commit time;
/// concurrent producers may interleave, but a committed sequence is never
/// reordered. Appends to different targets are fully independent.
#[async_trait]
pub trait TaskStreamBackend: Send + Sync + 'static {
    /// Appends a record to `target`'s sequence and mints its identifier.
    ///
    /// The append is atomic: either the record is durably visible under
    /// the returned identifier, or the call fails and no identifier is
    /// issued. Identifiers are never reused.
    async fn append(&self, target: &EntityId, data: Bytes) -> Result<EntityId>;

    /// Resolves a previously minted task identifier to its record.
    ///
    /// A point lookup: fails [`gridlink_core::Error::NotFound`] for
    /// unknown identifiers, never waits.
    async fn get(&self, task_id: &EntityId) -> Result<Bytes>;

    /// Reads up to `count` records of `target`'s sequence starting at
    /// append-order position `from`.
    ///
    /// Returns fewer than `count` records at the end of the sequence, and
    /// an empty vector past it.
    async fn read_slice(
        &self,
        target: &EntityId,
        from: usize,
        count: usize,
    ) -> Result<Vec<(EntityId, Bytes)>>;

    /// Returns the number of records appended to `target`'s sequence.
    async fn len(&self, target: &EntityId) -> Result<usize>;
}

/// Internal stream state protected by a single lock.
#[derive(Debug, Default)]
struct StreamState {
    /// Per-target minted identifiers, in fixed append order.
    sequences: HashMap<EntityId, Vec<EntityId>>,
    /// All records by identifier.
    records: HashMap<EntityId, Bytes>,
}

/// In-memory task stream for tests and single-process deployments.
///
/// The write lock fixes a total append order per target.
#[derive(Debug, Default)]
pub struct InMemoryTaskStream {
    state: RwLock<StreamState>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    gridlink_core::Error::storage("task stream lock poisoned").into()
}

impl InMemoryTaskStream {
    /// Creates a new empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStreamBackend for InMemoryTaskStream {
    async fn append(&self, target: &EntityId, data: Bytes) -> Result<EntityId> {
        let task_id = target
            .child(&format!("tasks/{}", Ulid::new()))
            .map_err(Error::from)?;

        let mut state = self.state.write().map_err(poison_err)?;
        state
            .sequences
            .entry(target.clone())
            .or_default()
            .push(task_id.clone());
        state.records.insert(task_id.clone(), data);
        drop(state);

        Ok(task_id)
    }

    async fn get(&self, task_id: &EntityId) -> Result<Bytes> {
        let state = self.state.read().map_err(poison_err)?;
        state
            .records
            .get(task_id)
            .cloned()
            .ok_or_else(|| gridlink_core::Error::NotFound(format!("no task at {task_id}")).into())
    }

    async fn read_slice(
        &self,
        target: &EntityId,
        from: usize,
        count: usize,
    ) -> Result<Vec<(EntityId, Bytes)>> {
        let state = self.state.read().map_err(poison_err)?;
        let Some(sequence) = state.sequences.get(target) else {
            return Ok(Vec::new());
        };

        let end = from.saturating_add(count).min(sequence.len());
        if from >= end {
            return Ok(Vec::new());
        }

        sequence[from..end]
            .iter()
            .map(|id| {
                let data = state.records.get(id).cloned().ok_or_else(|| {
                    gridlink_core::Error::Internal {
                        message: format!("sequence references missing record {id}"),
                    }
                })?;
                Ok((id.clone(), data))
            })
            .collect()
    }

    async fn len(&self, target: &EntityId) -> Result<usize> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.sequences.get(target).map_or(0, Vec::len))
    }
}

/// Producer half of the task stream.
#[derive(Clone)]
pub struct TaskProducer {
    backend: Arc<dyn TaskStreamBackend>,
}

impl TaskProducer {
    /// Creates a producer over the given backend handle.
    #[must_use]
    pub fn new(backend: Arc<dyn TaskStreamBackend>) -> Self {
        Self { backend }
    }

    /// Appends `task` to `target`'s sequence, returning the minted
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the task's `target` is unset or
    /// names a different entity; stamping is the caller's job and is
    /// never silently corrected here.
    pub async fn add_to_stream(&self, target: &EntityId, task: &Task) -> Result<EntityId> {
        match &task.target {
            None => {
                return Err(Error::precondition("task has no target set"));
            }
            Some(stamped) if stamped != target => {
                return Err(Error::precondition(format!(
                    "task target {stamped} does not match destination {target}"
                )));
            }
            Some(_) => {}
        }

        let data = serde_json::to_vec(task)
            .map_err(|e| Error::serialization(format!("encoding task: {e}")))?;
        let task_id = self.backend.append(target, Bytes::from(data)).await?;
        tracing::debug!(stream = %target, task = %task_id, kind = task.kind(), "task appended");
        Ok(task_id)
    }
}

/// Consumer half of the task stream.
#[derive(Clone)]
pub struct TaskConsumer {
    backend: Arc<dyn TaskStreamBackend>,
}

impl TaskConsumer {
    /// Creates a consumer over the given backend handle.
    #[must_use]
    pub fn new(backend: Arc<dyn TaskStreamBackend>) -> Self {
        Self { backend }
    }

    /// Resolves a task identifier to its record.
    ///
    /// # Errors
    ///
    /// Returns [`gridlink_core::Error::NotFound`] for unknown identifiers
    /// and [`Error::Serialization`] for records that do not decode.
    pub async fn get_by_id(&self, task_id: &EntityId) -> Result<Task> {
        let data = self.backend.get(task_id).await?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::serialization(format!("decoding task at {task_id}: {e}")))
    }

    /// Reads up to `count` tasks of `target`'s sequence starting at
    /// append-order position `from`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures and decode errors.
    pub async fn read_slice(
        &self,
        target: &EntityId,
        from: usize,
        count: usize,
    ) -> Result<Vec<(EntityId, Task)>> {
        let records = self.backend.read_slice(target, from, count).await?;
        records
            .into_iter()
            .map(|(id, data)| {
                let task = serde_json::from_slice(&data)
                    .map_err(|e| Error::serialization(format!("decoding task at {id}: {e}")))?;
                Ok((id, task))
            })
            .collect()
    }

    /// Returns the number of tasks appended to `target`'s sequence.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn len(&self, target: &EntityId) -> Result<usize> {
        self.backend.len(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ExecutorCommand, ServiceCommand};
    use std::sync::Arc;

    fn target() -> EntityId {
        EntityId::parse("grid://test/services/web").unwrap()
    }

    fn addressed_task(operation: &str) -> Task {
        let mut task = Task::service(ServiceCommand::new(operation));
        task.target = Some(target());
        task
    }

    fn wired() -> (TaskProducer, TaskConsumer) {
        let backend = Arc::new(InMemoryTaskStream::new());
        (TaskProducer::new(backend.clone()), TaskConsumer::new(backend))
    }

    #[tokio::test]
    async fn append_then_resolve_roundtrips() {
        let (producer, consumer) = wired();
        let task = addressed_task("install");

        let task_id = producer.add_to_stream(&target(), &task).await.unwrap();

        let resolved = consumer.get_by_id(&task_id).await.unwrap();
        assert_eq!(resolved, task);
        assert_eq!(resolved.target.as_ref(), Some(&target()));

        // Repeated lookups return the same record.
        let again = consumer.get_by_id(&task_id).await.unwrap();
        assert_eq!(again, resolved);
    }

    #[tokio::test]
    async fn identifiers_are_never_reused() {
        let (producer, _) = wired();
        let task = addressed_task("install");

        let id1 = producer.add_to_stream(&target(), &task).await.unwrap();
        let id2 = producer.add_to_stream(&target(), &task).await.unwrap();
        assert_ne!(id1, id2, "identical payloads must still mint distinct ids");
        assert!(id1.as_str().starts_with(target().as_str()));
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let (_, consumer) = wired();
        let unknown = target().child("tasks/unknown").unwrap();
        let err = consumer.get_by_id(&unknown).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unaddressed_task_is_rejected_without_append() {
        let (producer, consumer) = wired();
        let task = Task::service(ServiceCommand::new("install"));

        let err = producer.add_to_stream(&target(), &task).await.unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
        assert_eq!(consumer.len(&target()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mismatched_target_is_rejected() {
        let (producer, _) = wired();
        let mut task = Task::executor(ExecutorCommand::new("start"));
        task.target = Some(EntityId::parse("grid://test/services/other").unwrap());

        let err = producer.add_to_stream(&target(), &task).await.unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
    }

    #[tokio::test]
    async fn read_slice_pages_in_append_order() {
        let (producer, consumer) = wired();

        let mut appended = Vec::new();
        for n in 0..5 {
            let task = addressed_task(&format!("op-{n}"));
            appended.push(producer.add_to_stream(&target(), &task).await.unwrap());
        }

        let page = consumer.read_slice(&target(), 1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].0, appended[1]);
        assert_eq!(page[1].0, appended[2]);
        assert_eq!(page[0].1.as_service().unwrap().operation, "op-1");

        // Clamped past the end.
        let tail = consumer.read_slice(&target(), 4, 10).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert!(consumer.read_slice(&target(), 5, 10).await.unwrap().is_empty());

        assert_eq!(consumer.len(&target()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn sequences_are_independent_per_target() {
        let (producer, consumer) = wired();
        let other = EntityId::parse("grid://test/services/db").unwrap();

        producer
            .add_to_stream(&target(), &addressed_task("install"))
            .await
            .unwrap();

        let mut db_task = Task::service(ServiceCommand::new("install"));
        db_task.target = Some(other.clone());
        producer.add_to_stream(&other, &db_task).await.unwrap();

        assert_eq!(consumer.len(&target()).await.unwrap(), 1);
        assert_eq!(consumer.len(&other).await.unwrap(), 1);
    }
}
