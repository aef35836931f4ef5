//! The orchestration client facade.
//!
//! Composes the state writer, state poller, and task stream halves into
//! the four-operation control surface an orchestrator drives. The facade
//! is stateless between calls; everything lives in the injected
//! collaborators, so one client can serve any number of concurrent
//! callers.

use std::sync::Arc;

use tracing::Instrument as _;

use gridlink_core::observability::{state_span, stream_span};
use gridlink_core::{EntityId, StateBackend, VersionToken};

use crate::error::{Error, Result};
use crate::poller::{PollOptions, StatePoller};
use crate::state::{ServiceOrchestratorState, StateDocument};
use crate::store::{StateReader, StateWriter};
use crate::stream::{TaskConsumer, TaskProducer, TaskStreamBackend};
use crate::task::Task;

/// Control-plane client for one orchestration grid.
pub struct OrchestrationClient {
    writer: StateWriter,
    poller: StatePoller,
    producer: TaskProducer,
    consumer: TaskConsumer,
}

impl OrchestrationClient {
    /// Creates a client from pre-wired collaborators.
    #[must_use]
    pub fn new(
        writer: StateWriter,
        poller: StatePoller,
        producer: TaskProducer,
        consumer: TaskConsumer,
    ) -> Self {
        Self {
            writer,
            poller,
            producer,
            consumer,
        }
    }

    /// Wires all collaborators over the two backend handles.
    #[must_use]
    pub fn connect(
        state: Arc<dyn StateBackend>,
        stream: Arc<dyn TaskStreamBackend>,
    ) -> Self {
        Self {
            writer: StateWriter::new(state.clone()),
            poller: StatePoller::new(StateReader::new(state)),
            producer: TaskProducer::new(stream.clone()),
            consumer: TaskConsumer::new(stream),
        }
    }

    /// Creates the orchestration state for a new logical service.
    ///
    /// Stores a fresh, empty [`ServiceOrchestratorState`] at `service_id`,
    /// expecting absence. Returns the minted token, the handle for the
    /// caller's next conditional update.
    ///
    /// # Errors
    ///
    /// Returns [`gridlink_core::Error::Conflict`] untouched if the service
    /// already exists; this is the signal callers use to detect a
    /// duplicate create. Exactly one of any number of concurrent creators
    /// wins.
    pub async fn create_service(&self, service_id: &EntityId) -> Result<VersionToken> {
        self.writer
            .put(
                service_id,
                &ServiceOrchestratorState::new(),
                &VersionToken::NotExists,
            )
            .instrument(state_span("create_service", service_id.as_str()))
            .await
    }

    /// Dispatches a task to a service, returning its minted identifier.
    ///
    /// Stamps `task.target = service_id` before appending; a task already
    /// addressed to a different entity is rejected without an append.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for a task addressed elsewhere;
    /// stream failures pass through.
    pub async fn add_service_task(
        &self,
        service_id: &EntityId,
        mut task: Task,
    ) -> Result<EntityId> {
        if let Some(existing) = &task.target {
            if existing != service_id {
                return Err(Error::precondition(format!(
                    "task is already addressed to {existing}, not {service_id}"
                )));
            }
        }
        task.target = Some(service_id.clone());

        self.producer
            .add_to_stream(service_id, &task)
            .instrument(stream_span("add_service_task", service_id.as_str()))
            .await
    }

    /// Returns the freshest observable state document for a service.
    ///
    /// Delegates to the poller: the call suspends until new state is
    /// observed, the deadline elapses, or the cancellation token fires.
    ///
    /// # Errors
    ///
    /// As for [`StatePoller::get`].
    pub async fn get_service_state<D: StateDocument>(
        &self,
        service_id: &EntityId,
        options: &PollOptions,
    ) -> Result<D> {
        self.poller.get(service_id, options).await
    }

    /// Conditionally replaces a service's state document.
    ///
    /// The ongoing half of the state exchange: whichever side holds the
    /// current token (orchestrator or executor) publishes the next
    /// revision through this.
    ///
    /// # Errors
    ///
    /// Returns [`gridlink_core::Error::Conflict`] if `expected` is stale;
    /// the stored document is unchanged.
    pub async fn update_service_state<D: StateDocument>(
        &self,
        service_id: &EntityId,
        document: &D,
        expected: &VersionToken,
    ) -> Result<VersionToken> {
        self.writer.put(service_id, document, expected).await
    }

    /// Resolves a task identifier to its record.
    ///
    /// A point lookup; never waits.
    ///
    /// # Errors
    ///
    /// Returns [`gridlink_core::Error::NotFound`] for unknown identifiers.
    pub async fn get_task(&self, task_id: &EntityId) -> Result<Task> {
        self.consumer.get_by_id(task_id).await
    }

    /// Returns the consumer half for sequence reads beyond point lookup.
    #[must_use]
    pub const fn tasks(&self) -> &TaskConsumer {
        &self.consumer
    }
}
