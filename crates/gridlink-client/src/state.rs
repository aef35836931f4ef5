//! Typed state documents exchanged between orchestrators and executors.
//!
//! The state store is agnostic to document shape; these are the two
//! documents the orchestration client itself reads and writes. Executors
//! publish [`TaskExecutorState`] describing what they have observed and
//! done; orchestrators publish [`ServiceOrchestratorState`] describing
//! what they have dispatched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gridlink_core::EntityId;

/// Marker trait for documents stored in the versioned state store.
///
/// `KIND` is a stable name used in logs and error messages.
pub trait StateDocument: Serialize + DeserializeOwned + Send + Sync {
    /// Stable document kind name.
    const KIND: &'static str;
}

/// The orchestrator's view of one logical service.
///
/// Created empty by `create_service` and thereafter updated conditionally
/// as tasks are dispatched and observed complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrchestratorState {
    /// Tasks dispatched to the service and not yet observed complete,
    /// in dispatch order.
    #[serde(default)]
    pub pending_tasks: Vec<EntityId>,
}

impl ServiceOrchestratorState {
    /// Creates the fresh, empty document stored at service creation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dispatched task.
    pub fn record_dispatch(&mut self, task_id: EntityId) {
        self.pending_tasks.push(task_id);
    }

    /// Removes a task the executor reported complete.
    ///
    /// Returns true if the task was pending.
    pub fn record_completion(&mut self, task_id: &EntityId) -> bool {
        let before = self.pending_tasks.len();
        self.pending_tasks.retain(|t| t != task_id);
        self.pending_tasks.len() != before
    }
}

impl StateDocument for ServiceOrchestratorState {
    const KIND: &'static str = "serviceOrchestratorState";
}

/// An executor's self-reported progress through its task sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExecutorState {
    /// The task currently being processed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executing_task: Option<EntityId>,
    /// Tasks finished by this executor, in completion order.
    #[serde(default)]
    pub completed_tasks: Vec<EntityId>,
}

impl TaskExecutorState {
    /// Creates an idle executor state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a task as being executed.
    pub fn begin(&mut self, task_id: EntityId) {
        self.executing_task = Some(task_id);
    }

    /// Marks the in-flight task as completed.
    ///
    /// No-op if nothing is executing.
    pub fn complete(&mut self) {
        if let Some(task_id) = self.executing_task.take() {
            self.completed_tasks.push(task_id);
        }
    }

    /// Returns true if the executor is between tasks.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.executing_task.is_none()
    }
}

impl StateDocument for TaskExecutorState {
    const KIND: &'static str = "taskExecutorState";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(n: u32) -> EntityId {
        EntityId::parse(format!("grid://test/services/web/tasks/{n}")).unwrap()
    }

    #[test]
    fn orchestrator_state_tracks_pending_tasks() {
        let mut state = ServiceOrchestratorState::new();
        assert!(state.pending_tasks.is_empty());

        state.record_dispatch(task(1));
        state.record_dispatch(task(2));
        assert_eq!(state.pending_tasks, vec![task(1), task(2)]);

        assert!(state.record_completion(&task(1)));
        assert_eq!(state.pending_tasks, vec![task(2)]);
        assert!(!state.record_completion(&task(1)));
    }

    #[test]
    fn executor_state_lifecycle() {
        let mut state = TaskExecutorState::new();
        assert!(state.is_idle());

        state.begin(task(1));
        assert!(!state.is_idle());

        state.complete();
        assert!(state.is_idle());
        assert_eq!(state.completed_tasks, vec![task(1)]);

        // Completing while idle is a no-op.
        state.complete();
        assert_eq!(state.completed_tasks.len(), 1);
    }

    #[test]
    fn documents_roundtrip_as_camel_case_json() {
        let mut state = TaskExecutorState::new();
        state.begin(task(7));

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("executingTask"));
        assert!(json.contains("completedTasks"));

        let back: TaskExecutorState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn empty_orchestrator_state_deserializes_from_empty_object() {
        let state: ServiceOrchestratorState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, ServiceOrchestratorState::new());
    }
}
