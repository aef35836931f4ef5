//! Task records dispatched through the task stream.
//!
//! A task is an immutable unit of work addressed to one target entity.
//! Payloads are a tagged sum type, so a resolved record is discriminated
//! statically; asking for the wrong family is an explicit
//! [`Error::TaskKindMismatch`], not a runtime downcast failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gridlink_core::EntityId;

use crate::error::{Error, Result};

/// One unit of work, immutable once appended to a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// The service or executor this task is destined for.
    ///
    /// Stamped by the client before append; the stream validates it and
    /// never infers it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,
    /// The operation-specific payload.
    pub payload: TaskPayload,
    /// When the producer created the record.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates an unaddressed task carrying a service command.
    #[must_use]
    pub fn service(command: ServiceCommand) -> Self {
        Self {
            target: None,
            payload: TaskPayload::Service(command),
            created_at: Utc::now(),
        }
    }

    /// Creates an unaddressed task carrying an executor command.
    #[must_use]
    pub fn executor(command: ExecutorCommand) -> Self {
        Self {
            target: None,
            payload: TaskPayload::Executor(command),
            created_at: Utc::now(),
        }
    }

    /// Returns the payload kind name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Returns the service command, if that is what this task carries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskKindMismatch`] for any other payload kind.
    pub fn as_service(&self) -> Result<&ServiceCommand> {
        match &self.payload {
            TaskPayload::Service(command) => Ok(command),
            other => Err(Error::TaskKindMismatch {
                expected: "service",
                actual: other.kind(),
            }),
        }
    }

    /// Returns the executor command, if that is what this task carries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskKindMismatch`] for any other payload kind.
    pub fn as_executor(&self) -> Result<&ExecutorCommand> {
        match &self.payload {
            TaskPayload::Executor(command) => Ok(command),
            other => Err(Error::TaskKindMismatch {
                expected: "executor",
                actual: other.kind(),
            }),
        }
    }
}

/// Tagged task payload, one variant per task family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaskPayload {
    /// A lifecycle command addressed to a service orchestrator.
    Service(ServiceCommand),
    /// A command addressed to a task executor.
    Executor(ExecutorCommand),
}

impl TaskPayload {
    /// Returns the stable kind name used in logs and mismatch errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Service(_) => "service",
            Self::Executor(_) => "executor",
        }
    }
}

/// A lifecycle command for a logical service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCommand {
    /// The operation to apply ("install", "uninstall", ...).
    pub operation: String,
    /// Free-form parameters interpreted by the target orchestrator.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ServiceCommand {
    /// Creates a command with no parameters.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            parameters: serde_json::Map::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// A command for a task executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorCommand {
    /// The operation to apply ("start", "stop", "drain", ...).
    pub operation: String,
}

impl ExecutorCommand {
    /// Creates an executor command.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_accessor_matches() {
        let task = Task::service(ServiceCommand::new("install"));
        assert_eq!(task.kind(), "service");
        assert_eq!(task.as_service().unwrap().operation, "install");
        assert!(task.target.is_none());
    }

    #[test]
    fn mismatched_accessor_is_explicit() {
        let task = Task::executor(ExecutorCommand::new("drain"));
        let err = task.as_service().unwrap_err();
        match err {
            Error::TaskKindMismatch { expected, actual } => {
                assert_eq!(expected, "service");
                assert_eq!(actual, "executor");
            }
            other => panic!("expected kind mismatch, got {other}"),
        }
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let task = Task::service(
            ServiceCommand::new("install").with_parameter("replicas", serde_json::json!(3)),
        );
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"kind\":\"service\""));
        assert!(json.contains("\"replicas\":3"));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task, back);
    }

    #[test]
    fn stamped_target_roundtrips() {
        let mut task = Task::executor(ExecutorCommand::new("start"));
        task.target = Some(EntityId::parse("grid://a/services/web").unwrap());

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target, task.target);
    }
}
