//! # gridlink-client
//!
//! Orchestration client for the Gridlink service grid.
//!
//! This crate implements the control-plane surface an orchestrator drives:
//!
//! - **Typed State Exchange**: Conditional reads and writes of orchestrator
//!   and executor state documents over the versioned state store
//! - **State Poller**: Convergence loop returning the freshest observable
//!   state, with caller-supplied interval, deadline, and cancellation
//! - **Task Stream**: Append-only dispatch with globally addressable task
//!   records and point lookup
//! - **Orchestration Client**: The facade composing the three
//!
//! ## Guarantees
//!
//! - **Lost updates are impossible**: every state write is a compare-and-
//!   swap against the token the writer last observed
//! - **Task identifiers are permanent**: one append, one identifier, the
//!   same record for the lifetime of the stream
//! - **No hidden policy**: the client performs no retries, no backoff, and
//!   no caching; conflicts and timeouts surface distinctly to the caller
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gridlink_client::prelude::*;
//! use gridlink_core::{EntityId, MemoryStateBackend};
//!
//! # async fn example() -> gridlink_client::error::Result<()> {
//! let client = OrchestrationClient::connect(
//!     Arc::new(MemoryStateBackend::new()),
//!     Arc::new(InMemoryTaskStream::new()),
//! );
//!
//! let service = EntityId::parse("grid://cluster-a/services/web")?;
//! client.create_service(&service).await?;
//!
//! let task = Task::service(ServiceCommand::new("install"));
//! let task_id = client.add_service_task(&service, task).await?;
//! let resolved = client.get_task(&task_id).await?;
//! assert_eq!(resolved.target, Some(service));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod poller;
pub mod state;
pub mod store;
pub mod stream;
pub mod task;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::OrchestrationClient;
    pub use crate::error::{Error, Result};
    pub use crate::poller::{PollOptions, StatePoller};
    pub use crate::state::{ServiceOrchestratorState, StateDocument, TaskExecutorState};
    pub use crate::store::{StateReader, StateWriter};
    pub use crate::stream::{InMemoryTaskStream, TaskConsumer, TaskProducer, TaskStreamBackend};
    pub use crate::task::{ExecutorCommand, ServiceCommand, Task, TaskPayload};
}

// Re-export key types at crate root for ergonomics
pub use client::OrchestrationClient;
pub use error::{Error, Result};
pub use poller::{PollOptions, StatePoller};
pub use state::{ServiceOrchestratorState, StateDocument, TaskExecutorState};
pub use store::{StateReader, StateWriter};
pub use stream::{InMemoryTaskStream, TaskConsumer, TaskProducer, TaskStreamBackend};
pub use task::{ExecutorCommand, ServiceCommand, Task, TaskPayload};
