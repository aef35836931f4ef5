//! # gridlink-core
//!
//! Core primitives for the Gridlink service-grid control plane.
//!
//! This crate provides the foundational types and contracts shared by every
//! Gridlink component:
//!
//! - **Entity Identifiers**: Globally addressable locators for services,
//!   executors, and tasks
//! - **Versioned State Store**: Optimistically-concurrent document storage
//!   with opaque version tokens
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Structured logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `gridlink-core` defines the contracts the orchestration client depends
//! on; it carries no orchestration policy of its own. Transport backends
//! implement [`store::StateBackend`] against whatever wire they speak; the
//! in-memory backend here exists for tests and single-process deployments.
//!
//! ## Example
//!
//! ```rust
//! use gridlink_core::prelude::*;
//!
//! let service: EntityId = "grid://cluster-a/services/web".parse().unwrap();
//! let backend = MemoryStateBackend::new();
//! # let _ = (service, backend);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use gridlink_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::EntityId;
    pub use crate::store::{
        MemoryStateBackend, PutResult, Snapshot, StateBackend, VersionToken,
    };
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::EntityId;
pub use observability::{init_logging, LogFormat};
pub use store::{MemoryStateBackend, PutResult, Snapshot, StateBackend, VersionToken};
