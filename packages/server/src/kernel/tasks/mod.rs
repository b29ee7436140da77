//! Task infrastructure for background command execution.
//!
//! This module provides the kernel-level infrastructure for task execution:
//! - [`PostgresTaskQueue`] - Database-backed task queue
//! - [`TaskRegistry`] - Maps task type strings to typed handlers
//! - [`TaskRunner`] - Long-running service that polls and executes tasks
//! - [`Task`] - Task record with its SQL
//!
//! # Architecture
//!
//! ```text
//! Action calls deps.tasks.enqueue(cmd)
//!     │
//!     └─► Insert to tasks table (idempotency-key dedupe, no broker)
//!
//! TaskRunner
//!     │
//!     ├─► Poll DB (claim tasks, FOR UPDATE SKIP LOCKED + lease recovery)
//!     ├─► Deserialize command from JSON (TaskRegistry)
//!     ├─► Handler(command, deps)
//!     └─► Mark succeeded/failed
//! ```
//!
//! Domain-specific command structs and handlers live in their domains; this
//! module only provides the plumbing.

mod queue;
mod registry;
mod runner;
mod task;

pub use queue::{
    ClaimedTask, EnqueueResult, PostgresTaskQueue, TaskMeta, TaskQueue, TaskQueueExt, TaskSpec,
};
pub use registry::{SharedTaskRegistry, TaskRegistry};
pub use runner::{TaskRunner, TaskRunnerConfig};
pub use task::{Task, TaskStatus};
