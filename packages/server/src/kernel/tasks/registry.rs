//! Task registry for deserializing and executing tasks.
//!
//! The registry maps task type strings (e.g., "process_workflow") to:
//! - Deserializers that reconstruct typed command structs from JSON
//! - Handlers that execute the task logic
//!
//! This allows the TaskRunner to claim tasks from the database and dispatch
//! them to the appropriate domain handlers without knowing the concrete
//! types.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use super::queue::{ClaimedTask, TaskMeta};
use crate::kernel::ServerDeps;

/// Type alias for the async handler function.
///
/// Handlers take the raw args plus ServerDeps and return a Result. The
/// typed command is reconstructed inside the closure built at registration.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<ServerDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Registration entry containing the handler.
struct TaskRegistration {
    handler: BoxedHandler,
}

/// Registry that maps task type strings to handlers.
///
/// Each domain registers its task types at startup. When the TaskRunner
/// claims a task, it uses this registry to deserialize and execute the
/// task in one step.
///
/// # Example
///
/// ```ignore
/// let mut registry = TaskRegistry::new();
///
/// registry.register::<ProcessWorkflowTask, _, _>(
///     ProcessWorkflowTask::TASK_TYPE,
///     |task, deps| async move {
///         actions::process_workflow(task.job_id, &deps).await
///     },
/// );
///
/// // Later, in TaskRunner
/// registry.execute(&claimed_task, deps.clone()).await?;
/// ```
#[derive(Default)]
pub struct TaskRegistry {
    registrations: HashMap<&'static str, TaskRegistration>,
}

impl TaskRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Register a task type with its handler.
    pub fn register<T, F, Fut>(&mut self, task_type: &'static str, handler: F)
    where
        T: TaskMeta + DeserializeOwned + Send + Sync + 'static,
        F: Fn(T, Arc<ServerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed_handler: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let task: T = serde_json::from_value(value)
                    .map_err(|e| anyhow!("Failed to deserialize {}: {}", task_type, e))?;
                handler(task, deps).await
            })
        });

        self.registrations.insert(
            task_type,
            TaskRegistration {
                handler: boxed_handler,
            },
        );
    }

    /// Execute a claimed task using its registered handler.
    ///
    /// Returns an error if:
    /// - The task type is not registered
    /// - The JSON payload cannot be deserialized
    /// - The handler returns an error
    pub async fn execute(&self, task: &ClaimedTask, deps: Arc<ServerDeps>) -> Result<()> {
        let task_type = task.task_type();
        let registration = self
            .registrations
            .get(task_type)
            .ok_or_else(|| anyhow!("Unknown task type: {}", task_type))?;

        let args = task
            .task
            .args
            .clone()
            .ok_or_else(|| anyhow!("Task {} has no args", task.id))?;

        (registration.handler)(args, deps).await
    }

    /// Check if a task type is registered.
    pub fn is_registered(&self, task_type: &str) -> bool {
        self.registrations.contains_key(task_type)
    }

    /// Get all registered task types.
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.registrations.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedTaskRegistry = Arc<TaskRegistry>;
