//! Task runner service for processing background tasks.
//!
//! The `TaskRunner` is a background service that:
//! - Polls the database for ready tasks
//! - Deserializes and executes tasks using the registry
//! - Handles status updates (succeeded/failed)
//!
//! # Architecture
//!
//! ```text
//! TaskRunner
//!     │
//!     ├─► Poll DB (claim tasks via TaskQueue)
//!     ├─► Execute via TaskRegistry (deserialize + call handler)
//!     └─► Mark succeeded/failed (failure is terminal)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(build_task_registry());
//! let runner = TaskRunner::new(task_queue, registry, deps);
//!
//! // Spawn as background task
//! tokio::spawn(runner.run());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::TaskQueue;
use super::registry::SharedTaskRegistry;
use crate::kernel::ServerDeps;

/// Configuration for the task runner.
#[derive(Debug, Clone)]
pub struct TaskRunnerConfig {
    /// Maximum number of tasks to claim at once
    pub batch_size: i64,
    /// How long to wait when no tasks are available
    pub poll_interval: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for TaskRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            worker_id: format!("runner-{}", Uuid::new_v4()),
        }
    }
}

impl TaskRunnerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// Background service that processes tasks from the queue.
///
/// The runner polls for tasks, executes them via the registry, and updates
/// their status. A handler error marks the task failed permanently; only a
/// crashed worker (expired lease) makes a task claimable again.
pub struct TaskRunner {
    task_queue: Arc<dyn TaskQueue>,
    registry: SharedTaskRegistry,
    deps: Arc<ServerDeps>,
    config: TaskRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl TaskRunner {
    /// Create a new task runner.
    pub fn new(
        task_queue: Arc<dyn TaskQueue>,
        registry: SharedTaskRegistry,
        deps: Arc<ServerDeps>,
    ) -> Self {
        Self {
            task_queue,
            registry,
            deps,
            config: TaskRunnerConfig::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(
        task_queue: Arc<dyn TaskQueue>,
        registry: SharedTaskRegistry,
        deps: Arc<ServerDeps>,
        config: TaskRunnerConfig,
    ) -> Self {
        Self {
            task_queue,
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    ///
    /// Call `store(true, Ordering::SeqCst)` on the returned Arc to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Request shutdown of the runner.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the task runner until shutdown is requested.
    ///
    /// This is the main loop that polls for tasks and executes them.
    /// Call `request_shutdown()` to stop the runner gracefully.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "task runner starting"
        );

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            let tasks = match self
                .task_queue
                .claim(&self.config.worker_id, self.config.batch_size)
                .await
            {
                Ok(tasks) => tasks,
                Err(e) => {
                    error!(error = %e, "failed to claim tasks");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            if tasks.is_empty() {
                tokio::time::sleep(self.config.poll_interval).await;
                continue;
            }

            debug!(count = tasks.len(), "claimed tasks");

            // Process tasks sequentially; cross-job parallelism comes from
            // running multiple workers.
            for task in tasks {
                if self.is_shutdown_requested() {
                    break;
                }

                let task_id = task.id;
                let task_type = task.task_type().to_string();

                debug!(task_id = %task_id, task_type = %task_type, "executing task");

                let result = self.registry.execute(&task, self.deps.clone()).await;

                match result {
                    Ok(()) => {
                        info!(task_id = %task_id, task_type = %task_type, "task succeeded");
                        if let Err(e) = self.task_queue.mark_succeeded(task_id).await {
                            error!(task_id = %task_id, error = %e, "failed to mark task as succeeded");
                        }
                    }
                    Err(e) => {
                        warn!(task_id = %task_id, task_type = %task_type, error = %e, "task failed");
                        if let Err(mark_err) =
                            self.task_queue.mark_failed(task_id, &e.to_string()).await
                        {
                            error!(task_id = %task_id, error = %mark_err, "failed to mark task as failed");
                        }
                    }
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "task runner stopped");
        Ok(())
    }

    /// Run until a shutdown signal is received.
    ///
    /// Convenience method that listens for Ctrl+C.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }
}
