//! PostgreSQL-backed task queue.
//!
//! Tasks live in the same database as the domain data, so enqueueing can
//! share transactions with domain writes and no extra broker is needed.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::task::Task;

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone)]
pub enum EnqueueResult {
    /// Task was enqueued, returns new task ID
    Created(Uuid),
    /// A live task with the same idempotency key exists, returns its ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    /// Get the task ID regardless of whether it was created or duplicate
    pub fn task_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    /// Returns true if this was a newly created task
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// A claimed task ready for execution.
#[derive(Debug)]
pub struct ClaimedTask {
    /// The task ID
    pub id: Uuid,
    /// The raw task record
    pub task: Task,
}

impl ClaimedTask {
    /// Deserialize the command payload.
    pub fn deserialize<C: DeserializeOwned>(&self) -> Result<C> {
        let args = self
            .task
            .args
            .as_ref()
            .ok_or_else(|| anyhow!("task {} has no args", self.id))?;
        serde_json::from_value(args.clone())
            .map_err(|e| anyhow!("failed to deserialize command: {}", e))
    }

    /// Get the command type (task_type)
    pub fn task_type(&self) -> &str {
        &self.task.task_type
    }
}

/// Metadata for command serialization.
///
/// Command structs implement this trait to provide type information and
/// optional idempotency keys.
pub trait TaskMeta {
    /// The command type name (used as task_type).
    fn task_type(&self) -> &'static str;

    /// Optional idempotency key.
    ///
    /// If provided, ensures only one pending/running task exists with this
    /// key.
    fn idempotency_key(&self) -> Option<String> {
        None
    }

    /// Optional reference to the domain entity this task operates on.
    fn reference_id(&self) -> Option<Uuid> {
        None
    }

    /// Maximum claim attempts (covers lease-expiry reclaims after crashes).
    fn max_attempts(&self) -> i32 {
        3
    }
}

/// Everything the queue needs to persist one command.
///
/// Built from a [`TaskMeta`] command via [`TaskSpec::from_command`]; keeps
/// the [`TaskQueue`] trait object-safe while callers still enqueue typed
/// commands through [`TaskQueueExt::enqueue`].
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub task_type: &'static str,
    pub args: serde_json::Value,
    pub reference_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub max_attempts: i32,
}

impl TaskSpec {
    pub fn from_command<C>(command: &C) -> Result<Self>
    where
        C: Serialize + TaskMeta,
    {
        Ok(Self {
            task_type: command.task_type(),
            args: serde_json::to_value(command)?,
            reference_id: command.reference_id(),
            idempotency_key: command.idempotency_key(),
            max_attempts: command.max_attempts(),
        })
    }
}

/// Trait for task queue operations.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task for execution.
    ///
    /// If `spec` carries an idempotency key and a matching pending/running
    /// task exists, returns `EnqueueResult::Duplicate` with the existing ID.
    async fn enqueue_spec(&self, spec: TaskSpec) -> Result<EnqueueResult>;

    /// Claim up to `limit` tasks for processing.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` for concurrent-safe claiming and also
    /// reclaims running tasks with expired leases.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedTask>>;

    /// Mark a task as successfully completed.
    async fn mark_succeeded(&self, task_id: Uuid) -> Result<()>;

    /// Mark a task as failed. Terminal: failed tasks are not re-run.
    async fn mark_failed(&self, task_id: Uuid, error: &str) -> Result<()>;
}

/// Typed enqueue sugar over any [`TaskQueue`], including trait objects.
#[async_trait]
pub trait TaskQueueExt {
    async fn enqueue<C>(&self, command: C) -> Result<EnqueueResult>
    where
        C: Serialize + TaskMeta + Send + Sync;
}

#[async_trait]
impl<Q: TaskQueue + ?Sized> TaskQueueExt for Q {
    async fn enqueue<C>(&self, command: C) -> Result<EnqueueResult>
    where
        C: Serialize + TaskMeta + Send + Sync,
    {
        let spec = TaskSpec::from_command(&command)?;
        self.enqueue_spec(spec).await
    }
}

/// PostgreSQL-backed task queue implementation.
pub struct PostgresTaskQueue {
    pool: PgPool,
    default_lease_ms: i64,
}

impl PostgresTaskQueue {
    /// Create a new PostgreSQL task queue.
    ///
    /// The default lease covers the slowest expected pipeline run; an
    /// expired lease means the worker died and the task may be reclaimed.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            default_lease_ms: 3_600_000, // 1 hour
        }
    }

    /// Create with a custom lease duration.
    pub fn with_lease_duration(pool: PgPool, lease_ms: i64) -> Self {
        Self {
            pool,
            default_lease_ms: lease_ms,
        }
    }

    /// Get the default lease duration in milliseconds.
    pub fn default_lease_ms(&self) -> i64 {
        self.default_lease_ms
    }

    /// Check if a live task with the given idempotency key already exists.
    pub async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE idempotency_key = $1
              AND status IN ('pending', 'running')
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }
}

#[async_trait]
impl TaskQueue for PostgresTaskQueue {
    async fn enqueue_spec(&self, spec: TaskSpec) -> Result<EnqueueResult> {
        if let Some(key) = &spec.idempotency_key {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let mut task = Task::builder()
            .task_type(spec.task_type)
            .args(spec.args)
            .max_attempts(spec.max_attempts)
            .build();
        if let Some(reference_id) = spec.reference_id {
            task.reference_id = Some(reference_id);
        }
        if let Some(key) = spec.idempotency_key {
            task.idempotency_key = Some(key);
        }

        let inserted = task.insert(&self.pool).await?;

        Ok(EnqueueResult::Created(inserted.id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedTask>> {
        let tasks =
            Task::claim_batch(limit, worker_id, self.default_lease_ms, &self.pool).await?;

        Ok(tasks
            .into_iter()
            .map(|task| ClaimedTask { id: task.id, task })
            .collect())
    }

    async fn mark_succeeded(&self, task_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'succeeded',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, task_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'failed',
                error = $1,
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(error)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
