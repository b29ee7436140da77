//! Integration tests for the Postgres task queue and runner.
//!
//! Covers enqueue with idempotency-key dedupe, claim semantics (once per
//! lease, reclaim after expiry, attempts cap), terminal failure, and the
//! runner executing registered handlers end to end.
//!
//! Claims scan the whole tasks table, so every test here runs against its
//! own isolated database instead of the shared one.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TestHarness;
use serde::{Deserialize, Serialize};
use server_core::domains::content_plan::tasks::{
    register_content_plan_tasks, ProcessWorkflowTask,
};
use server_core::kernel::tasks::{
    PostgresTaskQueue, Task, TaskMeta, TaskQueue, TaskQueueExt, TaskRegistry, TaskRunner,
    TaskRunnerConfig, TaskStatus,
};
use server_core::kernel::TestDependencies;
use sqlx::PgPool;
use test_context::test_context;
use uuid::Uuid;

/// Backdate a task's lease so it reads as expired.
async fn expire_lease(pool: &PgPool, task_id: Uuid) {
    sqlx::query("UPDATE tasks SET lease_expires_at = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await
        .expect("Failed to backdate lease");
}

/// Poll until the task reaches the wanted status or the deadline passes.
async fn wait_for_status(pool: &PgPool, task_id: Uuid, wanted: TaskStatus) -> Task {
    for _ in 0..100 {
        let task = Task::find_by_id(task_id, pool)
            .await
            .expect("Failed to load task");
        if task.status == wanted {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("task {} never reached {:?}", task_id, wanted);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_enqueue_persists_command_payload(ctx: &TestHarness) {
    let pool = ctx.isolated_db().await.expect("Failed to isolate db");
    let queue = PostgresTaskQueue::new(pool.clone());
    let job_id = Uuid::new_v4();

    let result = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to enqueue");
    assert!(result.is_created());

    let task = Task::find_by_id(result.task_id(), &pool)
        .await
        .expect("Failed to load task");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.task_type, "process_workflow");
    assert_eq!(task.reference_id, Some(job_id));
    assert_eq!(
        task.idempotency_key.as_deref(),
        Some(format!("process_workflow:{}", job_id).as_str())
    );
    assert_eq!(task.args.unwrap()["job_id"], serde_json::json!(job_id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_idempotency_key_dedupes_live_tasks(ctx: &TestHarness) {
    let pool = ctx.isolated_db().await.expect("Failed to isolate db");
    let queue = PostgresTaskQueue::new(pool.clone());
    let job_id = Uuid::new_v4();

    let first = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to enqueue");
    let second = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to enqueue duplicate");

    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(first.task_id(), second.task_id());

    // A finished task no longer blocks the key.
    queue
        .mark_succeeded(first.task_id())
        .await
        .expect("Failed to mark succeeded");
    let third = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to re-enqueue");
    assert!(third.is_created());
    assert_ne!(third.task_id(), first.task_id());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_claim_takes_a_task_once_per_lease(ctx: &TestHarness) {
    let pool = ctx.isolated_db().await.expect("Failed to isolate db");
    let queue = PostgresTaskQueue::new(pool.clone());
    let job_id = Uuid::new_v4();

    let enqueued = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to enqueue");

    let claimed = queue.claim("worker-a", 10).await.expect("Failed to claim");
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, enqueued.task_id());
    assert_eq!(claimed[0].task.status, TaskStatus::Running);
    assert_eq!(claimed[0].task.attempt, 1);
    assert_eq!(claimed[0].task.worker_id.as_deref(), Some("worker-a"));

    // The live lease hides the task from other workers.
    let reclaimed = queue.claim("worker-b", 10).await.expect("Failed to claim");
    assert!(reclaimed.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_expired_lease_reclaims_until_attempts_run_out(ctx: &TestHarness) {
    let pool = ctx.isolated_db().await.expect("Failed to isolate db");
    let queue = PostgresTaskQueue::new(pool.clone());
    let job_id = Uuid::new_v4();
    let task_id = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to enqueue")
        .task_id();

    // Attempts 1 through 3: claim, then die (lease expires).
    for attempt in 1..=3 {
        let claimed = queue.claim("worker", 10).await.expect("Failed to claim");
        assert_eq!(claimed.len(), 1, "attempt {} should be claimable", attempt);
        assert_eq!(claimed[0].id, task_id);
        assert_eq!(claimed[0].task.attempt, attempt);
        expire_lease(&pool, task_id).await;
    }

    // Attempts are spent; the task stays unclaimed even with a dead lease.
    let claimed = queue.claim("worker", 10).await.expect("Failed to claim");
    assert!(claimed.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_mark_failed_is_terminal(ctx: &TestHarness) {
    let pool = ctx.isolated_db().await.expect("Failed to isolate db");
    let queue = PostgresTaskQueue::new(pool.clone());
    let job_id = Uuid::new_v4();
    let task_id = queue
        .enqueue(ProcessWorkflowTask { job_id })
        .await
        .expect("Failed to enqueue")
        .task_id();

    let claimed = queue.claim("worker", 10).await.expect("Failed to claim");
    assert_eq!(claimed.len(), 1);

    queue
        .mark_failed(task_id, "handler exploded")
        .await
        .expect("Failed to mark failed");

    let task = Task::find_by_id(task_id, &pool)
        .await
        .expect("Failed to load task");
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("handler exploded"));

    // Failed tasks are never reclaimed.
    let claimed = queue.claim("worker", 10).await.expect("Failed to claim");
    assert!(claimed.is_empty());
}

// ===== Runner + registry end to end

#[derive(Debug, Serialize, Deserialize)]
struct ExplodingTask {
    marker: Uuid,
}

impl TaskMeta for ExplodingTask {
    fn task_type(&self) -> &'static str {
        "exploding"
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_runner_executes_registered_handlers(ctx: &TestHarness) {
    let pool = ctx.isolated_db().await.expect("Failed to isolate db");
    let deps = TestDependencies::default();
    let server_deps = Arc::new(deps.server_deps(pool.clone()));
    let queue: Arc<PostgresTaskQueue> = Arc::new(PostgresTaskQueue::new(pool.clone()));

    let mut registry = TaskRegistry::new();
    register_content_plan_tasks(&mut registry);
    registry.register(
        "exploding",
        |_task: ExplodingTask, _deps: Arc<server_core::kernel::ServerDeps>| async move {
            anyhow::bail!("boom")
        },
    );

    let config = TaskRunnerConfig {
        batch_size: 10,
        poll_interval: Duration::from_millis(50),
        worker_id: format!("test-runner-{}", Uuid::new_v4()),
    };
    let runner = TaskRunner::with_config(
        queue.clone(),
        Arc::new(registry),
        server_deps.clone(),
        config,
    );
    let shutdown = runner.shutdown_handle();
    let runner_handle = tokio::spawn(runner.run());

    // A workflow task for a missing job is a no-op success.
    let ok_task = queue
        .enqueue(ProcessWorkflowTask {
            job_id: Uuid::new_v4(),
        })
        .await
        .expect("Failed to enqueue")
        .task_id();
    let done = wait_for_status(&pool, ok_task, TaskStatus::Succeeded).await;
    assert!(done.error.is_none());

    // A handler error lands as a terminal failure with its message.
    let bad_task = queue
        .enqueue(ExplodingTask {
            marker: Uuid::new_v4(),
        })
        .await
        .expect("Failed to enqueue")
        .task_id();
    let failed = wait_for_status(&pool, bad_task, TaskStatus::Failed).await;
    assert_eq!(failed.error.as_deref(), Some("boom"));

    shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    let _ = runner_handle.await;
}
