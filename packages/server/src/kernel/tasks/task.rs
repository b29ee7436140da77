//! Task record and its SQL.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Task lifecycle status.
///
/// `failed` is terminal: handler errors are not re-run automatically. A
/// `running` task whose lease expires is claimable again until its attempts
/// run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// A queued background task.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Task {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,
    pub task_type: String,
    #[builder(default, setter(strip_option))]
    pub args: Option<serde_json::Value>,
    #[builder(default = TaskStatus::Pending)]
    pub status: TaskStatus,
    #[builder(default, setter(strip_option))]
    pub reference_id: Option<Uuid>,
    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,
    #[builder(default, setter(strip_option))]
    pub next_run_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub last_run_at: Option<DateTime<Utc>>,
    #[builder(default = 0)]
    pub attempt: i32,
    #[builder(default = 3)]
    pub max_attempts: i32,
    #[builder(default, setter(strip_option))]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub worker_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub error: Option<String>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

// ===== SQL Queries - ALL queries must be in this module =====

impl Task {
    pub async fn insert(&self, pool: &PgPool) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                id, task_type, args, status, reference_id, idempotency_key,
                next_run_at, last_run_at, attempt, max_attempts,
                lease_expires_at, worker_id, error, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.task_type)
        .bind(&self.args)
        .bind(self.status)
        .bind(self.reference_id)
        .bind(&self.idempotency_key)
        .bind(self.next_run_at)
        .bind(self.last_run_at)
        .bind(self.attempt)
        .bind(self.max_attempts)
        .bind(self.lease_expires_at)
        .bind(&self.worker_id)
        .bind(&self.error)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(task)
    }

    pub async fn find_by_reference_id(reference_id: Uuid, pool: &PgPool) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE reference_id = $1 ORDER BY created_at",
        )
        .bind(reference_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Claim up to `limit` ready tasks for a worker.
    ///
    /// Ready means pending and due, or running with an expired lease and
    /// attempts remaining (a worker died mid-task). `FOR UPDATE SKIP LOCKED`
    /// keeps concurrent workers from claiming the same rows.
    pub async fn claim_batch(
        limit: i64,
        worker_id: &str,
        lease_ms: i64,
        pool: &PgPool,
    ) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            WITH next_tasks AS (
                SELECT id FROM tasks
                WHERE (status = 'pending' AND (next_run_at IS NULL OR next_run_at <= NOW()))
                   OR (status = 'running' AND lease_expires_at < NOW() AND attempt < max_attempts)
                ORDER BY COALESCE(next_run_at, created_at)
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE tasks
            SET status = 'running',
                attempt = attempt + 1,
                last_run_at = NOW(),
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                worker_id = $3,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_tasks)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(lease_ms.to_string())
        .bind(worker_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }
}
