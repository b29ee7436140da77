use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domains::content_plan::workflow::WorkflowPhase;
use crate::kernel::traits::SearchResult;

/// Job - one content plan workflow instance.
///
/// The row is the workflow's single source of truth: status, progress, the
/// opaque machine snapshot, the append-only message feed, and every artifact
/// the pipeline produces. Background workers and the web layer only ever
/// coordinate through it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,

    pub status: String, // 'initialized', 'processing', 'awaiting_selection', 'completed', 'error'
    pub current_phase: String,

    pub website_url: String,
    pub keywords: Value, // JSONB array of strings

    // Continuation claim: at most one worker holds a live claim.
    pub in_progress: bool,
    pub claim_expires_at: Option<DateTime<Utc>>,

    pub progress: i32,
    pub workflow_data: Value,
    pub messages: Value, // JSONB array of {text, timestamp}
    pub error: Option<String>,

    // Gathered inputs
    pub website_content: Option<String>,
    pub website_content_length: Option<i32>,
    pub search_results: Option<Value>,
    pub search_results_count: Option<i32>,

    // Generated artifacts
    pub brand_brief: Option<String>,
    pub search_analysis: Option<String>,
    pub content_cluster: Option<String>,
    pub article_ideas: Option<String>,
    pub final_plan: Option<String>,

    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Initialized,
    Processing,
    AwaitingSelection,
    Completed,
    Error,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Initialized => write!(f, "initialized"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::AwaitingSelection => write!(f, "awaiting_selection"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initialized" => Ok(JobStatus::Initialized),
            "processing" => Ok(JobStatus::Processing),
            "awaiting_selection" => Ok(JobStatus::AwaitingSelection),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            _ => anyhow::bail!("Invalid job status: {}", s),
        }
    }
}

/// One entry in the job's user-visible progress feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl JobMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

impl Job {
    /// Keywords as a plain string list. Non-string entries are skipped.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The message feed, oldest first. Malformed entries are skipped.
    pub fn message_list(&self) -> Vec<JobMessage> {
        self.messages
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The persisted deduplicated search results, if the step has run.
    pub fn search_result_list(&self) -> Vec<SearchResult> {
        self.search_results
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    // ===== SQL Queries

    /// Create a job in `initialized` with a fresh machine snapshot and an
    /// opening message.
    pub async fn create(
        website_url: String,
        keywords: Vec<String>,
        snapshot: Value,
        opening_message: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, website_url, keywords, status, current_phase, workflow_data, messages)
            VALUES ($1, $2, $3, 'initialized', $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(website_url)
        .bind(json!(keywords))
        .bind(WorkflowPhase::Initialization.to_string())
        .bind(snapshot)
        .bind(json!([JobMessage::new(opening_message)]))
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(job)
    }

    /// All jobs, newest first.
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let jobs = sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(jobs)
    }

    /// Row-locked read for the selection transaction.
    pub async fn find_by_id_for_update(id: Uuid, conn: &mut PgConnection) -> Result<Option<Self>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(job)
    }

    pub async fn set_status(id: Uuid, status: JobStatus, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Progress only moves forward; a re-run reporting a lower value is a
    /// no-op.
    pub async fn set_progress(id: Uuid, progress: i32, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET progress = GREATEST(progress, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(progress)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append one entry to the message feed. Atomic JSONB concatenation, so
    /// concurrent appenders cannot lose each other's entries.
    pub async fn append_message(id: Uuid, text: &str, pool: &PgPool) -> Result<()> {
        tracing::debug!(job_id = %id, message = text, "job message");
        sqlx::query("UPDATE jobs SET messages = messages || $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(serde_json::to_value(JobMessage::new(text))?)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn store_website_content(id: Uuid, content: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET website_content = $2, website_content_length = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(content.chars().count() as i32)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn store_search_results(
        id: Uuid,
        results: &[SearchResult],
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET search_results = $2, search_results_count = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(serde_json::to_value(results)?)
        .bind(results.len() as i32)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn store_brand_brief(id: Uuid, brand_brief: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET brand_brief = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(brand_brief)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn store_search_analysis(id: Uuid, search_analysis: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET search_analysis = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(search_analysis)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn store_content_cluster(id: Uuid, content_cluster: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET content_cluster = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(content_cluster)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn store_article_ideas(id: Uuid, article_ideas: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET article_ideas = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(article_ideas)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn store_final_plan(id: Uuid, final_plan: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET final_plan = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(final_plan)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Persist the machine's position: phase column + opaque snapshot.
    pub async fn save_workflow_state(
        id: Uuid,
        phase: WorkflowPhase,
        snapshot: &Value,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET current_phase = $2, workflow_data = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(phase.to_string())
        .bind(snapshot)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Pause for user input: phase, snapshot, and status land together.
    pub async fn mark_awaiting_selection(
        id: Uuid,
        phase: WorkflowPhase,
        snapshot: &Value,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'awaiting_selection', current_phase = $2, workflow_data = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(phase.to_string())
        .bind(snapshot)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_completed(
        id: Uuid,
        phase: WorkflowPhase,
        snapshot: &Value,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', current_phase = $2, workflow_data = $3,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(phase.to_string())
        .bind(snapshot)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_error(id: Uuid, error: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'error', error = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(error)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Atomically claim the job for the continuation. True iff this caller
    /// won: the single conditional UPDATE either flips the flag or matches
    /// nothing, so two racing workers can never both see a win. An expired
    /// lease counts as unclaimed.
    pub async fn claim(id: Uuid, ttl_seconds: i64, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET in_progress = TRUE,
                claim_expires_at = NOW() + ($2 || ' seconds')::INTERVAL,
                updated_at = NOW()
            WHERE id = $1
              AND (in_progress = FALSE OR claim_expires_at < NOW())
            "#,
        )
        .bind(id)
        .bind(ttl_seconds.to_string())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn release_claim(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET in_progress = FALSE, claim_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Clear claims whose lease ran out (worker died mid-continuation).
    /// Returns how many were cleared.
    pub async fn reap_expired_claims(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET in_progress = FALSE, claim_expires_at = NULL, updated_at = NOW()
            WHERE in_progress AND claim_expires_at < NOW()
            "#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Commit an accepted theme selection: snapshot (now carrying the
    /// selection), status back to `processing`, and the confirmation
    /// message, in one statement inside the caller's transaction.
    pub async fn record_selection(
        id: Uuid,
        snapshot: &Value,
        message: &str,
        conn: &mut PgConnection,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'processing', workflow_data = $2, messages = messages || $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(snapshot)
        .bind(serde_json::to_value(JobMessage::new(message))?)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete every job that never completed (themes cascade). Returns how
    /// many were deleted.
    pub async fn delete_incomplete(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE status != 'completed'")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
