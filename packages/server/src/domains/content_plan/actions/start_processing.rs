use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::domains::content_plan::models::{Job, JobStatus};
use crate::domains::content_plan::tasks::ProcessWorkflowTask;
use crate::kernel::tasks::TaskQueueExt;
use crate::kernel::ServerDeps;

/// Outcome of a request to start processing a job.
#[derive(Debug)]
pub enum StartOutcome {
    /// The job was moved to `processing` and the pipeline task enqueued.
    Started,
    /// The job had already left `initialized`; carries its current status.
    AlreadyStarted { status: String },
}

/// Kick off the background pipeline for an initialized job.
///
/// Returns `None` when the job does not exist. Starting is only valid from
/// the `initialized` status; any other status reports `AlreadyStarted`
/// without touching the job.
pub async fn start_processing(deps: &ServerDeps, job_id: Uuid) -> Result<Option<StartOutcome>> {
    let pool = &deps.db_pool;

    let Some(job) = Job::find_by_id(job_id, pool).await? else {
        return Ok(None);
    };
    if job.status != JobStatus::Initialized.to_string() {
        return Ok(Some(StartOutcome::AlreadyStarted { status: job.status }));
    }

    Job::set_status(job_id, JobStatus::Processing, pool).await?;
    Job::append_message(job_id, "Starting content research workflow...", pool).await?;

    let enqueued = deps.tasks.enqueue(ProcessWorkflowTask { job_id }).await?;
    info!(
        job_id = %job_id,
        task_id = %enqueued.task_id(),
        newly_created = enqueued.is_created(),
        "enqueued workflow processing"
    );

    Ok(Some(StartOutcome::Started))
}
