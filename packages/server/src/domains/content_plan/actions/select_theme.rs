use anyhow::{anyhow, Context, Result};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domains::content_plan::models::{Job, JobStatus, Theme};
use crate::domains::content_plan::tasks::ContinueWorkflowTask;
use crate::domains::content_plan::workflow::{WorkflowError, WorkflowState};
use crate::kernel::tasks::TaskQueueExt;
use crate::kernel::ServerDeps;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Job not found")]
    NotFound,
    #[error("Job is already being processed or not awaiting selection")]
    NotAwaitingSelection,
    #[error("Theme already selected")]
    AlreadySelected,
    #[error("Invalid theme number")]
    InvalidThemeNumber,
    #[error("Theme number out of range")]
    OutOfRange,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Record the user's theme choice and hand the job to the continuation
/// pipeline.
///
/// All checks and writes happen in one transaction holding a row lock on
/// the job, so two concurrent selections serialize: the first commits, the
/// second sees the selected theme and is rejected. Rejections roll back
/// without touching the job. The continuation task is enqueued only after
/// the transaction commits.
pub async fn select_theme(
    deps: &ServerDeps,
    job_id: Uuid,
    theme_number: usize,
) -> Result<Theme, SelectionError> {
    let mut tx = deps
        .db_pool
        .begin()
        .await
        .context("begin theme selection transaction")?;

    let Some(job) = Job::find_by_id_for_update(job_id, &mut tx).await? else {
        return Err(SelectionError::NotFound);
    };
    if job.in_progress || job.status != JobStatus::AwaitingSelection.to_string() {
        return Err(SelectionError::NotAwaitingSelection);
    }
    if Theme::has_selected_in_tx(job_id, &mut tx).await? {
        return Err(SelectionError::AlreadySelected);
    }

    let mut machine = WorkflowState::load_state(&job.workflow_data)
        .map_err(|e| SelectionError::Internal(e.into()))?;

    let themes = Theme::find_for_job_in_tx(job_id, &mut tx).await?;
    let titles: Vec<String> = themes.iter().map(|t| t.title.clone()).collect();
    machine
        .process_theme_selection(theme_number, &titles)
        .map_err(|e| match e {
            WorkflowError::OutOfRange { .. } => SelectionError::OutOfRange,
            other => SelectionError::Internal(other.into()),
        })?;

    let Some(theme) = Theme::select_in_tx(job_id, theme_number as i32, &mut tx).await? else {
        // The titles above came from this transaction, so the row exists.
        return Err(SelectionError::Internal(anyhow!(
            "theme {} vanished during selection for job {}",
            theme_number,
            job_id
        )));
    };

    Job::record_selection(
        job_id,
        &machine.save_state(),
        &format!("Selected theme: {}", theme.title),
        &mut tx,
    )
    .await?;

    tx.commit()
        .await
        .context("commit theme selection transaction")?;

    let enqueued = deps
        .tasks
        .enqueue(ContinueWorkflowTask { job_id })
        .await
        .context("enqueue continuation after theme selection")?;
    info!(
        job_id = %job_id,
        theme_position = theme.position,
        theme_title = %theme.title,
        task_id = %enqueued.task_id(),
        "theme selected, continuation enqueued"
    );

    Ok(theme)
}
