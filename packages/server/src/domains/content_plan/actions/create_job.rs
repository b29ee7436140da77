use anyhow::Result;
use thiserror::Error;
use tracing::info;

use crate::domains::content_plan::models::Job;
use crate::domains::content_plan::workflow::WorkflowState;
use crate::kernel::{validate_url, ServerDeps};

#[derive(Debug, Error)]
pub enum CreateJobError {
    #[error("Please enter a valid URL including http:// or https://")]
    InvalidUrl,
    #[error("Please enter at least one valid keyword")]
    NoKeywords,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Validate the inputs and persist a new job in the `initialized` state.
///
/// The job is created with a fresh workflow snapshot and does not start
/// processing until it is explicitly kicked off.
pub async fn create_job(
    deps: &ServerDeps,
    website_url: &str,
    keywords: Vec<String>,
) -> Result<Job, CreateJobError> {
    let website_url = website_url.trim();
    if !validate_url(website_url) {
        return Err(CreateJobError::InvalidUrl);
    }

    let keywords: Vec<String> = keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(CreateJobError::NoKeywords);
    }

    let snapshot = WorkflowState::new().save_state();
    let job = Job::create(
        website_url.to_string(),
        keywords,
        snapshot,
        "Job initialized, preparing to process...",
        &deps.db_pool,
    )
    .await?;

    info!(
        job_id = %job.id,
        website_url = %job.website_url,
        keyword_count = job.keyword_list().len(),
        "created content plan job"
    );
    Ok(job)
}
