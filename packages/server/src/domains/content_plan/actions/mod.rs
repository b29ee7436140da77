//! Content plan actions - the verbs of the domain.
//!
//! Pipeline actions (`process_workflow`, `continue_workflow`) run inside
//! background tasks; the others are called from the web layer. All of them
//! speak to the outside world only through [`crate::kernel::ServerDeps`].

pub mod continue_workflow;
pub mod create_job;
pub mod process_workflow;
pub mod select_theme;
pub mod start_processing;

pub use continue_workflow::*;
pub use create_job::*;
pub use process_workflow::*;
pub use select_theme::*;
pub use start_processing::*;

use anyhow::Result;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::models::Job;

/// Put the job into its terminal `error` state with a readable error and a
/// matching feed message.
pub(crate) async fn fail_job(
    pool: &PgPool,
    job_id: Uuid,
    error: &str,
    message: &str,
) -> Result<()> {
    error!(job_id = %job_id, error, "content plan job failed");
    Job::mark_error(job_id, error, pool).await?;
    Job::append_message(job_id, message, pool).await?;
    Ok(())
}
