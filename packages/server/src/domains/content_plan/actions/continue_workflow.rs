//! Continuation pipeline: from a selected theme to the finished plan.
//!
//! Entry is guarded by the job claim. Whoever loses the atomic claim simply
//! skips; the winner holds a lease for the whole run and releases it on
//! every exit path, success or failure. A worker that dies mid-run leaves
//! an expired lease, which either the next claim attempt or the reaper
//! clears, and the idempotent steps make the re-run safe.

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domains::content_plan::models::{Job, JobStatus, Theme};
use crate::domains::content_plan::prompts;
use crate::domains::content_plan::steps::{is_step_satisfied, is_valid_output};
use crate::domains::content_plan::workflow::{WorkflowPhase, WorkflowState};
use crate::kernel::ServerDeps;

use super::fail_job;

pub async fn continue_workflow(deps: &ServerDeps, job_id: Uuid) -> Result<()> {
    let pool = &deps.db_pool;

    if !Job::claim(job_id, deps.claim_ttl_seconds, pool).await? {
        warn!(job_id = %job_id, "skipping continuation: job is claimed by another worker");
        return Ok(());
    }
    info!(job_id = %job_id, "claimed job, continuing workflow after selection");

    let outcome = match run_continuation(deps, job_id).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(job_id = %job_id, error = ?e, "continuation failed");
            let error = format!("{e:#}");
            fail_job(
                pool,
                job_id,
                &error,
                &format!("❌ Error in theme selection workflow: {error}"),
            )
            .await
        }
    };

    // The claim must not outlive the attempt. If this release fails the
    // lease expiry still unblocks the job.
    if let Err(e) = Job::release_claim(job_id, pool).await {
        error!(job_id = %job_id, error = ?e, "failed to release job claim");
    }

    outcome
}

async fn run_continuation(deps: &ServerDeps, job_id: Uuid) -> Result<()> {
    let pool = &deps.db_pool;

    let Some(job) = Job::find_by_id(job_id, pool).await? else {
        warn!(job_id = %job_id, "job not found, skipping continuation");
        return Ok(());
    };
    if job.status == JobStatus::Completed.to_string() {
        info!(job_id = %job_id, "job already completed, skipping continuation");
        return Ok(());
    }

    let mut machine = WorkflowState::load_state(&job.workflow_data)?;

    let Some(theme) = Theme::find_selected(job_id, pool).await? else {
        fail_job(
            pool,
            job_id,
            "No theme was selected",
            "❌ Error: No theme was selected",
        )
        .await?;
        return Ok(());
    };

    let brand_brief = job.brand_brief.clone().unwrap_or_default();
    let search_analysis = job.search_analysis.clone().unwrap_or_default();

    // Step 1: content cluster. Deliberately recomputed on every run; it is
    // the cheap scaffolding for the two guarded steps below.
    Job::append_message(job_id, "📝 STRATEGY PHASE: Creating content clusters", pool).await?;
    Job::append_message(
        job_id,
        &format!("🎯 Processing selected theme: {}", theme.title),
        pool,
    )
    .await?;

    let cluster_result = deps
        .completions
        .complete(
            prompts::CONTENT_STRATEGIST_CLUSTER_PROMPT,
            &prompts::content_cluster_message(&brand_brief, &theme.title, &theme.description),
        )
        .await
        .and_then(|response| {
            if is_valid_output(&response) {
                Ok(response)
            } else {
                Err(anyhow!(
                    "OpenAI API returned an empty or too short response for content cluster generation."
                ))
            }
        });
    let content_cluster = match cluster_result {
        Ok(cluster) => cluster,
        Err(e) => {
            let error = format!("Error in content cluster generation: {e:#}");
            fail_job(pool, job_id, &error, &format!("❌ {error}")).await?;
            return Ok(());
        }
    };
    Job::store_content_cluster(job_id, &content_cluster, pool).await?;
    if machine.current_phase() < WorkflowPhase::ContentIdeation {
        let phase = machine.advance_phase()?;
        Job::save_workflow_state(job_id, phase, &machine.save_state(), pool).await?;
    }
    Job::set_progress(job_id, 80, pool).await?;
    Job::append_message(job_id, "✅ Content clusters created", pool).await?;

    // Step 2: article ideas (skipped when already on the job).
    Job::append_message(
        job_id,
        "💡 ARTICLE IDEATION PHASE: Developing content ideas",
        pool,
    )
    .await?;

    if is_step_satisfied(job.article_ideas.as_deref()) {
        Job::append_message(
            job_id,
            "ℹ️ Article ideas already exist, skipping OpenAI call.",
            pool,
        )
        .await?;
    } else {
        let ideas_result = deps
            .completions
            .complete(
                prompts::CONTENT_WRITER_PROMPT,
                &prompts::article_ideation_message(
                    &brand_brief,
                    &theme.title,
                    &theme.description,
                    &content_cluster,
                ),
            )
            .await
            .and_then(|response| {
                if is_valid_output(&response) {
                    Ok(response)
                } else {
                    Err(anyhow!(
                        "OpenAI API returned an empty or too short response for article ideation."
                    ))
                }
            });
        match ideas_result {
            Ok(ideas) => {
                Job::store_article_ideas(job_id, &ideas, pool).await?;
                Job::append_message(job_id, "✅ Article ideas generated", pool).await?;
            }
            Err(e) => {
                let error = format!("Error in article ideation: {e:#}");
                fail_job(pool, job_id, &error, &format!("❌ {error}")).await?;
                return Ok(());
            }
        }
    }
    Job::set_progress(job_id, 90, pool).await?;

    // Step 3: final plan (skipped when already on the job).
    Job::append_message(
        job_id,
        "📊 EDITING PHASE: Adding final touches to the content plan",
        pool,
    )
    .await?;

    if is_step_satisfied(job.final_plan.as_deref()) {
        Job::append_message(
            job_id,
            "ℹ️ Final plan already exists, skipping OpenAI call.",
            pool,
        )
        .await?;
    } else {
        let plan_result = deps
            .completions
            .complete(
                prompts::CONTENT_EDITOR_PROMPT,
                &prompts::final_plan_message(
                    &brand_brief,
                    &search_analysis,
                    &theme.title,
                    &theme.description,
                ),
            )
            .await
            .and_then(|response| {
                if is_valid_output(&response) {
                    Ok(response)
                } else {
                    Err(anyhow!(
                        "OpenAI API returned an empty or too short response for final plan generation."
                    ))
                }
            });
        match plan_result {
            Ok(plan) => {
                Job::store_final_plan(job_id, &plan, pool).await?;
            }
            Err(e) => {
                let error = format!("Error in final plan generation: {e:#}");
                fail_job(pool, job_id, &error, &format!("❌ {error}")).await?;
                return Ok(());
            }
        }
    }
    if machine.current_phase() < WorkflowPhase::Editorial {
        let phase = machine.advance_phase()?;
        Job::save_workflow_state(job_id, phase, &machine.save_state(), pool).await?;
    }
    Job::set_progress(job_id, 100, pool).await?;

    // Completion: terminal status and phase land together.
    if machine.current_phase() < WorkflowPhase::Completion {
        machine.advance_phase()?;
    }
    Job::mark_completed(job_id, machine.current_phase(), &machine.save_state(), pool).await?;
    Job::append_message(job_id, "✅ Content plan completed successfully!", pool).await?;
    Job::append_message(job_id, "🎉 Your content strategy is ready!", pool).await?;

    info!(job_id = %job_id, "content plan completed");
    Ok(())
}
