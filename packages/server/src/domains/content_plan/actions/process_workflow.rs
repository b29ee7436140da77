//! Initial pipeline: gather inputs, research, analyze, pause for selection.
//!
//! Runs the unattended half of a job: extract the website's content, search
//! every keyword, build the brand brief and the search analysis, generate
//! candidate themes, then park the job in `awaiting_selection`.
//!
//! The whole pipeline is resumable. Each expensive step checks for an
//! already-persisted output and skips the adapter call when it finds one,
//! and each phase advance is conditional on the machine still being behind
//! that milestone. A re-run after a crash therefore converges on the same
//! paused state without redoing paid work.
//!
//! Failures here are job-level: the job is marked `error` with a readable
//! reason and the function returns `Ok`. An `Err` means the store itself
//! misbehaved and is left to the task runner.

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domains::content_plan::models::{Job, JobStatus, Theme};
use crate::domains::content_plan::prompts;
use crate::domains::content_plan::steps::{deduplicate_results, is_valid_output, strip_section_header};
use crate::domains::content_plan::themes::parse_themes;
use crate::domains::content_plan::workflow::{WorkflowPhase, WorkflowState};
use crate::kernel::traits::SearchResult;
use crate::kernel::ServerDeps;

use super::fail_job;

enum ResearchOutcome {
    AwaitingSelection,
    /// The job was already marked `error` with a step-specific reason.
    Failed,
}

pub async fn process_workflow(deps: &ServerDeps, job_id: Uuid) -> Result<()> {
    info!(job_id = %job_id, "starting content plan workflow");
    let pool = &deps.db_pool;

    let Some(job) = Job::find_by_id(job_id, pool).await? else {
        warn!(job_id = %job_id, "job not found, skipping workflow");
        return Ok(());
    };
    if job.status == JobStatus::Completed.to_string() {
        info!(job_id = %job_id, "job already completed, skipping workflow");
        return Ok(());
    }

    Job::set_status(job_id, JobStatus::Processing, pool).await?;
    Job::append_message(job_id, "Starting workflow processing...", pool).await?;
    Job::append_message(
        job_id,
        "Preparing to analyze website content and keywords...",
        pool,
    )
    .await?;

    // Resume the machine where the last run left it; a fresh job is at
    // INITIALIZATION. Milestone advances below only fire while the machine
    // is still behind them.
    let mut machine = match WorkflowState::load_state(&job.workflow_data) {
        Ok(machine) => machine,
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "unreadable workflow snapshot, starting fresh");
            WorkflowState::new()
        }
    };
    Job::save_workflow_state(job_id, machine.current_phase(), &machine.save_state(), pool).await?;

    // Step 1: website content.
    Job::append_message(
        job_id,
        &format!("🔍 Retrieving content from {}...", job.website_url),
        pool,
    )
    .await?;

    let website_content = match &job.website_content {
        Some(existing) if is_valid_output(existing) => {
            Job::append_message(
                job_id,
                "ℹ️ Website content already exists, skipping retrieval.",
                pool,
            )
            .await?;
            existing.clone()
        }
        _ => match deps.scraper.scrape(&job.website_url).await {
            Ok(scraped) => {
                let content = scraped.to_prompt_text();
                Job::store_website_content(job_id, &content, pool).await?;
                Job::append_message(
                    job_id,
                    &format!(
                        "✅ Successfully retrieved {} characters of content",
                        content.chars().count()
                    ),
                    pool,
                )
                .await?;
                content
            }
            Err(e) => {
                let error = format!("{e:#}");
                fail_job(pool, job_id, &error, &format!("❌ Error: {error}")).await?;
                return Ok(());
            }
        },
    };
    Job::set_progress(job_id, 10, pool).await?;

    // Step 2: keyword searches, then dedup. A single keyword failing is
    // fine; all of them failing is not.
    let keywords = job.keyword_list();
    Job::append_message(
        job_id,
        &format!("🔍 Starting keyword research for: {}", keywords.join(", ")),
        pool,
    )
    .await?;

    let unique_results = match &job.search_results {
        Some(_) if !job.search_result_list().is_empty() => {
            Job::append_message(
                job_id,
                "ℹ️ Search results already exist, skipping keyword research.",
                pool,
            )
            .await?;
            job.search_result_list()
        }
        _ => {
            let results = run_keyword_searches(deps, job_id, &keywords).await?;

            Job::append_message(job_id, "🔄 Deduplicating search results...", pool).await?;
            let unique = deduplicate_results(results);
            if unique.is_empty() {
                let error =
                    "No search results were found for any keywords. Try different keywords.";
                fail_job(pool, job_id, error, &format!("❌ {error}")).await?;
                return Ok(());
            }

            Job::store_search_results(job_id, &unique, pool).await?;
            Job::append_message(
                job_id,
                &format!(
                    "✅ Found {} unique search results after deduplication",
                    unique.len()
                ),
                pool,
            )
            .await?;
            unique
        }
    };
    Job::set_progress(job_id, 20, pool).await?;

    // Steps 3-5: the completion-backed research and analysis work.
    Job::append_message(
        job_id,
        "🤖 Starting AI analysis of content and search results...",
        pool,
    )
    .await?;

    match run_research_phase(deps, &job, &mut machine, &website_content, &unique_results).await {
        Ok(ResearchOutcome::AwaitingSelection) => {
            info!(job_id = %job_id, "workflow paused for theme selection");
            Ok(())
        }
        Ok(ResearchOutcome::Failed) => Ok(()),
        Err(e) => {
            error!(job_id = %job_id, error = ?e, "research phase failed");
            let error = format!("Error in research phase: {e:#}");
            fail_job(pool, job_id, &error, &format!("❌ {error}")).await?;
            Ok(())
        }
    }
}

/// Search every keyword, collecting what succeeds. Progress interpolates
/// from 10 to 20 across the keyword list.
async fn run_keyword_searches(
    deps: &ServerDeps,
    job_id: Uuid,
    keywords: &[String],
) -> Result<Vec<SearchResult>> {
    let pool = &deps.db_pool;
    let mut all_results = Vec::new();
    let mut failed_keywords = Vec::new();

    for (idx, keyword) in keywords.iter().enumerate() {
        Job::append_message(job_id, &format!("🔍 Searching for keyword: {keyword}"), pool).await?;

        match deps.search.search(keyword).await {
            Ok(results) if !results.is_empty() => {
                Job::append_message(
                    job_id,
                    &format!("✅ Found {} results for keyword: {}", results.len(), keyword),
                    pool,
                )
                .await?;
                all_results.extend(results);
            }
            Ok(_) => {
                failed_keywords.push(keyword.clone());
                Job::append_message(
                    job_id,
                    &format!("⚠️ No results found for keyword: {keyword}"),
                    pool,
                )
                .await?;
            }
            Err(e) => {
                warn!(job_id = %job_id, keyword, error = ?e, "keyword search failed");
                failed_keywords.push(keyword.clone());
                Job::append_message(
                    job_id,
                    &format!("❌ Error searching for '{keyword}': {e:#}"),
                    pool,
                )
                .await?;
            }
        }

        let progress = 10 + ((idx as i32 + 1) * 10) / keywords.len() as i32;
        Job::set_progress(job_id, progress, pool).await?;
    }

    if !failed_keywords.is_empty() {
        warn!(
            job_id = %job_id,
            failed = ?failed_keywords,
            "some keywords produced no results"
        );
    }
    Ok(all_results)
}

/// Brand brief, search analysis, and theme generation, ending in the
/// `awaiting_selection` pause.
async fn run_research_phase(
    deps: &ServerDeps,
    job: &Job,
    machine: &mut WorkflowState,
    website_content: &str,
    unique_results: &[SearchResult],
) -> Result<ResearchOutcome> {
    let pool = &deps.db_pool;
    let job_id = job.id;

    Job::append_message(
        job_id,
        "📊 RESEARCH PHASE: Analyzing website content and search results",
        pool,
    )
    .await?;

    // Brand brief.
    let (brand_brief, brief_message) = match &job.brand_brief {
        Some(existing) if is_valid_output(existing) => {
            Job::append_message(
                job_id,
                "ℹ️ Brand brief already exists, skipping OpenAI call.",
                pool,
            )
            .await?;
            (existing.clone(), None)
        }
        _ => {
            info!(job_id = %job_id, "requesting brand brief completion");
            let response = deps
                .completions
                .complete(
                    prompts::BRAND_BRIEF_PROMPT,
                    &prompts::brand_brief_message(website_content),
                )
                .await
                .context("brand brief completion")?;
            let brief = strip_section_header(&response, "## Brand Brief").to_string();
            if !is_valid_output(&brief) {
                bail!("OpenAI API returned an empty or too short response for brand brief analysis.");
            }
            Job::store_brand_brief(job_id, &brief, pool).await?;
            (brief, Some("✅ Completed brand brief analysis"))
        }
    };
    if machine.current_phase() < WorkflowPhase::Research {
        let phase = machine.advance_phase()?;
        Job::save_workflow_state(job_id, phase, &machine.save_state(), pool).await?;
    }
    Job::set_progress(job_id, 30, pool).await?;
    if let Some(message) = brief_message {
        Job::append_message(job_id, message, pool).await?;
    }

    // Search analysis, over the strongest slice of the results.
    Job::append_message(job_id, "🔍 Analyzing search results...", pool).await?;

    let search_analysis = match &job.search_analysis {
        Some(existing) if is_valid_output(existing) => {
            Job::append_message(
                job_id,
                "ℹ️ Search analysis already exists, skipping OpenAI call.",
                pool,
            )
            .await?;
            existing.clone()
        }
        _ => {
            info!(job_id = %job_id, "requesting search analysis completion");
            let top_results: Vec<&SearchResult> = unique_results.iter().take(10).collect();
            let results_json = serde_json::to_string_pretty(&top_results)?;
            let response = deps
                .completions
                .complete(
                    prompts::SEARCH_ANALYSIS_PROMPT,
                    &prompts::search_analysis_message(&results_json),
                )
                .await
                .context("search analysis completion")?;
            let analysis = strip_section_header(&response, "## Search Results Analysis").to_string();
            if !is_valid_output(&analysis) {
                bail!("OpenAI API returned an empty or too short response for search results analysis.");
            }
            Job::store_search_analysis(job_id, &analysis, pool).await?;
            Job::append_message(job_id, "✅ Completed search results analysis", pool).await?;
            analysis
        }
    };
    Job::set_progress(job_id, 40, pool).await?;
    Job::append_message(job_id, "📊 Moving to content theme generation...", pool).await?;

    // Theme generation.
    Job::append_message(job_id, "🎯 ANALYSIS PHASE: Generating content themes", pool).await?;

    let existing_themes = Theme::find_for_job(job_id, pool).await?;
    let themes_message = if !existing_themes.is_empty() {
        Job::append_message(
            job_id,
            "ℹ️ Content themes already exist, skipping generation.",
            pool,
        )
        .await?;
        None
    } else {
        info!(job_id = %job_id, "requesting theme generation completion");
        let response = deps
            .completions
            .complete(
                prompts::CONTENT_ANALYST_PROMPT,
                &prompts::theme_generation_message(&brand_brief, &search_analysis),
            )
            .await
            .context("theme generation completion")?;

        let parsed = match parse_themes(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "theme parsing failed");
                let error = "Failed to parse themes from AI response";
                fail_job(pool, job_id, error, &format!("❌ {error}")).await?;
                return Ok(ResearchOutcome::Failed);
            }
        };

        let themes = Theme::replace_for_job(job_id, &parsed, pool).await?;
        Some(format!("✅ Generated {} content themes", themes.len()))
    };
    if machine.current_phase() < WorkflowPhase::Analysis {
        let phase = machine.advance_phase()?;
        Job::save_workflow_state(job_id, phase, &machine.save_state(), pool).await?;
    }
    if let Some(message) = themes_message {
        Job::append_message(job_id, &message, pool).await?;
    }

    // Pause for the user.
    if machine.current_phase() < WorkflowPhase::ThemeSelection {
        machine.advance_phase()?;
    }
    Job::mark_awaiting_selection(job_id, machine.current_phase(), &machine.save_state(), pool)
        .await?;
    Job::append_message(job_id, "⏳ Waiting for theme selection...", pool).await?;

    Ok(ResearchOutcome::AwaitingSelection)
}
