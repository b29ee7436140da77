//! Shared fixtures for integration tests.
//!
//! These fixtures use the model methods directly to create test data.
//! Every fixture creates rows scoped to a fresh job, so tests sharing the
//! database never step on each other.

use sqlx::PgPool;

use server_core::domains::content_plan::models::{Job, Theme};
use server_core::domains::content_plan::themes::ParsedTheme;
use server_core::domains::content_plan::workflow::WorkflowState;

/// Artifact text long enough to satisfy the stored-output validity check.
pub fn long_text(label: &str) -> String {
    format!(
        "{} {}",
        label,
        "This sentence pads the artifact body well past the validity threshold. ".repeat(3)
    )
}

/// A model response carrying a parsable themes section with these titles.
pub fn themes_response(titles: &[&str]) -> String {
    let mut out =
        String::from("Here is the strategic analysis you asked for.\n\n## Content Themes\n\n");
    for (i, title) in titles.iter().enumerate() {
        out.push_str(&format!(
            "{}. **{}**\n   A direction built around {}.\n\n",
            i + 1,
            title,
            title.to_lowercase()
        ));
    }
    out
}

/// Create a job the way the creation action does: `initialized`, fresh
/// machine snapshot, opening message.
pub async fn create_job_fixture(pool: &PgPool) -> Job {
    Job::create(
        "https://example.com".to_string(),
        vec!["rust frameworks".to_string(), "async runtimes".to_string()],
        WorkflowState::new().save_state(),
        "Job initialized, preparing to process...",
        pool,
    )
    .await
    .expect("Failed to create job")
}

/// Put a job into `awaiting_selection` exactly as the initial pipeline
/// leaves it: brief and analysis stored, themes persisted, machine parked
/// at theme selection.
pub async fn seed_awaiting_selection(pool: &PgPool, titles: &[&str]) -> Job {
    let job = create_job_fixture(pool).await;

    Job::store_brand_brief(job.id, &long_text("Brand brief."), pool)
        .await
        .expect("Failed to store brand brief");
    Job::store_search_analysis(job.id, &long_text("Search analysis."), pool)
        .await
        .expect("Failed to store search analysis");

    let parsed: Vec<ParsedTheme> = titles
        .iter()
        .map(|title| ParsedTheme {
            title: title.to_string(),
            description: format!("A direction built around {}.", title.to_lowercase()),
        })
        .collect();
    Theme::replace_for_job(job.id, &parsed, pool)
        .await
        .expect("Failed to seed themes");

    let mut machine = WorkflowState::new();
    for _ in 0..3 {
        machine.advance_phase().expect("Failed to walk machine");
    }
    Job::mark_awaiting_selection(job.id, machine.current_phase(), &machine.save_state(), pool)
        .await
        .expect("Failed to mark awaiting selection");
    Job::set_progress(job.id, 40, pool)
        .await
        .expect("Failed to set progress");

    Job::find_by_id(job.id, pool)
        .await
        .expect("Failed to reload job")
        .expect("Job vanished")
}

/// Reload a job, panicking when it is gone.
pub async fn reload_job(pool: &PgPool, job: &Job) -> Job {
    Job::find_by_id(job.id, pool)
        .await
        .expect("Failed to reload job")
        .expect("Job vanished")
}

/// The message feed as plain strings, oldest first.
pub async fn message_texts(pool: &PgPool, job: &Job) -> Vec<String> {
    reload_job(pool, job)
        .await
        .message_list()
        .into_iter()
        .map(|m| m.text)
        .collect()
}
