//! Integration tests for theme selection.
//!
//! Selection is the one human step in the workflow: it must accept exactly
//! one choice per job, reject everything else without touching the job, and
//! hand off to the continuation exactly once even under concurrent requests.

mod common;

use std::sync::Arc;

use common::{message_texts, reload_job, seed_awaiting_selection, TestHarness};
use server_core::domains::content_plan::actions::{select_theme, SelectionError};
use server_core::domains::content_plan::models::{Job, Theme};
use server_core::domains::content_plan::workflow::WorkflowState;
use server_core::kernel::tasks::Task;
use server_core::kernel::TestDependencies;
use test_context::test_context;
use uuid::Uuid;

const TITLES: [&str; 3] = ["Developer Tooling", "Async Patterns", "Performance Tuning"];

/// Continuation tasks enqueued for this job.
async fn continuation_task_count(ctx: &TestHarness, job_id: Uuid) -> usize {
    Task::find_by_reference_id(job_id, &ctx.db_pool)
        .await
        .expect("Failed to load tasks")
        .into_iter()
        .filter(|t| t.task_type == "continue_workflow")
        .count()
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_selection_records_choice_and_enqueues_continuation(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());
    let job = seed_awaiting_selection(&ctx.db_pool, &TITLES).await;

    let theme = select_theme(&server_deps, job.id, 2)
        .await
        .expect("Selection failed");
    assert_eq!(theme.position, 2);
    assert_eq!(theme.title, "Async Patterns");
    assert!(theme.is_selected);

    let job = reload_job(&ctx.db_pool, &job).await;
    assert_eq!(job.status, "processing");

    // The machine snapshot carries the selection for the continuation.
    let machine = WorkflowState::load_state(&job.workflow_data).expect("Bad snapshot");
    let selected = machine.selected_theme().expect("No selection in snapshot");
    assert_eq!(selected.index, 2);
    assert_eq!(selected.title, "Async Patterns");

    let stored = Theme::find_selected(job.id, &ctx.db_pool)
        .await
        .expect("Failed to load selected theme")
        .expect("No selected theme row");
    assert_eq!(stored.position, 2);

    let messages = message_texts(&ctx.db_pool, &job).await;
    assert!(messages.iter().any(|m| m == "Selected theme: Async Patterns"));

    assert_eq!(continuation_task_count(ctx, job.id).await, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_selection_rejected_when_not_awaiting(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());
    let job = common::create_job_fixture(&ctx.db_pool).await;

    // Status is still `initialized`.
    let err = select_theme(&server_deps, job.id, 1)
        .await
        .expect_err("Selection should be rejected");
    assert!(matches!(err, SelectionError::NotAwaitingSelection));

    let job = reload_job(&ctx.db_pool, &job).await;
    assert_eq!(job.status, "initialized");
    assert_eq!(continuation_task_count(ctx, job.id).await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_selection_rejected_while_job_is_claimed(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());
    let job = seed_awaiting_selection(&ctx.db_pool, &TITLES).await;

    assert!(Job::claim(job.id, 600, &ctx.db_pool).await.expect("Claim failed"));

    let err = select_theme(&server_deps, job.id, 1)
        .await
        .expect_err("Selection should be rejected");
    assert!(matches!(err, SelectionError::NotAwaitingSelection));
    assert_eq!(continuation_task_count(ctx, job.id).await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_selection_rejected_for_missing_job(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());

    let err = select_theme(&server_deps, Uuid::new_v4(), 1)
        .await
        .expect_err("Selection should be rejected");
    assert!(matches!(err, SelectionError::NotFound));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_out_of_range_selection_leaves_job_untouched(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());
    let job = seed_awaiting_selection(&ctx.db_pool, &["Only One", "Only Two"]).await;

    let err = select_theme(&server_deps, job.id, 7)
        .await
        .expect_err("Selection should be rejected");
    assert!(matches!(err, SelectionError::OutOfRange));

    let job = reload_job(&ctx.db_pool, &job).await;
    assert_eq!(job.status, "awaiting_selection");
    assert!(Theme::find_selected(job.id, &ctx.db_pool)
        .await
        .expect("Failed to load selected theme")
        .is_none());
    assert_eq!(continuation_task_count(ctx, job.id).await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_second_selection_is_rejected(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());
    let job = seed_awaiting_selection(&ctx.db_pool, &TITLES).await;

    select_theme(&server_deps, job.id, 1)
        .await
        .expect("First selection failed");

    // The first selection moved the job to `processing`, so a repeat is
    // rejected on status before the selected-theme check.
    let err = select_theme(&server_deps, job.id, 2)
        .await
        .expect_err("Second selection should be rejected");
    assert!(matches!(err, SelectionError::NotAwaitingSelection));
    assert_eq!(continuation_task_count(ctx, job.id).await, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_selected_theme_blocks_even_when_status_reverts(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = deps.server_deps(ctx.db_pool.clone());
    let job = seed_awaiting_selection(&ctx.db_pool, &TITLES).await;

    select_theme(&server_deps, job.id, 1)
        .await
        .expect("First selection failed");

    // An operator resetting the status must not reopen the choice while a
    // selected theme row exists.
    let reverted = reload_job(&ctx.db_pool, &job).await;
    let machine = WorkflowState::load_state(&reverted.workflow_data).expect("Bad snapshot");
    Job::mark_awaiting_selection(
        job.id,
        machine.current_phase(),
        &reverted.workflow_data,
        &ctx.db_pool,
    )
    .await
    .expect("Failed to revert status");

    let err = select_theme(&server_deps, job.id, 2)
        .await
        .expect_err("Re-selection should be rejected");
    assert!(matches!(err, SelectionError::AlreadySelected));
    assert_eq!(continuation_task_count(ctx, job.id).await, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_concurrent_selections_accept_exactly_one(ctx: &TestHarness) {
    let deps = TestDependencies::default();
    let server_deps = Arc::new(deps.server_deps(ctx.db_pool.clone()));
    let job = seed_awaiting_selection(&ctx.db_pool, &TITLES).await;

    let mut handles = Vec::new();
    for number in [1, 2] {
        let server_deps = server_deps.clone();
        let job_id = job.id;
        handles.push(tokio::spawn(async move {
            select_theme(&server_deps, job_id, number).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.expect("Selection task panicked") {
            Ok(_) => wins += 1,
            Err(e) => assert!(matches!(e, SelectionError::NotAwaitingSelection)),
        }
    }
    assert_eq!(wins, 1);

    // Exactly one winner: one selected theme, one continuation task.
    let themes = Theme::find_for_job(job.id, &ctx.db_pool)
        .await
        .expect("Failed to load themes");
    assert_eq!(themes.iter().filter(|t| t.is_selected).count(), 1);
    assert_eq!(continuation_task_count(ctx, job.id).await, 1);
}
