//! Integration tests for the continuation claim on jobs.
//!
//! The claim is a single conditional UPDATE, so no matter how many workers
//! race, exactly one sees a win. These tests drive the claim, release, and
//! lease-expiry paths against real Postgres.

mod common;

use common::{create_job_fixture, reload_job, TestHarness};
use futures::future::join_all;
use server_core::domains::content_plan::models::Job;
use test_context::test_context;
use uuid::Uuid;

/// Backdate a job's claim lease so it reads as expired.
async fn expire_claim(ctx: &TestHarness, job_id: Uuid) {
    sqlx::query("UPDATE jobs SET claim_expires_at = NOW() - INTERVAL '5 seconds' WHERE id = $1")
        .bind(job_id)
        .execute(&ctx.db_pool)
        .await
        .expect("Failed to backdate claim");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_concurrent_claims_have_exactly_one_winner(ctx: &TestHarness) {
    let job = create_job_fixture(&ctx.db_pool).await;

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let pool = ctx.db_pool.clone();
            let job_id = job.id;
            tokio::spawn(async move { Job::claim(job_id, 600, &pool).await.unwrap() })
        })
        .collect();

    let wins = join_all(attempts)
        .await
        .into_iter()
        .map(|result| result.expect("claim task panicked"))
        .filter(|won| *won)
        .count();

    assert_eq!(wins, 1);

    let job = reload_job(&ctx.db_pool, &job).await;
    assert!(job.in_progress);
    assert!(job.claim_expires_at.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_claim_is_held_until_released(ctx: &TestHarness) {
    let job = create_job_fixture(&ctx.db_pool).await;

    assert!(Job::claim(job.id, 600, &ctx.db_pool).await.unwrap());
    assert!(!Job::claim(job.id, 600, &ctx.db_pool).await.unwrap());

    Job::release_claim(job.id, &ctx.db_pool).await.unwrap();
    let released = reload_job(&ctx.db_pool, &job).await;
    assert!(!released.in_progress);
    assert!(released.claim_expires_at.is_none());

    assert!(Job::claim(job.id, 600, &ctx.db_pool).await.unwrap());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_expired_lease_is_claimable_again(ctx: &TestHarness) {
    let job = create_job_fixture(&ctx.db_pool).await;

    assert!(Job::claim(job.id, 600, &ctx.db_pool).await.unwrap());
    expire_claim(ctx, job.id).await;

    // The stale claim no longer blocks a new worker.
    assert!(Job::claim(job.id, 600, &ctx.db_pool).await.unwrap());
    assert!(!Job::claim(job.id, 600, &ctx.db_pool).await.unwrap());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_claim_on_missing_job_is_a_loss(ctx: &TestHarness) {
    assert!(!Job::claim(Uuid::new_v4(), 600, &ctx.db_pool).await.unwrap());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_reaper_clears_only_expired_claims(ctx: &TestHarness) {
    let stale = create_job_fixture(&ctx.db_pool).await;
    let live = create_job_fixture(&ctx.db_pool).await;

    assert!(Job::claim(stale.id, 600, &ctx.db_pool).await.unwrap());
    assert!(Job::claim(live.id, 600, &ctx.db_pool).await.unwrap());
    expire_claim(ctx, stale.id).await;

    // Other tests may contribute expired claims of their own, so only the
    // rows this test owns are asserted.
    let reaped = Job::reap_expired_claims(&ctx.db_pool).await.unwrap();
    assert!(reaped >= 1);

    let stale = reload_job(&ctx.db_pool, &stale).await;
    assert!(!stale.in_progress);
    assert!(stale.claim_expires_at.is_none());

    let live = reload_job(&ctx.db_pool, &live).await;
    assert!(live.in_progress);
    assert!(live.claim_expires_at.is_some());
}
