//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container used by actions and
//! task handlers. All external services sit behind trait abstractions so
//! tests can swap in mocks.

use sqlx::PgPool;
use std::sync::Arc;

use crate::kernel::tasks::TaskQueue;
use crate::kernel::{BaseCompletions, BaseSearchProvider, BaseWebScraper};

/// Server dependencies accessible to actions and task handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// Page fetcher + content extractor for the target website
    pub scraper: Arc<dyn BaseWebScraper>,
    /// Keyword SERP lookups
    pub search: Arc<dyn BaseSearchProvider>,
    /// LLM completions for the analysis and writing steps
    pub completions: Arc<dyn BaseCompletions>,
    /// Background task queue (same Postgres as the domain data)
    pub tasks: Arc<dyn TaskQueue>,
    /// Continuation claim TTL, seconds
    pub claim_ttl_seconds: i64,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        db_pool: PgPool,
        scraper: Arc<dyn BaseWebScraper>,
        search: Arc<dyn BaseSearchProvider>,
        completions: Arc<dyn BaseCompletions>,
        tasks: Arc<dyn TaskQueue>,
        claim_ttl_seconds: i64,
    ) -> Self {
        Self {
            db_pool,
            scraper,
            search,
            completions,
            tasks,
            claim_ttl_seconds,
        }
    }
}
