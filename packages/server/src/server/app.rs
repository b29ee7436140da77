//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::content_plan::reaper::ClaimReaper;
use crate::domains::content_plan::tasks::register_content_plan_tasks;
use crate::kernel::tasks::{PostgresTaskQueue, TaskRegistry, TaskRunner};
use crate::kernel::{HttpScraper, OpenAiCompletions, SerpApiClient, ServerDeps};
use crate::server::routes::{
    cleanup_jobs_handler, create_job_handler, get_job_handler, health_handler,
    job_status_handler, list_jobs_handler, process_job_handler, select_theme_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub server_deps: Arc<ServerDeps>,
}

/// Build the Axum application router.
///
/// Wires the live adapters into [`ServerDeps`], registers the workflow task
/// handlers, and spawns the task runner and the claim reaper as background
/// loops. Returns the router together with the deps for callers that need
/// them beyond the web layer.
pub async fn build_app(pool: PgPool, config: &Config) -> Result<(Router, Arc<ServerDeps>)> {
    let scraper = Arc::new(HttpScraper::new(config.max_website_content_length)?);
    let search = Arc::new(SerpApiClient::new(
        config.serpapi_api_key.clone(),
        config.results_per_keyword,
    )?);
    let completions = Arc::new(OpenAiCompletions::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let task_queue = Arc::new(PostgresTaskQueue::new(pool.clone()));

    let server_deps = Arc::new(ServerDeps::new(
        pool.clone(),
        scraper,
        search,
        completions,
        task_queue.clone(),
        config.claim_ttl_seconds,
    ));

    // Register workflow task handlers
    let mut registry = TaskRegistry::new();
    register_content_plan_tasks(&mut registry);
    let registry = Arc::new(registry);

    // Spawn the task runner as a background loop
    let runner = TaskRunner::new(task_queue, registry, server_deps.clone());
    tokio::spawn(async move {
        if let Err(e) = runner.run().await {
            tracing::error!(error = %e, "task runner exited with error");
        }
    });

    // Spawn the expired-claim reaper
    let reaper = ClaimReaper::new(
        pool.clone(),
        Duration::from_secs(config.reaper_interval_seconds),
    );
    tokio::spawn(async move {
        if let Err(e) = reaper.run().await {
            tracing::error!(error = %e, "claim reaper exited with error");
        }
    });

    // Create shared app state
    let app_state = AppState {
        db_pool: pool,
        server_deps: server_deps.clone(),
    };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let app = Router::new()
        .route("/api/jobs", post(create_job_handler))
        .route("/api/jobs/:job_id", get(get_job_handler))
        .route("/api/jobs/:job_id/process", post(process_job_handler))
        .route("/api/jobs/:job_id/status", get(job_status_handler))
        .route(
            "/api/jobs/:job_id/theme-selection",
            post(select_theme_handler),
        )
        .route("/admin/jobs", get(list_jobs_handler))
        .route("/admin/jobs/cleanup", post(cleanup_jobs_handler))
        // Health check
        .route("/health", get(health_handler))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok((app, server_deps))
}
