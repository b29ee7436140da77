//! Job routes: create, start, inspect, select a theme, admin cleanup.
//!
//! Handlers stay thin: parse, call the action, translate the outcome to a
//! status code and JSON body. All domain rules live in the actions.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

use crate::domains::content_plan::actions::{
    create_job, select_theme, start_processing, CreateJobError, SelectionError, StartOutcome,
};
use crate::domains::content_plan::models::{Job, Theme};
use crate::server::app::AppState;

// ===== Request payloads

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub website_url: String,
    pub keywords: KeywordsInput,
}

/// Keywords arrive either as a list or as one comma/newline separated
/// block, mirroring the original form input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeywordsInput {
    List(Vec<String>),
    Text(String),
}

impl KeywordsInput {
    fn into_list(self) -> Vec<String> {
        match self {
            KeywordsInput::List(list) => list,
            KeywordsInput::Text(text) => text
                .split(['\n', ','])
                .map(str::to_string)
                .collect(),
        }
    }
}

// ===== Response views

#[derive(Debug, Serialize)]
pub struct ThemeView {
    pub id: Uuid,
    pub position: i32,
    pub title: String,
    pub description: String,
    pub keywords: Option<Value>,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Theme> for ThemeView {
    fn from(theme: Theme) -> Self {
        Self {
            id: theme.id,
            position: theme.position,
            title: theme.title,
            description: theme.description,
            keywords: theme.keywords,
            is_selected: theme.is_selected,
            created_at: theme.created_at,
        }
    }
}

/// Full job view, returned by create, results, and admin listing. The raw
/// website content is deliberately left out; its length stands in for it.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub website_url: String,
    pub keywords: Value,
    pub current_phase: String,
    pub progress: i32,
    pub workflow_data: Value,
    pub messages: Value,
    pub error: Option<String>,
    pub website_content_length: Option<i32>,
    pub search_results: Option<Value>,
    pub search_results_count: Option<i32>,
    pub brand_brief: Option<String>,
    pub search_analysis: Option<String>,
    pub content_cluster: Option<String>,
    pub article_ideas: Option<String>,
    pub final_plan: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub themes: Vec<ThemeView>,
}

impl JobView {
    fn from_parts(job: Job, themes: Vec<Theme>) -> Self {
        Self {
            id: job.id,
            status: job.status,
            created_at: job.created_at,
            website_url: job.website_url,
            keywords: job.keywords,
            current_phase: job.current_phase,
            progress: job.progress,
            workflow_data: job.workflow_data,
            messages: job.messages,
            error: job.error,
            website_content_length: job.website_content_length,
            search_results: job.search_results,
            search_results_count: job.search_results_count,
            brand_brief: job.brand_brief,
            search_analysis: job.search_analysis,
            content_cluster: job.content_cluster,
            article_ideas: job.article_ideas,
            final_plan: job.final_plan,
            completed_at: job.completed_at,
            themes: themes.into_iter().map(ThemeView::from).collect(),
        }
    }
}

/// Compact projection polled by the progress page.
#[derive(Debug, Serialize)]
pub struct JobStatusView {
    pub id: Uuid,
    pub status: String,
    pub progress: i32,
    pub current_phase: String,
    pub messages: Value,
    pub error: Option<String>,
    pub themes: Vec<ThemeView>,
}

impl JobStatusView {
    fn from_parts(job: Job, themes: Vec<Theme>) -> Self {
        Self {
            id: job.id,
            status: job.status,
            progress: job.progress,
            current_phase: job.current_phase,
            messages: job.messages,
            error: job.error,
            themes: themes.into_iter().map(ThemeView::from).collect(),
        }
    }
}

fn error_json(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "error": message.into() }))
}

// ===== Handlers

/// POST /api/jobs
pub async fn create_job_handler(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateJobRequest>,
) -> Response {
    let keywords = payload.keywords.into_list();
    match create_job(&state.server_deps, &payload.website_url, keywords).await {
        Ok(job) => (
            StatusCode::CREATED,
            Json(JobView::from_parts(job, Vec::new())),
        )
            .into_response(),
        Err(e @ (CreateJobError::InvalidUrl | CreateJobError::NoKeywords)) => {
            (StatusCode::BAD_REQUEST, error_json(e.to_string())).into_response()
        }
        Err(CreateJobError::Internal(e)) => {
            error!(error = ?e, "failed to create job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(format!("An error occurred: {e:#}")),
            )
                .into_response()
        }
    }
}

/// POST /api/jobs/:job_id/process
pub async fn process_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    match start_processing(&state.server_deps, job_id).await {
        Ok(None) => (StatusCode::NOT_FOUND, error_json("Job not found")).into_response(),
        Ok(Some(StartOutcome::Started)) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "processing",
                "message": "Job processing started",
            })),
        )
            .into_response(),
        Ok(Some(StartOutcome::AlreadyStarted { status })) => (
            StatusCode::OK,
            Json(json!({
                "status": status,
                "message": "Job already processing or completed",
            })),
        )
            .into_response(),
        Err(e) => {
            error!(job_id = %job_id, error = ?e, "failed to start job processing");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(format!("{e:#}")),
            )
                .into_response()
        }
    }
}

/// GET /api/jobs/:job_id/status
pub async fn job_status_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    match load_job_with_themes(&state.db_pool, job_id).await {
        Ok(Some((job, themes))) => {
            Json(JobStatusView::from_parts(job, themes)).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, error_json("Job not found")).into_response(),
        Err(e) => {
            error!(job_id = %job_id, error = ?e, "failed to load job status");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(format!("{e:#}")),
            )
                .into_response()
        }
    }
}

/// GET /api/jobs/:job_id
pub async fn get_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    match load_job_with_themes(&state.db_pool, job_id).await {
        Ok(Some((job, themes))) => Json(JobView::from_parts(job, themes)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, error_json("Job not found")).into_response(),
        Err(e) => {
            error!(job_id = %job_id, error = ?e, "failed to load job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(format!("{e:#}")),
            )
                .into_response()
        }
    }
}

/// POST /api/jobs/:job_id/theme-selection
pub async fn select_theme_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            error_json("Invalid request format, expected JSON"),
        )
            .into_response();
    };
    let Some(theme_number) = parse_theme_number(body.get("theme_number")) else {
        return (
            StatusCode::BAD_REQUEST,
            error_json(SelectionError::InvalidThemeNumber.to_string()),
        )
            .into_response();
    };

    let (status, message) = match select_theme(&state.server_deps, job_id, theme_number).await {
        Ok(theme) => {
            return Json(json!({
                "status": "success",
                "message": "Theme selected",
                "theme": ThemeView::from(theme),
            }))
            .into_response();
        }
        Err(SelectionError::Internal(e)) => {
            error!(job_id = %job_id, error = ?e, "theme selection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server error: {e:#}"),
            )
        }
        Err(e @ SelectionError::NotFound) => (StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ (SelectionError::NotAwaitingSelection | SelectionError::AlreadySelected)) => {
            warn!(job_id = %job_id, reason = %e, "theme selection rejected");
            (StatusCode::CONFLICT, e.to_string())
        }
        Err(e @ (SelectionError::InvalidThemeNumber | SelectionError::OutOfRange)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
    };
    (status, error_json(message)).into_response()
}

/// GET /admin/jobs
pub async fn list_jobs_handler(Extension(state): Extension<AppState>) -> Response {
    match load_all_jobs(&state.db_pool).await {
        Ok(views) => Json(views).into_response(),
        Err(e) => {
            error!(error = ?e, "failed to list jobs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(format!("{e:#}")),
            )
                .into_response()
        }
    }
}

/// POST /admin/jobs/cleanup
pub async fn cleanup_jobs_handler(Extension(state): Extension<AppState>) -> Response {
    match Job::delete_incomplete(&state.db_pool).await {
        Ok(deleted) => Json(json!({
            "deleted": deleted,
            "message": format!(
                "Successfully deleted {deleted} incomplete jobs and their associated themes"
            ),
        }))
        .into_response(),
        Err(e) => {
            error!(error = ?e, "failed to clean up jobs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(format!("Error deleting jobs: {e:#}")),
            )
                .into_response()
        }
    }
}

// ===== Helpers

async fn load_job_with_themes(
    pool: &PgPool,
    job_id: Uuid,
) -> anyhow::Result<Option<(Job, Vec<Theme>)>> {
    let Some(job) = Job::find_by_id(job_id, pool).await? else {
        return Ok(None);
    };
    let themes = Theme::find_for_job(job_id, pool).await?;
    Ok(Some((job, themes)))
}

async fn load_all_jobs(pool: &PgPool) -> anyhow::Result<Vec<JobView>> {
    let jobs = Job::find_all(pool).await?;
    let mut views = Vec::with_capacity(jobs.len());
    for job in jobs {
        let themes = Theme::find_for_job(job.id, pool).await?;
        views.push(JobView::from_parts(job, themes));
    }
    Ok(views)
}

/// The selection number may arrive as a JSON number or a digit string.
fn parse_theme_number(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_theme_number_accepts_number_and_digit_string() {
        assert_eq!(parse_theme_number(Some(&json!(3))), Some(3));
        assert_eq!(parse_theme_number(Some(&json!("3"))), Some(3));
        assert_eq!(parse_theme_number(Some(&json!("0"))), Some(0));
    }

    #[test]
    fn test_parse_theme_number_rejects_garbage() {
        assert_eq!(parse_theme_number(None), None);
        assert_eq!(parse_theme_number(Some(&json!(null))), None);
        assert_eq!(parse_theme_number(Some(&json!(-2))), None);
        assert_eq!(parse_theme_number(Some(&json!(1.5))), None);
        assert_eq!(parse_theme_number(Some(&json!("three"))), None);
        assert_eq!(parse_theme_number(Some(&json!(""))), None);
        assert_eq!(parse_theme_number(Some(&json!("2b"))), None);
    }

    #[test]
    fn test_keywords_input_splits_text_on_commas_and_newlines() {
        let input = KeywordsInput::Text("alpha, beta\ngamma".to_string());
        assert_eq!(input.into_list(), vec!["alpha", " beta", "gamma"]);

        let input = KeywordsInput::List(vec!["one".into(), "two".into()]);
        assert_eq!(input.into_list(), vec!["one", "two"]);
    }
}
