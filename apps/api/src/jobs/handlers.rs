//! Axum route handlers for job descriptions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::title::extract_title;
use crate::models::job::{JobDescription, JobPatch, NewJob};
use crate::models::pagination::{ListQuery, Page};
use crate::response::{created, ok, ok_with_message, JsonResponse};
use crate::state::AppState;
use crate::validation::{check, lenient, path_id, ApiJson};

const JOB: &str = "Job description";

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    #[validate(length(min = 50, message = "Job description must be at least 50 characters long"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[validate(length(min = 50, message = "Job description must be at least 50 characters long"))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateJobRequest {
    /// A new description without an explicit title re-derives the title from it.
    fn into_patch(self) -> JobPatch {
        let title = match (self.title, &self.description) {
            (Some(title), _) => Some(title),
            (None, Some(description)) => Some(extract_title(description)),
            (None, None) => None,
        };
        JobPatch {
            title,
            description: self.description,
            is_active: self.is_active,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<JsonResponse<Page<JobDescription>>, AppError> {
    let page = state.store.list_jobs(auth.id, &query.params()).await?;
    Ok(ok(page))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<JobDescription>, AppError> {
    let id = path_id(&id, JOB)?;
    let job = state
        .store
        .get_job(auth.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(JOB))?;
    Ok(ok(job))
}

/// POST /api/jobs
///
/// A missing title is derived from the description text.
pub async fn handle_create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateJobRequest>,
) -> Result<(StatusCode, JsonResponse<JobDescription>), AppError> {
    check(&req)?;

    let title = match req.title {
        Some(title) => title,
        None => extract_title(&req.description),
    };

    let job = state
        .store
        .insert_job(
            auth.id,
            NewJob {
                title,
                description: req.description,
            },
        )
        .await?;

    info!("Created job description {} for user {}", job.id, auth.id);
    Ok(created(job))
}

/// PATCH /api/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateJobRequest>,
) -> Result<JsonResponse<JobDescription>, AppError> {
    let id = path_id(&id, JOB)?;
    state
        .store
        .get_job(auth.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(JOB))?;
    check(&req)?;

    let job = state
        .store
        .update_job(auth.id, id, req.into_patch())
        .await?
        .ok_or_else(|| AppError::not_found(JOB))?;
    Ok(ok(job))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Value>, AppError> {
    let id = path_id(&id, JOB)?;
    if !state.store.delete_job(auth.id, id).await? {
        return Err(AppError::not_found(JOB));
    }

    info!("Deleted job description {id} for user {}", auth.id);
    Ok(ok_with_message(json!({}), "Job description deleted successfully"))
}
