//! Axum route handlers for resume/job analyses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::analysis::engine;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::analysis::{Analysis, AnalysisSnapshot, NewAnalysis, OptimizationSuggestions};
use crate::models::job::JobDescription;
use crate::models::pagination::{ListQuery, Page};
use crate::models::resume::Resume;
use crate::response::{created, ok, ok_with_message, JsonResponse};
use crate::state::AppState;
use crate::store::DUPLICATE_ANALYSIS;
use crate::validation::{check, path_id, validate_identifier, ApiJson};

const ANALYSIS: &str = "Analysis";

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

/// Body of both create and optimize.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    #[serde(default)]
    #[validate(custom(
        function = "validate_identifier",
        message = "Resume ID is required and must be a valid identifier"
    ))]
    pub resume_id: String,
    #[serde(default)]
    #[validate(custom(
        function = "validate_identifier",
        message = "Job description ID is required and must be a valid identifier"
    ))]
    pub job_desc_id: String,
}

impl PairRequest {
    fn ids(&self) -> Result<(Uuid, Uuid), AppError> {
        check(self)?;
        let parse = |raw: &str| {
            Uuid::parse_str(raw.trim()).map_err(|e| AppError::Validation(e.to_string()))
        };
        Ok((parse(&self.resume_id)?, parse(&self.job_desc_id)?))
    }
}

/// Loads both sides of a comparison, each scoped to the caller.
async fn load_pair(
    state: &AppState,
    user_id: Uuid,
    resume_id: Uuid,
    job_desc_id: Uuid,
) -> Result<(Resume, JobDescription), AppError> {
    let resume = state
        .store
        .get_resume(user_id, resume_id)
        .await?
        .ok_or_else(|| AppError::not_found("Resume"))?;
    let job = state
        .store
        .get_job(user_id, job_desc_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job description"))?;
    Ok((resume, job))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/analysis
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<JsonResponse<Page<Analysis>>, AppError> {
    let mut params = query.params();
    params.search = None;
    let page = state.store.list_analyses(auth.id, &params).await?;
    Ok(ok(page))
}

/// GET /api/analysis/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Analysis>, AppError> {
    let id = path_id(&id, ANALYSIS)?;
    let analysis = state
        .store
        .get_analysis(auth.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(ANALYSIS))?;
    Ok(ok(analysis))
}

/// POST /api/analysis
///
/// Runs the model once per (resume, job) pair. The pre-check only saves a wasted
/// model call; the unique constraint decides races.
pub async fn handle_create_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<PairRequest>,
) -> Result<(StatusCode, JsonResponse<Analysis>), AppError> {
    let (resume_id, job_desc_id) = req.ids()?;
    let (resume, job) = load_pair(&state, auth.id, resume_id, job_desc_id).await?;

    if state
        .store
        .find_analysis(auth.id, resume_id, job_desc_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(DUPLICATE_ANALYSIS.to_string()));
    }

    let result = engine::analyze(state.llm.as_ref(), &resume, &job).await?;

    let analysis = state
        .store
        .insert_analysis(
            auth.id,
            NewAnalysis {
                resume_id,
                job_desc_id,
                result,
            },
        )
        .await?;

    info!("Created analysis {} for user {}", analysis.id, auth.id);
    Ok(created(analysis))
}

/// POST /api/analysis/:id/reanalyze
///
/// Same id, fresh model call. The previous result is kept in the history.
pub async fn handle_reanalyze(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Analysis>, AppError> {
    let id = path_id(&id, ANALYSIS)?;
    let existing = state
        .store
        .get_analysis(auth.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(ANALYSIS))?;

    let (resume, job) =
        load_pair(&state, auth.id, existing.resume_id, existing.job_desc_id).await?;
    let result = engine::analyze(state.llm.as_ref(), &resume, &job).await?;

    let analysis = state
        .store
        .overwrite_analysis(auth.id, id, result)
        .await?
        .ok_or_else(|| AppError::not_found(ANALYSIS))?;

    info!("Re-ran analysis {id} for user {}", auth.id);
    Ok(ok(analysis))
}

/// GET /api/analysis/:id/history
pub async fn handle_analysis_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Vec<AnalysisSnapshot>>, AppError> {
    let id = path_id(&id, ANALYSIS)?;
    let history = state
        .store
        .analysis_history(auth.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(ANALYSIS))?;
    Ok(ok(history))
}

/// DELETE /api/analysis/:id
pub async fn handle_delete_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Value>, AppError> {
    let id = path_id(&id, ANALYSIS)?;
    if !state.store.delete_analysis(auth.id, id).await? {
        return Err(AppError::not_found(ANALYSIS));
    }

    info!("Deleted analysis {id} for user {}", auth.id);
    Ok(ok_with_message(json!({}), "Analysis deleted successfully"))
}

/// POST /api/analysis/optimize
///
/// One-shot suggestions. Nothing is persisted.
pub async fn handle_optimize(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<PairRequest>,
) -> Result<JsonResponse<OptimizationSuggestions>, AppError> {
    let (resume_id, job_desc_id) = req.ids()?;
    let (resume, job) = load_pair(&state, auth.id, resume_id, job_desc_id).await?;

    let suggestions = engine::optimize(state.llm.as_ref(), &resume, &job).await?;
    Ok(ok(suggestions))
}
