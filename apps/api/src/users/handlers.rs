//! Aggregate read views over everything a user owns, plus account deletion.

use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::verify_password;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::analysis::Analysis;
use crate::models::job::JobDescription;
use crate::models::pagination::{ListParams, ListQuery};
use crate::models::resume::Resume;
use crate::models::user::User;
use crate::response::{ok, ok_with_message, JsonResponse};
use crate::resumes::storage::FileStore;
use crate::state::AppState;
use crate::validation::{check, ApiJson};

const RECENT_ANALYSES: i64 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_resumes: i64,
    pub total_jobs: i64,
    pub total_analyses: i64,
    /// One decimal place; absent until the first analysis exists.
    pub average_score: Option<f64>,
    pub best_score: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: UserStats,
    pub recent_analyses: Vec<Analysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Resume,
    Job,
    Analysis,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub stats: UserStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountExport {
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub resumes: Vec<Resume>,
    pub jobs: Vec<JobDescription>,
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Password confirmation is required"))]
    pub password: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn current_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .store
        .user_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

async fn user_stats(state: &AppState, user_id: Uuid) -> Result<UserStats, AppError> {
    let count = ListParams::first(1);
    let resumes = state.store.list_resumes(user_id, &count).await?;
    let jobs = state.store.list_jobs(user_id, &count).await?;
    let analyses = state.store.analysis_stats(user_id).await?;

    Ok(UserStats {
        total_resumes: resumes.pagination.total,
        total_jobs: jobs.pagination.total,
        total_analyses: analyses.total,
        average_score: analyses.average_score.map(|avg| (avg * 10.0).round() / 10.0),
        best_score: analyses.best_score,
    })
}

/// Newest first across all three kinds, cut to `limit`.
fn merge_activity(
    resumes: Vec<Resume>,
    jobs: Vec<JobDescription>,
    analyses: Vec<Analysis>,
    limit: usize,
) -> Vec<ActivityItem> {
    let resumes = resumes.into_iter().map(|r| ActivityItem {
        kind: ActivityKind::Resume,
        id: r.id,
        title: r.title,
        score: None,
        timestamp: r.updated_at,
    });
    let jobs = jobs.into_iter().map(|j| ActivityItem {
        kind: ActivityKind::Job,
        id: j.id,
        title: j.title,
        score: None,
        timestamp: j.updated_at,
    });
    let analyses = analyses.into_iter().map(|a| ActivityItem {
        kind: ActivityKind::Analysis,
        id: a.id,
        title: format!("{} vs {}", a.resume.title, a.job_description.title),
        score: Some(a.result.overall_score),
        timestamp: a.updated_at,
    });

    let mut items: Vec<ActivityItem> = resumes.chain(jobs).chain(analyses).collect();
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit);
    items
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/users/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<JsonResponse<Dashboard>, AppError> {
    let stats = user_stats(&state, auth.id).await?;
    let recent = state
        .store
        .list_analyses(auth.id, &ListParams::first(RECENT_ANALYSES))
        .await?;

    Ok(ok(Dashboard {
        stats,
        recent_analyses: recent.items,
    }))
}

/// GET /api/users/activity?limit=
pub async fn handle_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<JsonResponse<Vec<ActivityItem>>, AppError> {
    let limit = query.params().limit;
    let window = ListParams::first(limit);

    let resumes = state.store.list_resumes(auth.id, &window).await?;
    let jobs = state.store.list_jobs(auth.id, &window).await?;
    let analyses = state.store.list_analyses(auth.id, &window).await?;

    Ok(ok(merge_activity(
        resumes.items,
        jobs.items,
        analyses.items,
        usize::try_from(limit).unwrap_or(usize::MAX),
    )))
}

/// GET /api/users/profile
pub async fn handle_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<JsonResponse<Profile>, AppError> {
    let user = current_user(&state, auth.id).await?;
    let stats = user_stats(&state, auth.id).await?;
    Ok(ok(Profile { user, stats }))
}

/// GET /api/users/export
pub async fn handle_export(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<JsonResponse<AccountExport>, AppError> {
    let user = current_user(&state, auth.id).await?;
    let all = ListParams::unbounded();

    let export = AccountExport {
        exported_at: Utc::now(),
        user,
        resumes: state.store.list_resumes(auth.id, &all).await?.items,
        jobs: state.store.list_jobs(auth.id, &all).await?.items,
        analyses: state.store.list_analyses(auth.id, &all).await?.items,
    };

    info!("Exported data for user {}", auth.id);
    Ok(ok(export))
}

/// DELETE /api/users/account
///
/// Requires the current password. Stored files are removed before the user row;
/// a file that cannot be removed is logged and skipped.
pub async fn handle_delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<DeleteAccountRequest>,
) -> Result<JsonResponse<Value>, AppError> {
    check(&req)?;

    let user = current_user(&state, auth.id).await?;
    if !verify_password(&req.password, &user.password_hash).await? {
        return Err(AppError::Validation("Password is incorrect".to_string()));
    }

    let files = FileStore::new(&state.config.upload_dir);
    let resumes = state
        .store
        .list_resumes(user.id, &ListParams::unbounded())
        .await?;
    for file_path in resumes.items.iter().filter_map(|r| r.file_path.as_deref()) {
        if let Err(e) = files.remove(file_path).await {
            warn!("Could not remove {file_path} while deleting user {}: {e}", user.id);
        }
    }

    if !state.store.delete_user(user.id).await? {
        return Err(AppError::not_found("User"));
    }

    info!("Deleted account {}", user.id);
    Ok(ok_with_message(json!({}), "Account deleted successfully"))
}
