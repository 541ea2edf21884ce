pub mod health;


use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::auth::handlers as auth;
use crate::errors::AppError;
use crate::jobs::handlers as jobs;
use crate::resumes::handlers as resumes;
use crate::state::AppState;
use crate::users::handlers as users;

/// Room for multipart framing and the title field on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let api = Router::new()
        .route("/health", get(health::health_handler))
        // Identity
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/me", get(auth::handle_me))
        .route("/auth/profile", patch(auth::handle_update_profile))
        .route(
            "/auth/change-password",
            patch(auth::handle_change_password),
        )
        .route("/auth/forgot-password", post(auth::handle_forgot_password))
        .route("/auth/reset-password", post(auth::handle_reset_password))
        // Resumes
        .route(
            "/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route("/resumes/upload", post(resumes::handle_upload_resume))
        .route(
            "/resumes/:id",
            get(resumes::handle_get_resume)
                .patch(resumes::handle_update_resume)
                .delete(resumes::handle_delete_resume),
        )
        .route("/resumes/:id/download", get(resumes::handle_download_resume))
        // Job descriptions
        .route("/jobs", get(jobs::handle_list_jobs).post(jobs::handle_create_job))
        .route(
            "/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Analyses
        .route(
            "/analysis",
            get(analysis::handle_list_analyses).post(analysis::handle_create_analysis),
        )
        .route("/analysis/optimize", post(analysis::handle_optimize))
        .route(
            "/analysis/:id",
            get(analysis::handle_get_analysis).delete(analysis::handle_delete_analysis),
        )
        .route("/analysis/:id/reanalyze", post(analysis::handle_reanalyze))
        .route("/analysis/:id/history", get(analysis::handle_analysis_history))
        // Users
        .route("/users/dashboard", get(users::handle_dashboard))
        .route("/users/activity", get(users::handle_activity))
        .route("/users/profile", get(users::handle_profile))
        .route("/users/export", get(users::handle_export))
        .route("/users/account", delete(users::handle_delete_account));

    Router::new()
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
