//! Persistence boundary.
//!
//! Every resume, job and analysis operation takes the caller's `user_id` and filters
//! on it; a row owned by someone else is reported exactly like a missing row (`None`).
//! `AppState` holds an `Arc<dyn Store>`: `PgStore` in production, `MemoryStore` in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{Analysis, AnalysisResult, AnalysisSnapshot, AnalysisStats, NewAnalysis};
use crate::models::job::{JobDescription, JobPatch, NewJob};
use crate::models::pagination::{ListParams, Page};
use crate::models::resume::{NewResume, Resume, ResumePatch};
use crate::models::user::{NewUser, User, UserPatch};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

pub const DUPLICATE_ANALYSIS: &str =
    "An analysis already exists for this resume and job description";
pub const DUPLICATE_EMAIL: &str = "A user with this email already exists";

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, AppError>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;
    /// Only returns users whose token has not expired.
    async fn user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError>;
    /// Cascades to every resume, job and analysis the user owns.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    // Resumes
    async fn list_resumes(&self, user_id: Uuid, params: &ListParams) -> Result<Page<Resume>, AppError>;
    async fn get_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<Resume>, AppError>;
    async fn insert_resume(&self, user_id: Uuid, new: NewResume) -> Result<Resume, AppError>;
    async fn update_resume(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: ResumePatch,
    ) -> Result<Option<Resume>, AppError>;
    /// Returns the deleted row so callers can clean up its stored file.
    async fn delete_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<Resume>, AppError>;

    // Job descriptions
    async fn list_jobs(
        &self,
        user_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<JobDescription>, AppError>;
    async fn get_job(&self, user_id: Uuid, id: Uuid) -> Result<Option<JobDescription>, AppError>;
    async fn insert_job(&self, user_id: Uuid, new: NewJob) -> Result<JobDescription, AppError>;
    async fn update_job(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: JobPatch,
    ) -> Result<Option<JobDescription>, AppError>;
    async fn delete_job(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    // Analyses
    async fn list_analyses(
        &self,
        user_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<Analysis>, AppError>;
    async fn get_analysis(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, AppError>;
    async fn find_analysis(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        job_desc_id: Uuid,
    ) -> Result<Option<Analysis>, AppError>;
    /// Fails with `AppError::Conflict` when the (user, resume, job) tuple already exists.
    async fn insert_analysis(&self, user_id: Uuid, new: NewAnalysis) -> Result<Analysis, AppError>;
    /// Snapshots the current result into history, then overwrites it in place.
    async fn overwrite_analysis(
        &self,
        user_id: Uuid,
        id: Uuid,
        result: AnalysisResult,
    ) -> Result<Option<Analysis>, AppError>;
    async fn analysis_history(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Vec<AnalysisSnapshot>>, AppError>;
    async fn delete_analysis(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
    async fn analysis_stats(&self, user_id: Uuid) -> Result<AnalysisStats, AppError>;
}
