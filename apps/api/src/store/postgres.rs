use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{
    Analysis, AnalysisResult, AnalysisSnapshot, AnalysisStats, KeywordData, NewAnalysis,
    RelationPreview,
};
use crate::models::job::{JobDescription, JobPatch, NewJob};
use crate::models::pagination::{ListParams, Page};
use crate::models::resume::{NewResume, Resume, ResumeContent, ResumePatch, ResumeType};
use crate::models::user::{NewUser, User, UserPatch};
use crate::store::{Store, DUPLICATE_ANALYSIS, DUPLICATE_EMAIL};

/// Joined projection used by every analysis read.
const ANALYSIS_SELECT: &str = r#"
    SELECT a.*, r.title AS resume_title, j.title AS job_title
    FROM analyses a
    JOIN resumes r ON r.id = a.resume_id
    JOIN job_descriptions j ON j.id = a.job_desc_id
"#;

#[derive(Debug, FromRow)]
struct ResumeRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    resume_type: ResumeType,
    content: Json<ResumeContent>,
    original_name: Option<String>,
    file_path: Option<String>,
    file_size: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for Resume {
    fn from(row: ResumeRow) -> Self {
        Resume {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            resume_type: row.resume_type,
            content: row.content.0,
            original_name: row.original_name,
            file_path: row.file_path,
            file_size: row.file_size,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: Uuid,
    user_id: Uuid,
    resume_id: Uuid,
    job_desc_id: Uuid,
    overall_score: i32,
    keyword_match: i32,
    skills_match: i32,
    experience_match: i32,
    format_score: i32,
    strengths: Vec<String>,
    improvements: Vec<String>,
    missing_keywords: Vec<String>,
    keyword_data: Json<Vec<KeywordData>>,
    detailed_analysis: Option<Value>,
    recommendations: Option<Value>,
    ai_response: Value,
    resume_title: String,
    job_title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnalysisRow> for Analysis {
    fn from(row: AnalysisRow) -> Self {
        Analysis {
            id: row.id,
            user_id: row.user_id,
            resume_id: row.resume_id,
            job_desc_id: row.job_desc_id,
            result: AnalysisResult {
                overall_score: row.overall_score,
                keyword_match: row.keyword_match,
                skills_match: row.skills_match,
                experience_match: row.experience_match,
                format_score: row.format_score,
                strengths: row.strengths,
                improvements: row.improvements,
                missing_keywords: row.missing_keywords,
                keyword_data: row.keyword_data.0,
                detailed_analysis: row.detailed_analysis,
                recommendations: row.recommendations,
                ai_response: row.ai_response,
            },
            resume: RelationPreview {
                id: row.resume_id,
                title: row.resume_title,
            },
            job_description: RelationPreview {
                id: row.job_desc_id,
                title: row.job_title,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: Uuid,
    analysis_id: Uuid,
    overall_score: i32,
    result: Json<AnalysisResult>,
    recorded_at: DateTime<Utc>,
}

/// PostgreSQL-backed store. Uniqueness of analyses is enforced by the
/// `analyses_user_resume_job_key` constraint, not by a read-then-write check.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates a unique-constraint violation into `Conflict`.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, name)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_EMAIL))
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                avatar = COALESCE($3, avatar),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.avatar)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token_hash = NULL,
                reset_token_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_token_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE reset_token_hash = $1 AND reset_token_expires > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("Deleted user {id} and all owned records");
        Ok(result.rows_affected() > 0)
    }

    async fn list_resumes(&self, user_id: Uuid, params: &ListParams) -> Result<Page<Resume>, AppError> {
        let pattern = params.like_pattern();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resumes WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)",
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ResumeRow>(
            r#"
            SELECT * FROM resumes
            WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            ORDER BY updated_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Resume::from).collect(),
            total,
            params,
        ))
    }

    async fn get_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<Resume>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Resume::from))
    }

    async fn insert_resume(&self, user_id: Uuid, new: NewResume) -> Result<Resume, AppError> {
        let (original_name, file_path, file_size) = match new.file {
            Some(f) => (Some(f.original_name), Some(f.file_path), Some(f.file_size)),
            None => (None, None, None),
        };
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, user_id, title, resume_type, content, original_name, file_path, file_size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new.title)
        .bind(new.resume_type)
        .bind(Json(&new.content))
        .bind(original_name)
        .bind(file_path)
        .bind(file_size)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_resume(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: ResumePatch,
    ) -> Result<Option<Resume>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            UPDATE resumes
            SET title = COALESCE($3, title),
                resume_type = COALESCE($4, resume_type),
                content = COALESCE($5, content),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.title)
        .bind(patch.resume_type)
        .bind(patch.content.as_ref().map(Json))
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Resume::from))
    }

    async fn delete_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<Resume>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "DELETE FROM resumes WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Resume::from))
    }

    async fn list_jobs(
        &self,
        user_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<JobDescription>, AppError> {
        let pattern = params.like_pattern();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_descriptions WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)",
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, JobDescription>(
            r#"
            SELECT * FROM job_descriptions
            WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            ORDER BY updated_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    async fn get_job(&self, user_id: Uuid, id: Uuid) -> Result<Option<JobDescription>, AppError> {
        Ok(sqlx::query_as::<_, JobDescription>(
            "SELECT * FROM job_descriptions WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_job(&self, user_id: Uuid, new: NewJob) -> Result<JobDescription, AppError> {
        Ok(sqlx::query_as::<_, JobDescription>(
            r#"
            INSERT INTO job_descriptions (id, user_id, title, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new.title)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_job(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: JobPatch,
    ) -> Result<Option<JobDescription>, AppError> {
        Ok(sqlx::query_as::<_, JobDescription>(
            r#"
            UPDATE job_descriptions
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_job(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM job_descriptions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_analyses(
        &self,
        user_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<Analysis>, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
            "{ANALYSIS_SELECT} WHERE a.user_id = $1 ORDER BY a.updated_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Analysis::from).collect(),
            total,
            params,
        ))
    }

    async fn get_analysis(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, AppError> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "{ANALYSIS_SELECT} WHERE a.id = $1 AND a.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Analysis::from))
    }

    async fn find_analysis(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        job_desc_id: Uuid,
    ) -> Result<Option<Analysis>, AppError> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "{ANALYSIS_SELECT} WHERE a.user_id = $1 AND a.resume_id = $2 AND a.job_desc_id = $3"
        ))
        .bind(user_id)
        .bind(resume_id)
        .bind(job_desc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Analysis::from))
    }

    async fn insert_analysis(&self, user_id: Uuid, new: NewAnalysis) -> Result<Analysis, AppError> {
        let id = Uuid::new_v4();
        let r = &new.result;
        sqlx::query(
            r#"
            INSERT INTO analyses
                (id, user_id, resume_id, job_desc_id,
                 overall_score, keyword_match, skills_match, experience_match, format_score,
                 strengths, improvements, missing_keywords, keyword_data,
                 detailed_analysis, recommendations, ai_response)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(new.resume_id)
        .bind(new.job_desc_id)
        .bind(r.overall_score)
        .bind(r.keyword_match)
        .bind(r.skills_match)
        .bind(r.experience_match)
        .bind(r.format_score)
        .bind(&r.strengths)
        .bind(&r.improvements)
        .bind(&r.missing_keywords)
        .bind(Json(&r.keyword_data))
        .bind(&r.detailed_analysis)
        .bind(&r.recommendations)
        .bind(&r.ai_response)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_ANALYSIS))?;

        info!("Created analysis {id} for user {user_id}");

        self.get_analysis(user_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Analysis"))
    }

    async fn overwrite_analysis(
        &self,
        user_id: Uuid,
        id: Uuid,
        result: AnalysisResult,
    ) -> Result<Option<Analysis>, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, AnalysisRow>(&format!(
            "{ANALYSIS_SELECT} WHERE a.id = $1 AND a.user_id = $2 FOR UPDATE OF a"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current.map(Analysis::from) else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO analysis_history (id, analysis_id, user_id, overall_score, result)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(user_id)
        .bind(current.result.overall_score)
        .bind(Json(&current.result))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE analyses
            SET overall_score = $3, keyword_match = $4, skills_match = $5,
                experience_match = $6, format_score = $7,
                strengths = $8, improvements = $9, missing_keywords = $10,
                keyword_data = $11, detailed_analysis = $12, recommendations = $13,
                ai_response = $14, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(result.overall_score)
        .bind(result.keyword_match)
        .bind(result.skills_match)
        .bind(result.experience_match)
        .bind(result.format_score)
        .bind(&result.strengths)
        .bind(&result.improvements)
        .bind(&result.missing_keywords)
        .bind(Json(&result.keyword_data))
        .bind(&result.detailed_analysis)
        .bind(&result.recommendations)
        .bind(&result.ai_response)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Re-analyzed analysis {id} for user {user_id}");
        self.get_analysis(user_id, id).await
    }

    async fn analysis_history(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Vec<AnalysisSnapshot>>, AppError> {
        let owned: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM analyses WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        if owned.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT id, analysis_id, overall_score, result, recorded_at
            FROM analysis_history
            WHERE analysis_id = $1 AND user_id = $2
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(
            rows.into_iter()
                .map(|row| AnalysisSnapshot {
                    id: row.id,
                    analysis_id: row.analysis_id,
                    overall_score: row.overall_score,
                    result: row.result.0,
                    recorded_at: row.recorded_at,
                })
                .collect(),
        ))
    }

    async fn delete_analysis(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn analysis_stats(&self, user_id: Uuid) -> Result<AnalysisStats, AppError> {
        let (total, average_score, best_score): (i64, Option<f64>, Option<i32>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), AVG(overall_score)::float8, MAX(overall_score)
            FROM analyses
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AnalysisStats {
            total,
            average_score,
            best_score,
        })
    }
}
