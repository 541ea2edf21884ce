//! In-memory `Store` used by router tests. Mirrors the ownership filtering,
//! cascade and uniqueness behaviour of the Postgres schema.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{
    Analysis, AnalysisResult, AnalysisSnapshot, AnalysisStats, NewAnalysis, RelationPreview,
};
use crate::models::job::{JobDescription, JobPatch, NewJob};
use crate::models::pagination::{ListParams, Page};
use crate::models::resume::{NewResume, Resume, ResumePatch};
use crate::models::user::{NewUser, User, UserPatch};
use crate::store::{Store, DUPLICATE_ANALYSIS, DUPLICATE_EMAIL};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    resumes: Vec<Resume>,
    jobs: Vec<JobDescription>,
    analyses: Vec<Analysis>,
    history: Vec<(Uuid, AnalysisSnapshot)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut tables)
    }

    pub fn analysis_count(&self) -> usize {
        self.with(|t| t.analyses.len())
    }
}

/// Newest first, then page.
fn paginate<T: Clone>(
    mut rows: Vec<T>,
    params: &ListParams,
    updated: impl Fn(&T) -> DateTime<Utc>,
) -> Page<T> {
    rows.sort_by_key(|r| std::cmp::Reverse(updated(r)));
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(params.offset().try_into().unwrap_or(usize::MAX))
        .take(params.limit.try_into().unwrap_or(usize::MAX))
        .collect();
    Page::new(items, total, params)
}

fn preview_titles(t: &mut Tables) {
    for a in t.analyses.iter_mut() {
        if let Some(r) = t.resumes.iter().find(|r| r.id == a.resume_id) {
            a.resume = RelationPreview {
                id: r.id,
                title: r.title.clone(),
            };
        }
        if let Some(j) = t.jobs.iter().find(|j| j.id == a.job_desc_id) {
            a.job_description = RelationPreview {
                id: j.id,
                title: j.title.clone(),
            };
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        self.with(|t| {
            if t.users.iter().any(|u| u.email == new.email) {
                return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
            }
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                email: new.email,
                password_hash: new.password_hash,
                name: new.name,
                avatar: None,
                reset_token_hash: None,
                reset_token_expires: None,
                created_at: now,
                updated_at: now,
            };
            t.users.push(user.clone());
            Ok(user)
        })
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| t.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| t.users.iter().find(|u| u.email == email).cloned()))
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| {
            let user = t.users.iter_mut().find(|u| u.id == id)?;
            if let Some(name) = patch.name {
                user.name = Some(name);
            }
            if let Some(avatar) = patch.avatar {
                user.avatar = Some(avatar);
            }
            user.updated_at = Utc::now();
            Some(user.clone())
        }))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        self.with(|t| {
            if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
                user.password_hash = password_hash.to_string();
                user.reset_token_hash = None;
                user.reset_token_expires = None;
            }
        });
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        self.with(|t| {
            if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
                user.reset_token_hash = token_hash.map(str::to_string);
                user.reset_token_expires = expires;
            }
        });
        Ok(())
    }

    async fn user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let now = Utc::now();
        Ok(self.with(|t| {
            t.users
                .iter()
                .find(|u| {
                    u.reset_token_hash.as_deref() == Some(token_hash)
                        && u.reset_token_expires.is_some_and(|exp| exp > now)
                })
                .cloned()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            let before = t.users.len();
            t.users.retain(|u| u.id != id);
            t.resumes.retain(|r| r.user_id != id);
            t.jobs.retain(|j| j.user_id != id);
            t.analyses.retain(|a| a.user_id != id);
            t.history.retain(|(owner, _)| *owner != id);
            t.users.len() != before
        }))
    }

    async fn list_resumes(&self, user_id: Uuid, params: &ListParams) -> Result<Page<Resume>, AppError> {
        let rows = self.with(|t| {
            t.resumes
                .iter()
                .filter(|r| r.user_id == user_id && params.matches(&r.title))
                .cloned()
                .collect()
        });
        Ok(paginate(rows, params, |r: &Resume| r.updated_at))
    }

    async fn get_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<Resume>, AppError> {
        Ok(self.with(|t| {
            t.resumes
                .iter()
                .find(|r| r.id == id && r.user_id == user_id)
                .cloned()
        }))
    }

    async fn insert_resume(&self, user_id: Uuid, new: NewResume) -> Result<Resume, AppError> {
        let now = Utc::now();
        let (original_name, file_path, file_size) = match new.file {
            Some(f) => (Some(f.original_name), Some(f.file_path), Some(f.file_size)),
            None => (None, None, None),
        };
        let resume = Resume {
            id: Uuid::new_v4(),
            user_id,
            title: new.title,
            resume_type: new.resume_type,
            content: new.content,
            original_name,
            file_path,
            file_size,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.resumes.push(resume.clone()));
        Ok(resume)
    }

    async fn update_resume(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: ResumePatch,
    ) -> Result<Option<Resume>, AppError> {
        Ok(self.with(|t| {
            let resume = t
                .resumes
                .iter_mut()
                .find(|r| r.id == id && r.user_id == user_id)?;
            if let Some(title) = patch.title {
                resume.title = title;
            }
            if let Some(resume_type) = patch.resume_type {
                resume.resume_type = resume_type;
            }
            if let Some(content) = patch.content {
                resume.content = content;
            }
            if let Some(is_active) = patch.is_active {
                resume.is_active = is_active;
            }
            resume.updated_at = Utc::now();
            let updated = resume.clone();
            preview_titles(t);
            Some(updated)
        }))
    }

    async fn delete_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<Resume>, AppError> {
        Ok(self.with(|t| {
            let pos = t
                .resumes
                .iter()
                .position(|r| r.id == id && r.user_id == user_id)?;
            let removed = t.resumes.remove(pos);
            t.analyses.retain(|a| a.resume_id != id);
            Some(removed)
        }))
    }

    async fn list_jobs(
        &self,
        user_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<JobDescription>, AppError> {
        let rows = self.with(|t| {
            t.jobs
                .iter()
                .filter(|j| j.user_id == user_id && params.matches(&j.title))
                .cloned()
                .collect()
        });
        Ok(paginate(rows, params, |j: &JobDescription| j.updated_at))
    }

    async fn get_job(&self, user_id: Uuid, id: Uuid) -> Result<Option<JobDescription>, AppError> {
        Ok(self.with(|t| {
            t.jobs
                .iter()
                .find(|j| j.id == id && j.user_id == user_id)
                .cloned()
        }))
    }

    async fn insert_job(&self, user_id: Uuid, new: NewJob) -> Result<JobDescription, AppError> {
        let now = Utc::now();
        let job = JobDescription {
            id: Uuid::new_v4(),
            user_id,
            title: new.title,
            description: new.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.jobs.push(job.clone()));
        Ok(job)
    }

    async fn update_job(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: JobPatch,
    ) -> Result<Option<JobDescription>, AppError> {
        Ok(self.with(|t| {
            let job = t
                .jobs
                .iter_mut()
                .find(|j| j.id == id && j.user_id == user_id)?;
            if let Some(title) = patch.title {
                job.title = title;
            }
            if let Some(description) = patch.description {
                job.description = description;
            }
            if let Some(is_active) = patch.is_active {
                job.is_active = is_active;
            }
            job.updated_at = Utc::now();
            let updated = job.clone();
            preview_titles(t);
            Some(updated)
        }))
    }

    async fn delete_job(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            let before = t.jobs.len();
            t.jobs.retain(|j| !(j.id == id && j.user_id == user_id));
            let removed = t.jobs.len() != before;
            if removed {
                t.analyses.retain(|a| a.job_desc_id != id);
            }
            removed
        }))
    }

    async fn list_analyses(
        &self,
        user_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<Analysis>, AppError> {
        let rows = self.with(|t| {
            t.analyses
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect()
        });
        Ok(paginate(rows, params, |a: &Analysis| a.updated_at))
    }

    async fn get_analysis(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, AppError> {
        Ok(self.with(|t| {
            t.analyses
                .iter()
                .find(|a| a.id == id && a.user_id == user_id)
                .cloned()
        }))
    }

    async fn find_analysis(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        job_desc_id: Uuid,
    ) -> Result<Option<Analysis>, AppError> {
        Ok(self.with(|t| {
            t.analyses
                .iter()
                .find(|a| {
                    a.user_id == user_id && a.resume_id == resume_id && a.job_desc_id == job_desc_id
                })
                .cloned()
        }))
    }

    async fn insert_analysis(&self, user_id: Uuid, new: NewAnalysis) -> Result<Analysis, AppError> {
        self.with(|t| {
            let duplicate = t.analyses.iter().any(|a| {
                a.user_id == user_id
                    && a.resume_id == new.resume_id
                    && a.job_desc_id == new.job_desc_id
            });
            if duplicate {
                return Err(AppError::Conflict(DUPLICATE_ANALYSIS.to_string()));
            }
            let resume = t
                .resumes
                .iter()
                .find(|r| r.id == new.resume_id)
                .ok_or_else(|| AppError::not_found("Resume"))?;
            let job = t
                .jobs
                .iter()
                .find(|j| j.id == new.job_desc_id)
                .ok_or_else(|| AppError::not_found("Job description"))?;
            let now = Utc::now();
            let analysis = Analysis {
                id: Uuid::new_v4(),
                user_id,
                resume_id: new.resume_id,
                job_desc_id: new.job_desc_id,
                result: new.result,
                resume: RelationPreview {
                    id: resume.id,
                    title: resume.title.clone(),
                },
                job_description: RelationPreview {
                    id: job.id,
                    title: job.title.clone(),
                },
                created_at: now,
                updated_at: now,
            };
            t.analyses.push(analysis.clone());
            Ok(analysis)
        })
    }

    async fn overwrite_analysis(
        &self,
        user_id: Uuid,
        id: Uuid,
        result: AnalysisResult,
    ) -> Result<Option<Analysis>, AppError> {
        Ok(self.with(|t| {
            let analysis = t
                .analyses
                .iter_mut()
                .find(|a| a.id == id && a.user_id == user_id)?;
            let now = Utc::now();
            let previous = std::mem::replace(&mut analysis.result, result);
            analysis.updated_at = now;
            let updated = analysis.clone();
            t.history.push((
                user_id,
                AnalysisSnapshot {
                    id: Uuid::new_v4(),
                    analysis_id: id,
                    overall_score: previous.overall_score,
                    result: previous,
                    recorded_at: now,
                },
            ));
            Some(updated)
        }))
    }

    async fn analysis_history(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Vec<AnalysisSnapshot>>, AppError> {
        Ok(self.with(|t| {
            if !t.analyses.iter().any(|a| a.id == id && a.user_id == user_id) {
                return None;
            }
            let mut snapshots: Vec<_> = t
                .history
                .iter()
                .filter(|(owner, s)| *owner == user_id && s.analysis_id == id)
                .map(|(_, s)| s.clone())
                .collect();
            snapshots.reverse();
            Some(snapshots)
        }))
    }

    async fn delete_analysis(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            let before = t.analyses.len();
            t.analyses.retain(|a| !(a.id == id && a.user_id == user_id));
            t.analyses.len() != before
        }))
    }

    async fn analysis_stats(&self, user_id: Uuid) -> Result<AnalysisStats, AppError> {
        Ok(self.with(|t| {
            let scores: Vec<i32> = t
                .analyses
                .iter()
                .filter(|a| a.user_id == user_id)
                .map(|a| a.result.overall_score)
                .collect();
            AnalysisStats {
                total: scores.len() as i64,
                average_score: (!scores.is_empty())
                    .then(|| scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64),
                best_score: scores.iter().copied().max(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{ResumeContent, ResumeType};

    async fn seeded() -> (MemoryStore, Uuid, NewAnalysis) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
                name: None,
            })
            .await
            .unwrap();
        let resume = store
            .insert_resume(
                user.id,
                NewResume {
                    title: "Main CV".into(),
                    resume_type: ResumeType::Form,
                    content: ResumeContent::default(),
                    file: None,
                },
            )
            .await
            .unwrap();
        let job = store
            .insert_job(
                user.id,
                NewJob {
                    title: "Engineer".into(),
                    description: "Build services".into(),
                },
            )
            .await
            .unwrap();
        let new = NewAnalysis {
            resume_id: resume.id,
            job_desc_id: job.id,
            result: AnalysisResult::default(),
        };
        (store, user.id, new)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_pair() {
        let (store, user_id, new) = seeded().await;
        store.insert_analysis(user_id, new.clone()).await.unwrap();

        let err = store.insert_analysis(user_id, new).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == DUPLICATE_ANALYSIS));
        assert_eq!(store.analysis_count(), 1);
    }
}
