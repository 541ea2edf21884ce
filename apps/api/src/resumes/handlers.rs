//! Axum route handlers for resumes, including file upload and download.

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::engine;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extraction::{extract_text, DocumentKind};
use crate::models::pagination::{ListQuery, Page};
use crate::models::resume::{NewResume, Resume, ResumeType, StoredFile};
use crate::response::{created, ok, ok_with_message, JsonResponse};
use crate::resumes::schema::{CreateResumeRequest, UpdateResumeRequest};
use crate::resumes::storage::FileStore;
use crate::state::AppState;
use crate::validation::{path_id, ApiJson};

const RESUME: &str = "Resume";
const FILE_FIELD: &str = "resume";
const TITLE_FIELD: &str = "title";
const MAX_TITLE_CHARS: usize = 100;
const DEFAULT_UPLOAD_TITLE: &str = "Uploaded Resume";

/// One file part read from a multipart body.
struct UploadedFile {
    original_name: String,
    content_type: String,
    bytes: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// CRUD
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<JsonResponse<Page<Resume>>, AppError> {
    let page = state.store.list_resumes(auth.id, &query.params()).await?;
    Ok(ok(page))
}

/// GET /api/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Resume>, AppError> {
    let resume = owned_resume(&state, auth.id, &id).await?;
    Ok(ok(resume))
}

/// POST /api/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateResumeRequest>,
) -> Result<(StatusCode, JsonResponse<Resume>), AppError> {
    let resume_type = req.check()?;

    let resume = state
        .store
        .insert_resume(
            auth.id,
            NewResume {
                title: req.title,
                resume_type,
                content: req.content,
                file: None,
            },
        )
        .await?;

    info!("Created resume {} for user {}", resume.id, auth.id);
    Ok(created(resume))
}

/// PATCH /api/resumes/:id
///
/// Only the fields present in the body change.
pub async fn handle_update_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateResumeRequest>,
) -> Result<JsonResponse<Resume>, AppError> {
    let existing = owned_resume(&state, auth.id, &id).await?;
    req.check(existing.resume_type)?;

    let resume = state
        .store
        .update_resume(auth.id, existing.id, req.into_patch())
        .await?
        .ok_or_else(|| AppError::not_found(RESUME))?;
    Ok(ok(resume))
}

/// DELETE /api/resumes/:id
///
/// Deletes the row, then its stored file. A file that is already gone, or one that
/// cannot be removed, does not fail the request once the row is deleted.
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<JsonResponse<Value>, AppError> {
    let id = path_id(&id, RESUME)?;
    let deleted = state
        .store
        .delete_resume(auth.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(RESUME))?;

    if let Some(file_path) = &deleted.file_path {
        if let Err(e) = FileStore::new(&state.config.upload_dir).remove(file_path).await {
            warn!("Resume {} deleted but its file could not be removed: {e}", deleted.id);
        }
    }

    info!("Deleted resume {} for user {}", deleted.id, auth.id);
    Ok(ok_with_message(json!({}), "Resume deleted successfully"))
}

// ────────────────────────────────────────────────────────────────────────────
// Files
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/resumes/upload
///
/// multipart: `resume` (pdf, docx or txt) and optional `title`.
/// The file is type-checked before it is written, and removed again if text
/// extraction, parsing or the insert fails.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, JsonResponse<Resume>), AppError> {
    let mut upload: Option<UploadedFile> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD => {
                let original_name = field.file_name().unwrap_or("resume").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                upload = Some(UploadedFile {
                    original_name,
                    content_type,
                    bytes,
                });
            }
            TITLE_FIELD => title = Some(field.text().await?),
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        AppError::Validation("No file uploaded. Attach the resume as the 'resume' field".to_string())
    })?;

    let kind = DocumentKind::from_mime(&upload.content_type)?;
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    let max = state.config.max_upload_bytes;
    if upload.bytes.len() > max {
        return Err(AppError::Validation(format!(
            "File is too large. Maximum size is {} MB",
            max / (1024 * 1024)
        )));
    }

    let files = FileStore::new(&state.config.upload_dir);
    let stored_name = FileStore::unique_name(kind.extension());
    let path = files.save(&stored_name, &upload.bytes).await?;

    let title = upload_title(title.as_deref(), &upload.original_name);
    let stored = StoredFile {
        original_name: upload.original_name,
        file_path: stored_name.clone(),
        file_size: upload.bytes.len() as i64,
    };

    let outcome = ingest_upload(&state, auth.id, kind, &path, title, stored).await;
    if outcome.is_err() {
        if let Err(e) = files.remove(&stored_name).await {
            warn!("Failed to clean up upload {stored_name}: {e}");
        }
    }
    let resume = outcome?;

    info!("Uploaded resume {} for user {}", resume.id, auth.id);
    Ok(created(resume))
}

async fn ingest_upload(
    state: &AppState,
    user_id: Uuid,
    kind: DocumentKind,
    path: &FsPath,
    title: String,
    file: StoredFile,
) -> Result<Resume, AppError> {
    let text = extract_text(kind, path).await?;
    let content = engine::parse_resume_text(state.llm.as_ref(), &text).await?;

    state
        .store
        .insert_resume(
            user_id,
            NewResume {
                title,
                resume_type: ResumeType::File,
                content,
                file: Some(file),
            },
        )
        .await
}

/// GET /api/resumes/:id/download
pub async fn handle_download_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let resume = owned_resume(&state, auth.id, &id).await?;
    let file_path = resume
        .file_path
        .as_deref()
        .ok_or_else(|| AppError::not_found("File"))?;

    let bytes = FileStore::new(&state.config.upload_dir).read(file_path).await?;

    let mime = DocumentKind::from_path(FsPath::new(file_path))
        .map(DocumentKind::mime)
        .unwrap_or("application/octet-stream");
    let download_name = resume.original_name.as_deref().unwrap_or(file_path);
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        header_safe(download_name)
    ))
    .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(mime)),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn owned_resume(state: &AppState, user_id: Uuid, raw_id: &str) -> Result<Resume, AppError> {
    let id = path_id(raw_id, RESUME)?;
    state
        .store
        .get_resume(user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found(RESUME))
}

/// Explicit title if given, else the file name without its extension.
fn upload_title(explicit: Option<&str>, original_name: &str) -> String {
    let candidate = explicit
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| FsPath::new(original_name).file_stem().and_then(|s| s.to_str()))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_TITLE);
    candidate.chars().take(MAX_TITLE_CHARS).collect()
}

/// Keeps a file name usable inside a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
