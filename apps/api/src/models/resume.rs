use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "resume_type", rename_all = "lowercase")]
pub enum ResumeType {
    Form,
    File,
}

impl ResumeType {
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "form" => Some(Self::Form),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Structured resume body. Missing, `null` or wrong-typed fields deserialize to empty
/// values so prompt construction and rendering never see a partial record, and the
/// validation rules name every gap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ResumeContent {
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "Professional summary is required"))]
    pub summary: String,
    #[serde(deserialize_with = "lenient::list")]
    #[validate(length(min = 1, message = "At least one experience entry is required"))]
    pub experience: Vec<ExperienceEntry>,
    #[serde(deserialize_with = "lenient::list")]
    #[validate(length(min = 1, message = "At least one education entry is required"))]
    pub education: Vec<EducationEntry>,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "Skills are required"))]
    pub skills: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExperienceEntry {
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "company is required"))]
    pub company: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "position is required"))]
    pub position: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "duration is required"))]
    pub duration: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EducationEntry {
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "institution is required"))]
    pub institution: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "degree is required"))]
    pub degree: String,
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(min = 1, message = "year is required"))]
    pub year: String,
    #[serde(deserialize_with = "lenient::text")]
    pub gpa: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub resume_type: ResumeType,
    pub content: ResumeContent,
    pub original_name: Option<String>,
    /// Name of the stored file inside the upload directory. Never sent to clients.
    #[serde(skip_serializing)]
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upload metadata for file-backed resumes.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub title: String,
    pub resume_type: ResumeType,
    pub content: ResumeContent,
    pub file: Option<StoredFile>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ResumePatch {
    pub title: Option<String>,
    pub resume_type: Option<ResumeType>,
    pub content: Option<ResumeContent>,
    pub is_active: Option<bool>,
}
