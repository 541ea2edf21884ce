//! Resume request bodies and their combined validation.

use serde::Deserialize;
use validator::Validate;

use crate::errors::AppError;
use crate::models::resume::{ResumeContent, ResumePatch, ResumeType};
use crate::validation::{lenient, messages_for};

const TYPE_MESSAGE: &str = "Type must be either 'form' or 'file'";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResumeRequest {
    #[serde(default, deserialize_with = "lenient::text")]
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: String,
    /// Kept as text so an unknown value is reported with the other violations.
    #[serde(rename = "type", default, deserialize_with = "lenient::optional_text")]
    pub resume_type: Option<String>,
    #[serde(default)]
    pub content: ResumeContent,
}

impl CreateResumeRequest {
    /// Form resumes must carry complete content. File resumes get theirs from the
    /// upload pipeline, so their content is not checked.
    pub fn check(&self) -> Result<ResumeType, AppError> {
        let mut messages = messages_for(self);
        let resume_type = self.resume_type.as_deref().and_then(ResumeType::from_wire);
        match resume_type {
            None => messages.push(TYPE_MESSAGE.to_string()),
            Some(ResumeType::Form) => messages.extend(content_messages(&self.content)),
            Some(ResumeType::File) => {}
        }

        match (resume_type, messages.is_empty()) {
            (Some(resume_type), true) => Ok(resume_type),
            _ => Err(AppError::Validation(messages.join("; "))),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResumeRequest {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::optional_text")]
    pub resume_type: Option<String>,
    pub content: Option<ResumeContent>,
    pub is_active: Option<bool>,
}

impl UpdateResumeRequest {
    fn parsed_type(&self) -> Option<ResumeType> {
        self.resume_type.as_deref().and_then(ResumeType::from_wire)
    }

    /// `current` is the stored type; new content is checked against whichever type
    /// the resume will have after the update.
    pub fn check(&self, current: ResumeType) -> Result<(), AppError> {
        let mut messages = messages_for(self);
        if self.resume_type.is_some() && self.parsed_type().is_none() {
            messages.push(TYPE_MESSAGE.to_string());
        }
        if let Some(content) = &self.content {
            if self.parsed_type().unwrap_or(current) == ResumeType::Form {
                messages.extend(content_messages(content));
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(messages.join("; ")))
        }
    }

    pub fn into_patch(self) -> ResumePatch {
        ResumePatch {
            resume_type: self.parsed_type(),
            title: self.title,
            content: self.content,
            is_active: self.is_active,
        }
    }
}

/// Top-level content rules plus one message per incomplete entry field,
/// e.g. "Experience 1: description is required".
pub fn content_messages(content: &ResumeContent) -> Vec<String> {
    let experience = content.experience.iter().enumerate().flat_map(|(i, entry)| {
        messages_for(entry)
            .into_iter()
            .map(move |msg| format!("Experience {}: {msg}", i + 1))
    });
    let education = content.education.iter().enumerate().flat_map(|(i, entry)| {
        messages_for(entry)
            .into_iter()
            .map(move |msg| format!("Education {}: {msg}", i + 1))
    });

    messages_for(content)
        .into_iter()
        .chain(experience)
        .chain(education)
        .collect()
}
