//! Prompt construction and model calls for analysis, resume parsing and optimization.

use serde_json::Value;
use tracing::{debug, info};

use crate::analysis::normalize::{
    ensure_analysis_fields, normalize_analysis, normalize_optimization, normalize_resume_content,
};
use crate::analysis::prompts::{
    ANALYZE_PROMPT_TEMPLATE, ANALYZE_ROLE, OPTIMIZE_PROMPT_TEMPLATE, OPTIMIZE_ROLE,
    PARSE_RESUME_PROMPT_TEMPLATE, PARSE_RESUME_ROLE,
};
use crate::analysis::response::parse_json_payload;
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::{CompletionBackend, LlmError};
use crate::models::analysis::{AnalysisResult, OptimizationSuggestions};
use crate::models::job::JobDescription;
use crate::models::resume::{Resume, ResumeContent};

/// Extracted resume text beyond this many characters is dropped before prompting.
pub const MAX_RESUME_TEXT_CHARS: usize = 15_000;

/// Scores `resume` against `job`.
pub async fn analyze(
    backend: &dyn CompletionBackend,
    resume: &Resume,
    job: &JobDescription,
) -> Result<AnalysisResult, LlmError> {
    let prompt = fill_match_template(ANALYZE_PROMPT_TEMPLATE, resume, job)?;
    let raw = complete_json(backend, ANALYZE_ROLE, &prompt).await?;
    ensure_analysis_fields(&raw)?;

    let result = normalize_analysis(raw);
    info!(
        "Analyzed resume {} against job {}: overall score {}",
        resume.id, job.id, result.overall_score
    );
    Ok(result)
}

/// Turns extracted document text into structured resume content.
pub async fn parse_resume_text(
    backend: &dyn CompletionBackend,
    text: &str,
) -> Result<ResumeContent, LlmError> {
    let prompt = PARSE_RESUME_PROMPT_TEMPLATE
        .replace("{resume_text}", truncate_chars(text, MAX_RESUME_TEXT_CHARS));
    let raw = complete_json(backend, PARSE_RESUME_ROLE, &prompt).await?;
    Ok(normalize_resume_content(&raw))
}

pub async fn optimize(
    backend: &dyn CompletionBackend,
    resume: &Resume,
    job: &JobDescription,
) -> Result<OptimizationSuggestions, LlmError> {
    let prompt = fill_match_template(OPTIMIZE_PROMPT_TEMPLATE, resume, job)?;
    let raw = complete_json(backend, OPTIMIZE_ROLE, &prompt).await?;
    Ok(normalize_optimization(&raw))
}

async fn complete_json(
    backend: &dyn CompletionBackend,
    role: &str,
    prompt: &str,
) -> Result<Value, LlmError> {
    let text = backend.complete(&system_prompt(role), prompt).await?;
    debug!("Model returned {} chars", text.len());
    parse_json_payload(&text)
}

fn fill_match_template(
    template: &str,
    resume: &Resume,
    job: &JobDescription,
) -> Result<String, LlmError> {
    let resume_json = serde_json::to_string_pretty(&resume.content)
        .map_err(|e| LlmError::Malformed(format!("resume serialization failed: {e}")))?;

    Ok(template
        .replace("{resume}", &resume_json)
        .replace("{job_title}", &job.title)
        .replace("{job_description}", &job.description))
}

/// Cuts at a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::CannedBackend;
    use crate::models::resume::ResumeType;
    use chrono::Utc;
    use uuid::Uuid;

    fn resume() -> Resume {
        let now = Utc::now();
        Resume {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Main CV".into(),
            resume_type: ResumeType::Form,
            content: ResumeContent {
                name: "Ada".into(),
                skills: "Rust".into(),
                ..Default::default()
            },
            original_name: None,
            file_path: None,
            file_size: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn job() -> JobDescription {
        let now = Utc::now();
        JobDescription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Rust Engineer".into(),
            description: "Build reliable backend services in Rust for our platform team.".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_analyze_normalizes_output() {
        let backend = CannedBackend::new(
            r#"```json
{"overallScore": 81, "strengths": ["Rust"], "improvements": ["Quantify impact"]}
```"#,
        );
        let result = analyze(&backend, &resume(), &job()).await.unwrap();
        assert_eq!(result.overall_score, 81);
        assert_eq!(result.improvements, vec!["Quantify impact"]);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_incomplete_output() {
        let backend = CannedBackend::new(r#"{"keywordMatch": 40}"#);
        assert!(matches!(
            analyze(&backend, &resume(), &job()).await,
            Err(LlmError::Incomplete(_))
        ));
    }

    #[tokio::test]
    async fn test_analyze_rejects_prose() {
        let backend = CannedBackend::new("Sorry, I can't score this resume.");
        assert!(matches!(
            analyze(&backend, &resume(), &job()).await,
            Err(LlmError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_resume_without_education() {
        let backend = CannedBackend::new(
            r#"{"name": "Ada", "email": "ada@example.com", "experience": [{"company": "Engines"}], "skills": "Maths"}"#,
        );
        let content = parse_resume_text(&backend, "Ada Lovelace\nEngines Ltd")
            .await
            .unwrap();
        assert!(content.education.is_empty());
        assert_eq!(content.experience[0].position, "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_template_embeds_resume_and_job() {
        let prompt = fill_match_template(ANALYZE_PROMPT_TEMPLATE, &resume(), &job()).unwrap();
        assert!(prompt.contains("\"name\": \"Ada\""));
        assert!(prompt.contains("Rust Engineer"));
        assert!(!prompt.contains("{job_description}"));
    }
}
