use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Per-category keyword coverage reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordData {
    pub category: String,
    pub matched: i32,
    pub total: i32,
    pub percentage: i32,
}

/// Normalized analysis result plus the verbatim model payload.
///
/// `ai_response` has no enforced schema; it keeps whatever the provider returned so
/// new response fields survive without a migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: i32,
    pub keyword_match: i32,
    pub skills_match: i32,
    pub experience_match: i32,
    pub format_score: i32,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub keyword_data: Vec<KeywordData>,
    pub detailed_analysis: Option<Value>,
    pub recommendations: Option<Value>,
    pub ai_response: Value,
}

/// Title-only summary of a related record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationPreview {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub job_desc_id: Uuid,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub resume: RelationPreview,
    pub job_description: RelationPreview,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub resume_id: Uuid,
    pub job_desc_id: Uuid,
    pub result: AnalysisResult,
}

/// A previous result kept when an analysis is re-run in place.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub overall_score: i32,
    pub result: AnalysisResult,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate score figures for a user's analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total: i64,
    pub average_score: Option<f64>,
    pub best_score: Option<i32>,
}

/// One rewritten resume bullet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulletImprovement {
    pub original: String,
    pub improved: String,
    pub reason: String,
}

/// Targeted edits for one resume against one job. Returned to the caller, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationSuggestions {
    pub summary: String,
    pub skills_to_add: Vec<String>,
    pub keywords_to_add: Vec<String>,
    pub bullet_improvements: Vec<BulletImprovement>,
}
