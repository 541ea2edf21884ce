//! Maps untrusted model JSON onto the stored shapes.
//!
//! Each analysis field is read independently through a fallback chain: the current
//! field name, then its legacy name, then the same field nested under `aiResponse`,
//! then zero or empty. A partially shaped response degrades field by field.

use serde_json::{Map, Value};

use crate::llm_client::LlmError;
use crate::models::analysis::{AnalysisResult, BulletImprovement, KeywordData, OptimizationSuggestions};
use crate::models::resume::{EducationEntry, ExperienceEntry, ResumeContent};

const NESTED_RESPONSE: &str = "aiResponse";

/// (current name, legacy name) pairs.
const OVERALL_SCORE: (&str, &str) = ("overallScore", "matchScore");
const KEYWORD_MATCH: (&str, &str) = ("keywordMatch", "keywordScore");
const SKILLS_MATCH: (&str, &str) = ("skillsMatch", "skillsScore");
const EXPERIENCE_MATCH: (&str, &str) = ("experienceMatch", "experienceScore");
const FORMAT_SCORE: (&str, &str) = ("formatScore", "atsScore");
const STRENGTHS: (&str, &str) = ("strengths", "strongPoints");
const IMPROVEMENTS: (&str, &str) = ("improvements", "weaknesses");
const MISSING_KEYWORDS: (&str, &str) = ("missingKeywords", "missingSkills");
const KEYWORD_DATA: (&str, &str) = ("keywordData", "keywordAnalysis");

fn lookup<'a>(raw: &'a Value, (name, legacy): (&str, &str)) -> Option<&'a Value> {
    [raw.get(name), raw.get(legacy), raw.get(NESTED_RESPONSE).and_then(|n| n.get(name))]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
}

/// Fails with `LlmError::Incomplete` unless the response carries an overall score
/// plus strengths and improvements, under any of their accepted names.
pub fn ensure_analysis_fields(raw: &Value) -> Result<(), LlmError> {
    let missing: Vec<&str> = [OVERALL_SCORE, STRENGTHS, IMPROVEMENTS]
        .into_iter()
        .filter(|field| lookup(raw, *field).is_none())
        .map(|(name, _)| name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LlmError::Incomplete(missing.join(", ")))
    }
}

pub fn normalize_analysis(raw: Value) -> AnalysisResult {
    let score = |field| lookup(&raw, field).map(as_score).unwrap_or(0);
    let list = |field| lookup(&raw, field).map(as_string_list).unwrap_or_default();
    let object = |name: &str| {
        lookup(&raw, (name, name))
            .filter(|v| v.is_object())
            .cloned()
    };

    AnalysisResult {
        overall_score: score(OVERALL_SCORE),
        keyword_match: score(KEYWORD_MATCH),
        skills_match: score(SKILLS_MATCH),
        experience_match: score(EXPERIENCE_MATCH),
        format_score: score(FORMAT_SCORE),
        strengths: list(STRENGTHS),
        improvements: list(IMPROVEMENTS),
        missing_keywords: list(MISSING_KEYWORDS),
        keyword_data: lookup(&raw, KEYWORD_DATA)
            .map(as_keyword_data)
            .unwrap_or_default(),
        detailed_analysis: object("detailedAnalysis"),
        recommendations: object("recommendations"),
        ai_response: raw,
    }
}

/// Every field of the result exists afterwards, and every experience and education
/// entry carries all of its own fields.
pub fn normalize_resume_content(raw: &Value) -> ResumeContent {
    ResumeContent {
        name: text(raw.get("name")),
        email: text(raw.get("email")),
        phone: text(raw.get("phone")),
        summary: text(raw.get("summary")),
        experience: objects(raw.get("experience"))
            .map(|entry| ExperienceEntry {
                company: text(entry.get("company")),
                position: first_text(entry, &["position", "title", "role"]),
                duration: text(entry.get("duration")),
                description: lines(entry.get("description")),
            })
            .collect(),
        education: objects(raw.get("education"))
            .map(|entry| EducationEntry {
                institution: text(entry.get("institution")),
                degree: text(entry.get("degree")),
                year: text(entry.get("year")),
                gpa: text(entry.get("gpa")),
            })
            .collect(),
        skills: match raw.get("skills") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| text(Some(item)))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            other => text(other),
        },
    }
}

pub fn normalize_optimization(raw: &Value) -> OptimizationSuggestions {
    OptimizationSuggestions {
        summary: text(raw.get("summary")),
        skills_to_add: raw.get("skillsToAdd").map(as_string_list).unwrap_or_default(),
        keywords_to_add: raw.get("keywordsToAdd").map(as_string_list).unwrap_or_default(),
        bullet_improvements: objects(raw.get("bulletImprovements"))
            .map(|entry| BulletImprovement {
                original: text(entry.get("original")),
                improved: text(entry.get("improved")),
                reason: text(entry.get("reason")),
            })
            .collect(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Value coercion
// ────────────────────────────────────────────────────────────────────────────

/// Rounded and clamped to 0..=100. Numeric strings are accepted.
fn as_score(value: &Value) -> i32 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 100.0) as i32)
        .unwrap_or(0)
}

fn as_count(value: Option<&Value>) -> i32 {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(|n| n.round().max(0.0) as i32).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i32>().map(|n| n.max(0)).unwrap_or(0),
        _ => 0,
    }
}

fn as_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| text(Some(item)))
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Accepts a list of `{category, matched, total, percentage}` objects or a map keyed
/// by category. A missing percentage is computed from matched and total.
fn as_keyword_data(value: &Value) -> Vec<KeywordData> {
    let entries: Vec<(String, &Map<String, Value>)> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| (text(obj.get("category")), obj))
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(category, v)| v.as_object().map(|obj| (category.clone(), obj)))
            .collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .map(|(category, obj)| {
            let matched = as_count(obj.get("matched"));
            let total = as_count(obj.get("total"));
            let percentage = match obj.get("percentage") {
                Some(v) if !v.is_null() => as_score(v),
                _ if total > 0 => ((f64::from(matched) * 100.0) / f64::from(total))
                    .round()
                    .clamp(0.0, 100.0) as i32,
                _ => 0,
            };
            KeywordData {
                category,
                matched,
                total,
                percentage,
            }
        })
        .collect()
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn first_text(entry: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| text(entry.get(*key)))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// A description may arrive as a list of bullet strings.
fn lines(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text(Some(item)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => text(other),
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
