use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Absent key disables AI operations; they fail as upstream-unavailable.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ai_timeout: Duration,
    pub auth_provider_url: Option<String>,
    pub auth_provider_key: Option<String>,
    pub email_api_key: Option<String>,
    pub email_api_url: String,
    pub email_from: String,
    pub frontend_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS", 168)?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: optional_env("OPENAI_MODEL")
                .unwrap_or_else(|| crate::llm_client::DEFAULT_MODEL.to_string()),
            ai_timeout: Duration::from_secs(parse_env("AI_TIMEOUT_SECS", 60)?),
            auth_provider_url: optional_env("AUTH_PROVIDER_URL"),
            auth_provider_key: optional_env("AUTH_PROVIDER_KEY"),
            email_api_key: optional_env("EMAIL_API_KEY"),
            email_api_url: optional_env("EMAIL_API_URL")
                .unwrap_or_else(|| crate::mailer::DEFAULT_EMAIL_API_URL.to_string()),
            email_from: optional_env("EMAIL_FROM")
                .unwrap_or_else(|| "no-reply@resume-analyzer.local".to_string()),
            frontend_url: optional_env("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            upload_dir: PathBuf::from(
                optional_env("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            ),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Empty values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        None => Ok(default),
    }
}
