//! LLM client: the single point of entry for all OpenAI calls.
//!
//! No other module talks to the completion API directly. Callers depend on the
//! `CompletionBackend` trait so analysis logic can run against canned output in tests.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Used when `OPENAI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.3;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenAI API key is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to the completion API timed out")]
    Timeout,

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM returned invalid JSON: {0}")]
    Malformed(String),

    #[error("LLM response is missing required fields: {0}")]
    Incomplete(String),
}

/// Anything that can turn a system + user prompt into model text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

/// OpenAI Chat Completions client with bounded timeout and retry on transient failures.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the completion API, returning the full response object.
    /// Retries 5xx and transient 429 responses with exponential backoff. Quota
    /// exhaustion and timeouts are returned immediately.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<ChatResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let request_body = ChatRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(OPENAI_API_URL)
                .bearer_auth(api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() => return Err(LlmError::Timeout),
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let error = classify_failure(status.as_u16(), &body);
                match error {
                    LlmError::RateLimited(_) => {
                        warn!("LLM API rate limited: {body}");
                        last_error = Some(error);
                        continue;
                    }
                    LlmError::Api { status, .. } if status >= 500 => {
                        warn!("LLM API returned {status}: {body}");
                        last_error = Some(error);
                        continue;
                    }
                    other => return Err(other),
                }
            }

            let chat: ChatResponse = match response.json().await {
                Ok(chat) => chat,
                Err(e) if e.is_timeout() => return Err(LlmError::Timeout),
                Err(e) => return Err(LlmError::Malformed(e.to_string())),
            };

            if let Some(usage) = &chat.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat);
        }

        Err(last_error.unwrap_or_else(|| {
            LlmError::RateLimited(format!("gave up after {MAX_RETRIES} attempts"))
        }))
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, system).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Maps a non-success provider response to an error kind. A 429 is either an
/// exhausted quota (billing, not worth retrying) or a transient rate limit.
fn classify_failure(status: u16, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<OpenAiError>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());
    let is_quota = parsed.as_ref().is_some_and(|e| {
        e.error.code.as_deref() == Some("insufficient_quota")
            || e.error.kind.as_deref() == Some("insufficient_quota")
    });

    match status {
        429 if is_quota => LlmError::QuotaExceeded(message),
        429 => LlmError::RateLimited(message),
        _ if is_quota => LlmError::QuotaExceeded(message),
        _ => LlmError::Api { status, message },
    }
}

/// Test double that answers every prompt with the same text and counts calls.
#[cfg(test)]
pub struct CannedBackend {
    reply: String,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl CannedBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl CompletionBackend for CannedBackend {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_insufficient_quota() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        assert!(matches!(
            classify_failure(429, body),
            LlmError::QuotaExceeded(m) if m.contains("quota")
        ));
    }

    #[test]
    fn test_classify_rate_limit() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        assert!(matches!(classify_failure(429, body), LlmError::RateLimited(_)));
    }

    #[test]
    fn test_classify_unparseable_body() {
        match classify_failure(502, "Bad Gateway") {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_auth_failure() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert!(matches!(
            classify_failure(401, body),
            LlmError::Api { status: 401, .. }
        ));
    }

    #[test]
    fn test_chat_response_text() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}],"usage":{"prompt_tokens":5,"completion_tokens":3}}"#;
        let chat: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(chat.text(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_chat_response_blank_text_is_none() {
        let raw = r#"{"choices":[{"message":{"content":"   "}}]}"#;
        let chat: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(chat.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client =
            LlmClient::new(None, DEFAULT_MODEL.to_string(), Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.complete("sys", "prompt").await,
            Err(LlmError::NotConfigured)
        ));
    }
}
