//! Transactional email through the provider's HTTP API.

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;

pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

#[derive(Clone)]
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn new(api_url: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            from,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<(), AppError> {
        let html = format!(
            "<p>We received a request to reset your password.</p>\
             <p><a href=\"{reset_link}\">Reset your password</a></p>\
             <p>This link expires in one hour. If you did not request a reset, ignore this email.</p>"
        );
        self.send(to, "Reset your password", html).await
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::UpstreamUnavailable("Email provider is not configured".to_string()))?;

        let body = EmailRequest {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        self.client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::UpstreamUnavailable(format!("Email delivery failed: {e}")))?;

        info!("Sent '{subject}' email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_mailer_is_unavailable() {
        let mailer = Mailer::new(
            DEFAULT_EMAIL_API_URL.into(),
            None,
            "no-reply@example.com".into(),
        );
        assert!(!mailer.is_configured());
        assert!(matches!(
            mailer.send_password_reset("a@b.co", "http://x/reset").await,
            Err(AppError::UpstreamUnavailable(_))
        ));
    }
}
