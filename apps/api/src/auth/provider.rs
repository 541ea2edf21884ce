//! Optional external auth provider. Only session sign-out is delegated; local JWTs
//! remain the source of truth for every request.

use reqwest::Client;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AuthProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AuthProvider {
    /// `None` unless both URL and key are configured.
    pub fn from_config(base_url: Option<&str>, api_key: Option<&str>) -> Option<Self> {
        match (base_url, api_key) {
            (Some(url), Some(key)) => Some(Self {
                client: Client::new(),
                base_url: url.trim_end_matches('/').to_string(),
                api_key: key.to_string(),
            }),
            _ => None,
        }
    }

    /// Best-effort: failures are logged and swallowed.
    pub async fn sign_out(&self, access_token: &str) {
        let result = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => info!("External auth session signed out"),
            Err(e) => warn!("External auth sign-out failed: {e}"),
        }
    }
}
