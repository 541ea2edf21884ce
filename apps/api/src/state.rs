use std::sync::Arc;

use crate::auth::provider::AuthProvider;
use crate::auth::token::JwtKeys;
use crate::config::Config;
use crate::llm_client::CompletionBackend;
use crate::mailer::Mailer;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
/// Nothing here is mutated per request; the database is the only shared state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Completion backend. Default: the OpenAI `LlmClient`.
    pub llm: Arc<dyn CompletionBackend>,
    pub jwt: JwtKeys,
    pub mailer: Mailer,
    pub auth_provider: Option<AuthProvider>,
    pub config: Config,
}
