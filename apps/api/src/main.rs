mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod extraction;
mod jobs;
mod llm_client;
mod mailer;
mod models;
mod response;
mod resumes;
mod routes;
mod state;
mod store;
mod users;
mod validation;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::provider::AuthProvider;
use crate::auth::token::JwtKeys;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::mailer::Mailer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.ai_timeout,
    )?;
    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; analysis and resume parsing are disabled");
    }
    info!("LLM client initialized (model: {})", llm.model());

    let mailer = Mailer::new(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
        config.email_from.clone(),
    );
    if !mailer.is_configured() {
        warn!("EMAIL_API_KEY is not set; password recovery is disabled");
    }

    let auth_provider = AuthProvider::from_config(
        config.auth_provider_url.as_deref(),
        config.auth_provider_key.as_deref(),
    );

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    // Build app state
    let state = AppState {
        store,
        llm: Arc::new(llm),
        jwt: JwtKeys::new(&config.jwt_secret, config.jwt_expiry_hours),
        mailer,
        auth_provider,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
