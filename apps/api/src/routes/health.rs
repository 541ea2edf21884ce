use axum::Json;
use serde_json::{json, Value};

/// GET /api/health
/// Liveness check with the service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-api"
    }))
}
