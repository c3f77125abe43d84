use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and cache size.
/// `cached_cvs` is null when caching is disabled or the store is unreachable.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let cached_cvs = state.engine.cached_cvs().await.unwrap_or_else(|e| {
        warn!("Health check could not count cached CVs: {e}");
        None
    });

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "cv-matcher",
        "llm_model": state.config.llm_model,
        "vector_store": state.config.vector_store.label(),
        "cached_cvs": cached_cvs,
    }))
}
