mod config;
mod embeddings;
mod errors;
mod extraction;
mod llm_client;
mod matching;
mod routes;
mod state;
mod uploads;
mod vector_store;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, VectorStoreBackend};
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::llm_client::{LanguageModel, OllamaClient};
use crate::matching::pipeline::MatchEngine;
use crate::routes::build_router;
use crate::state::AppState;
use crate::uploads::UploadStore;
use crate::vector_store::{CvIndex, InMemoryVectorStore, RedisVectorStore, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV matcher v{}", env!("CARGO_PKG_VERSION"));

    // Model server clients
    let llm: Arc<dyn LanguageModel> =
        Arc::new(OllamaClient::new(&config.ollama_url, &config.llm_model)?);
    info!("LLM client initialized (model: {})", llm.model_name());

    let embedder: Arc<dyn Embedder> =
        Arc::new(OllamaEmbedder::new(&config.ollama_url, &config.embedding_model)?);
    info!("Embedder initialized (model: {})", embedder.model_name());

    // CV cache
    let store: Option<Arc<dyn VectorStore>> = match &config.vector_store {
        VectorStoreBackend::Redis { url, key_prefix } => {
            Some(Arc::new(RedisVectorStore::new(url, key_prefix.clone())?))
        }
        VectorStoreBackend::Memory => Some(Arc::new(InMemoryVectorStore::new())),
        VectorStoreBackend::Disabled => None,
    };
    info!("Vector store: {}", config.vector_store.label());
    let index = store.map(|store| CvIndex::new(store, embedder.clone()));

    let engine = MatchEngine::new(
        llm,
        embedder,
        index,
        config.max_workers,
        config.stage_timeout,
    );
    info!(
        "Match engine ready ({} workers, {:?} per model call, cache {})",
        config.max_workers,
        config.stage_timeout,
        if engine.store_enabled() { "on" } else { "off" }
    );

    let state = AppState {
        uploads: UploadStore::new(config.upload_dir.clone()),
        engine: Arc::new(engine),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
