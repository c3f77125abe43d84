use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which vector-store backend caches processed CVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreBackend {
    Redis { url: String, key_prefix: String },
    Memory,
    Disabled,
}

impl VectorStoreBackend {
    pub fn label(&self) -> &'static str {
        match self {
            VectorStoreBackend::Redis { .. } => "redis",
            VectorStoreBackend::Memory => "memory",
            VectorStoreBackend::Disabled => "none",
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ollama_url: String,
    pub llm_model: String,
    pub embedding_model: String,
    pub upload_dir: PathBuf,
    pub max_workers: usize,
    pub stage_timeout: Duration,
    pub vector_store: VectorStoreBackend,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "8001")
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let max_workers = var("MAX_WORKERS", "4")
            .parse::<usize>()
            .context("MAX_WORKERS must be a positive integer")?;
        if max_workers == 0 {
            bail!("MAX_WORKERS must be at least 1");
        }

        let stage_timeout_secs = var("STAGE_TIMEOUT_SECS", "120")
            .parse::<u64>()
            .context("STAGE_TIMEOUT_SECS must be a whole number of seconds")?;
        if stage_timeout_secs == 0 {
            bail!("STAGE_TIMEOUT_SECS must be at least 1");
        }

        let vector_store = match var("VECTOR_STORE", "memory").to_lowercase().as_str() {
            "redis" => VectorStoreBackend::Redis {
                url: lookup("REDIS_URL")
                    .context("REDIS_URL must be set when VECTOR_STORE=redis")?,
                key_prefix: var("REDIS_KEY_PREFIX", "cvstore"),
            },
            "memory" => VectorStoreBackend::Memory,
            "none" | "disabled" => VectorStoreBackend::Disabled,
            other => bail!("VECTOR_STORE must be one of redis, memory, none (got '{other}')"),
        };

        Ok(Config {
            port,
            rust_log: var("RUST_LOG", "info"),
            ollama_url: var("OLLAMA_URL", "http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            llm_model: var("LLM_MODEL", "mistral:7b-instruct-q4_K_M"),
            embedding_model: var("EMBEDDING_MODEL", "all-minilm"),
            upload_dir: PathBuf::from(var("UPLOAD_DIR", "uploaded_cvs")),
            max_workers,
            stage_timeout: Duration::from_secs(stage_timeout_secs),
            vector_store,
        })
    }
}
