//! Test doubles for the model-facing traits.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};

use crate::embeddings::{Embedder, EmbeddingError};
use crate::llm_client::{LanguageModel, LlmError};

#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Stall,
}

/// Language model that answers from a script keyed by substrings of the prompt.
pub struct ScriptedLlm {
    routes: Vec<(String, Reply)>,
    fallback: Reply,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn always(reply: &str) -> Self {
        Self::with_fallback(Reply::Text(reply.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_fallback(Reply::Fail)
    }

    pub fn stalled() -> Self {
        Self::with_fallback(Reply::Stall)
    }

    fn with_fallback(fallback: Reply) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Replies with `reply` whenever the prompt contains `needle`. First match wins.
    pub fn route(mut self, needle: &str, reply: &str) -> Self {
        self.routes
            .push((needle.to_string(), Reply::Text(reply.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str) -> Self {
        self.routes.push((needle.to_string(), Reply::Fail));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .routes
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(LlmError::Api {
                status: 503,
                message: "model server unavailable".to_string(),
            }),
            Reply::Stall => std::future::pending().await,
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Bag-of-keywords embedder: dimension `i` counts occurrences of `vocab[i]`.
pub struct KeywordEmbedder {
    vocab: Vec<String>,
    fail_on: Option<String>,
    stall: bool,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocab: &[&str]) -> Self {
        Self {
            vocab: vocab.iter().map(|w| w.to_lowercase()).collect(),
            fail_on: None,
            stall: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Texts containing `needle` fail as if the service were down.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocab
            .iter()
            .map(|word| lower.matches(word.as_str()).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            return std::future::pending().await;
        }
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(EmbeddingError::Api {
                    status: 503,
                    message: "embedding server unavailable".to_string(),
                });
            }
        }
        Ok(self.vector_for(text))
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Starts a local `/api/generate` endpoint that always answers with `reply`.
/// Returns its base URL.
pub async fn serve_generate_reply(reply: &str) -> String {
    let body = json!({"model": "mistral", "response": reply, "done": true});
    let app = Router::new().route(
        "/api/generate",
        post(move |Json(_request): Json<Value>| {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
