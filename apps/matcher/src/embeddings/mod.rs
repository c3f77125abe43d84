//! Embedding Generator — fixed-dimension vectors for CV text and job descriptions.
//!
//! One `Embedder` instance is built at startup and shared read-only by every worker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding service returned an empty vector")]
    EmptyVector,

    #[error("Giving up after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("Embedding call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("similarity undefined: {0}")]
    Undefined(String),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by an Ollama-compatible `/api/embeddings` endpoint.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
                continue;
            }
            if !status.is_success() {
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let parsed: EmbedResponse = response.json().await?;
            if parsed.embedding.is_empty() {
                return Err(EmbeddingError::EmptyVector);
            }
            debug!(
                "Embedded {} chars into {} dims",
                text.len(),
                parsed.embedding.len()
            );
            return Ok(parsed.embedding);
        }

        Err(last_error.unwrap_or(EmbeddingError::RetriesExhausted {
            retries: MAX_RETRIES,
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embeds `text`, giving up after `limit`.
pub async fn embed_within(
    embedder: &dyn Embedder,
    text: &str,
    limit: Duration,
) -> Result<Vec<f32>, EmbeddingError> {
    tokio::time::timeout(limit, embedder.embed(text))
        .await
        .map_err(|_| EmbeddingError::Timeout(limit))?
}

/// Cosine similarity `dot(a,b) / (|a|·|b|)`.
///
/// Empty, mismatched, non-finite or zero-norm inputs are errors rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.is_empty() || b.is_empty() {
        return Err(SimilarityError::Undefined("embedding is missing".to_string()));
    }
    if a.len() != b.len() {
        return Err(SimilarityError::Undefined(format!(
            "dimension mismatch ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(SimilarityError::Undefined(
            "embedding contains non-finite values".to_string(),
        ));
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (x, y)| {
        let (x, y) = (*x as f64, *y as f64);
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::Undefined("zero-norm embedding".to_string()));
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}
