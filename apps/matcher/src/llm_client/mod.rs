/// LLM Client — the single point of entry for all language-model calls in the matcher.
///
/// No other module talks to the model server's generate endpoint directly.
/// Callers depend on the `LanguageModel` trait so tests can substitute a scripted model.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod json_extract;
pub mod prompts;

const HTTP_TIMEOUT_SECS: u64 = 120;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Giving up after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

/// Anything that turns a prompt into free-form text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
/// Deterministic sampling (temperature 0) with retry on 429 / 5xx / transport errors.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
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
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(&request_body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OllamaError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let generated: GenerateResponse = response.json().await?;

            debug!(
                "LLM call succeeded: model={}, prompt_tokens={:?}, output_tokens={:?}",
                self.model, generated.prompt_eval_count, generated.eval_count
            );

            // Blank replies are returned as-is.
            return Ok(generated.response);
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted {
            retries: MAX_RETRIES,
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Runs a model call with an upper bound on how long the caller will wait.
pub async fn complete_within(
    llm: &dyn LanguageModel,
    prompt: &str,
    system: &str,
    limit: Duration,
) -> Result<String, LlmError> {
    tokio::time::timeout(limit, llm.complete(prompt, system))
        .await
        .map_err(|_| LlmError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve_generate_reply, ScriptedLlm};

    #[test]
    fn test_generate_request_serializes_ollama_shape() {
        let body = GenerateRequest {
            model: "mistral",
            prompt: "hello",
            system: "be terse",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "mistral");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.0);
    }

    #[test]
    fn test_generate_response_tolerates_missing_counters() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"response": "{}", "done": true}"#).unwrap();
        assert_eq!(parsed.response, "{}");
        assert!(parsed.eval_count.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_within_times_out_stalled_call() {
        let llm = ScriptedLlm::stalled();
        let err = complete_within(&llm, "p", "s", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_blank_generate_reply_is_returned_not_rejected() {
        let base_url = serve_generate_reply("   ").await;
        let client = OllamaClient::new(base_url, "mistral").unwrap();
        let reply = client.complete("p", "s").await.unwrap();
        assert_eq!(reply, "   ");
    }

    #[tokio::test]
    async fn test_complete_within_passes_reply_through() {
        let llm = ScriptedLlm::always("```json\n{}\n```");
        let reply = complete_within(&llm, "p", "s", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(reply.contains("{}"));
    }
}
