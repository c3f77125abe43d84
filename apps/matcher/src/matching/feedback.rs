//! Short improvement advice for one CV against one job.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::extraction::{extract_text, ExtractionError};
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{complete_within, LanguageModel, LlmError};
use crate::matching::prompts::{FEEDBACK_PROMPT_TEMPLATE, FEEDBACK_SYSTEM};

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Feedback generation failed: {0}")]
    Upstream(#[from] LlmError),
}

/// Extracts the CV at `cv_path` and asks the model for a ~75-word summary.
pub async fn cv_feedback(
    cv_path: &Path,
    job_description: &str,
    llm: &dyn LanguageModel,
    limit: Duration,
) -> Result<String, FeedbackError> {
    let cv_text = extract_text(cv_path).await?;
    let prompt = fill_template(
        FEEDBACK_PROMPT_TEMPLATE,
        &[("cv_text", &cv_text), ("job_description", job_description)],
    );

    let reply = complete_within(llm, &prompt, FEEDBACK_SYSTEM, limit).await?;
    let feedback = reply.trim();
    if feedback.is_empty() {
        return Err(LlmError::EmptyContent.into());
    }

    debug!("Feedback for {}: {} words", cv_path.display(), feedback.split_whitespace().count());
    Ok(feedback.to_string())
}
