//! Structured CV Parser — one model call per CV, lenient recovery of the reply.

use std::time::Duration;

use tracing::warn;

use crate::llm_client::json_extract::extract_json_object;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{complete_within, LanguageModel, LlmError};
use crate::matching::models::StructuredCv;
use crate::matching::prompts::{CV_PARSE_PROMPT_TEMPLATE, CV_PARSE_SYSTEM};

/// Asks the model for the CV's structured fields.
///
/// Only an unreachable model is an error. An unusable reply degrades to
/// `StructuredCv::default()` and is logged.
pub async fn parse_cv(
    cv_text: &str,
    llm: &dyn LanguageModel,
    limit: Duration,
) -> Result<StructuredCv, LlmError> {
    let prompt = fill_template(CV_PARSE_PROMPT_TEMPLATE, &[("cv_text", cv_text)]);
    let reply = complete_within(llm, &prompt, CV_PARSE_SYSTEM, limit).await?;
    Ok(structured_cv_from_reply(&reply))
}

/// Converts a raw model reply into a `StructuredCv`. Never fails.
pub fn structured_cv_from_reply(reply: &str) -> StructuredCv {
    match extract_json_object(reply).as_ref().and_then(StructuredCv::from_value) {
        Some(cv) => cv,
        None => {
            warn!(
                "CV parse degraded: no usable JSON in model reply ({} chars): {:?}",
                reply.len(),
                reply.chars().take(120).collect::<String>()
            );
            StructuredCv::default()
        }
    }
}
