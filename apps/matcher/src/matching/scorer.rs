//! Relevance Scoring — pluggable, trait-based rubric scorer for a CV against a job.
//!
//! `LlmRelevanceScorer` is the production backend. Whatever goes wrong (model
//! unreachable, reply unparseable, score non-numeric) the scorer answers with
//! `ScoreResult::failed()`, so callers never handle a scoring error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::llm_client::json_extract::extract_json_object;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{complete_within, LanguageModel};
use crate::matching::models::{RubricWeights, ScoreResult, StructuredCv};
use crate::matching::prompts::{SCORE_PROMPT_TEMPLATE, SCORE_SYSTEM};

/// The scorer trait. Carried in the `MatchEngine` as `Arc<dyn RelevanceScorer>`.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(
        &self,
        cv: &StructuredCv,
        job_description: &str,
        rubric: &RubricWeights,
    ) -> ScoreResult;
}

pub struct LlmRelevanceScorer {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LlmRelevanceScorer {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl RelevanceScorer for LlmRelevanceScorer {
    async fn score(
        &self,
        cv: &StructuredCv,
        job_description: &str,
        rubric: &RubricWeights,
    ) -> ScoreResult {
        let prompt = build_score_prompt(cv, job_description, rubric);

        match complete_within(self.llm.as_ref(), &prompt, SCORE_SYSTEM, self.timeout).await {
            Ok(reply) => score_from_reply(&reply),
            Err(e) => {
                warn!("Scoring call failed, using failure record: {e}");
                ScoreResult::failed()
            }
        }
    }
}

/// Converts a raw model reply into a `ScoreResult`. Never fails.
pub fn score_from_reply(reply: &str) -> ScoreResult {
    match extract_json_object(reply).as_ref().and_then(ScoreResult::from_value) {
        Some(score) => {
            debug!("Scored: {}/100", score.relevance_score);
            score
        }
        None => {
            warn!(
                "Score degraded: unusable model reply: {:?}",
                reply.chars().take(200).collect::<String>()
            );
            ScoreResult::failed()
        }
    }
}

/// Fills the rubric template. The candidate's name and email are left out so the
/// justification cannot refer to them.
fn build_score_prompt(cv: &StructuredCv, job_description: &str, rubric: &RubricWeights) -> String {
    let (technical_pct, soft_pct) = rubric.percentages();
    let experience_json =
        serde_json::to_string_pretty(&cv.experience).unwrap_or_else(|_| "[]".to_string());

    fill_template(
        SCORE_PROMPT_TEMPLATE,
        &[
            ("technical_pct", &technical_pct.to_string()),
            ("soft_pct", &soft_pct.to_string()),
            ("technical_skills", &cv.technical_skills.join(", ")),
            ("soft_skills", &cv.soft_skills.join(", ")),
            ("experience_json", &experience_json),
            ("education", &cv.education),
            // user-supplied text goes last so its braces are never re-substituted
            ("job_description", job_description),
        ],
    )
}
