//! Candidate Ranker — fuses similarity with rubric relevance and orders the shortlist.

use crate::matching::models::{FusionWeights, RankedCandidate};

/// `w_sim · similarity + w_rel · (relevance / 100)`.
///
/// Similarity is clamped to [0, 1] first, so the result is never negative for
/// non-negative weights and is non-decreasing in both inputs.
pub fn combined_score(similarity: f32, relevance_score: u8, weights: &FusionWeights) -> f32 {
    let similarity = if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let relevance = f32::from(relevance_score.min(100)) / 100.0;
    weights.similarity * similarity + weights.relevance * relevance
}

/// Sorts by `combined_score` descending and keeps the first `top_n`.
/// The sort is stable: equal scores keep their incoming order.
pub fn rank_candidates(mut candidates: Vec<RankedCandidate>, top_n: usize) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    candidates.truncate(top_n);
    candidates
}
