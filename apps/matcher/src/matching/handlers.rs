use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::models::{check_weight, FusionWeights, RankedCandidate, RubricWeights};
use crate::matching::pipeline::{MatchOutcome, MatchRequest};
use crate::state::AppState;
use crate::vector_store::SearchHit;

pub const DEFAULT_TOP_N: usize = 5;

/// Ranking knobs, accepted both as query parameters and in the JSON body.
/// A query parameter wins over the same key in the body.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct RankingParams {
    pub tech_weight: Option<f32>,
    pub soft_weight: Option<f32>,
    pub top_n: Option<usize>,
    pub similarity_weight: Option<f32>,
    pub relevance_weight: Option<f32>,
}

/// Validated ranking settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingSettings {
    pub top_n: usize,
    pub fusion: FusionWeights,
    pub rubric: RubricWeights,
}

impl RankingParams {
    fn or(self, fallback: RankingParams) -> RankingParams {
        RankingParams {
            tech_weight: self.tech_weight.or(fallback.tech_weight),
            soft_weight: self.soft_weight.or(fallback.soft_weight),
            top_n: self.top_n.or(fallback.top_n),
            similarity_weight: self.similarity_weight.or(fallback.similarity_weight),
            relevance_weight: self.relevance_weight.or(fallback.relevance_weight),
        }
    }

    fn resolve(self) -> Result<RankingSettings, AppError> {
        let rubric_defaults = RubricWeights::default();
        let fusion_defaults = FusionWeights::default();
        let weight = |name: &str, value: Option<f32>, default: f32| {
            check_weight(name, value.unwrap_or(default)).map_err(AppError::Validation)
        };

        Ok(RankingSettings {
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
            rubric: RubricWeights {
                technical: weight("tech_weight", self.tech_weight, rubric_defaults.technical)?,
                soft: weight("soft_weight", self.soft_weight, rubric_defaults.soft)?,
            },
            fusion: FusionWeights {
                similarity: weight(
                    "similarity_weight",
                    self.similarity_weight,
                    fusion_defaults.similarity,
                )?,
                relevance: weight(
                    "relevance_weight",
                    self.relevance_weight,
                    fusion_defaults.relevance,
                )?,
            },
        })
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// POST /match-candidates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchCandidatesBody {
    pub job_title: Option<String>,
    pub job_description: String,
    pub cv_paths: Vec<String>,
    #[serde(flatten)]
    pub params: RankingParams,
}

/// POST /match-candidates
pub async fn handle_match_candidates(
    State(state): State<AppState>,
    query: Result<Query<RankingParams>, QueryRejection>,
    body: Result<Json<MatchCandidatesBody>, JsonRejection>,
) -> Result<Json<MatchOutcome>, AppError> {
    let Query(query) = query?;
    let Json(body) = body?;

    require_text("job_description", &body.job_description)?;
    let settings = query.or(body.params).resolve()?;

    let outcome = state
        .engine
        .match_candidates(MatchRequest {
            job_title: body.job_title.unwrap_or_default(),
            job_description: body.job_description,
            cv_paths: body.cv_paths,
            top_n: settings.top_n,
            fusion: settings.fusion,
            rubric: settings.rubric,
        })
        .await?;

    Ok(Json(outcome))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /hybrid-match
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HybridMatchBody {
    pub job_description: String,
    #[serde(flatten)]
    pub params: RankingParams,
}

#[derive(Debug, Serialize)]
pub struct RankedResponse {
    pub results: Vec<RankedCandidate>,
}

/// POST /hybrid-match
pub async fn handle_hybrid_match(
    State(state): State<AppState>,
    query: Result<Query<RankingParams>, QueryRejection>,
    body: Result<Json<HybridMatchBody>, JsonRejection>,
) -> Result<Json<RankedResponse>, AppError> {
    let Query(query) = query?;
    let Json(body) = body?;

    require_text("job_description", &body.job_description)?;
    let settings = query.or(body.params).resolve()?;

    let results = state
        .engine
        .hybrid_match(
            &body.job_description,
            settings.top_n,
            settings.fusion,
            settings.rubric,
        )
        .await?;
    Ok(Json(RankedResponse { results }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /search-cvs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchCvsBody {
    pub query: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

/// POST /search-cvs
pub async fn handle_search_cvs(
    State(state): State<AppState>,
    body: Result<Json<SearchCvsBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(body) = body?;
    require_text("query", &body.query)?;

    let results = state
        .engine
        .search(&body.query, body.top_n.unwrap_or(DEFAULT_TOP_N))
        .await?;
    Ok(Json(SearchResponse { results }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /cv-feedback
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CvFeedbackBody {
    pub cv_path: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct CvFeedbackResponse {
    pub cv_path: String,
    pub feedback: String,
}

/// POST /cv-feedback
pub async fn handle_cv_feedback(
    State(state): State<AppState>,
    body: Result<Json<CvFeedbackBody>, JsonRejection>,
) -> Result<Json<CvFeedbackResponse>, AppError> {
    let Json(body) = body?;
    require_text("cv_path", &body.cv_path)?;
    require_text("job_description", &body.job_description)?;

    let feedback = state
        .engine
        .feedback(&body.cv_path, &body.job_description)
        .await?;
    Ok(Json(CvFeedbackResponse {
        cv_path: body.cv_path,
        feedback,
    }))
}
