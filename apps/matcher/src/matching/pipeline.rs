//! Batch Orchestrator — drives every CV of a request through
//! `extracting → parsing → embedding → scoring → ranked`.
//!
//! The job description is embedded once, before any CV is dispatched; if that
//! fails the request fails and nothing else runs. Each CV then runs on a bounded
//! `buffer_unordered` stream and comes back as `Ok(CvDocument)` or a `CvFailure`.
//! Failures are reported beside the ranking and never abort sibling CVs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::embeddings::{cosine_similarity, embed_within, Embedder, EmbeddingError};
use crate::extraction::{extract_text, ExtractionError, EMPTY_DOCUMENT_MESSAGE};
use crate::llm_client::LanguageModel;
use crate::matching::cv_parser::parse_cv;
use crate::matching::feedback::{cv_feedback, FeedbackError};
use crate::matching::models::{
    CvDocument, CvFailure, CvStage, FailureKind, FusionWeights, JobQuery, RankedCandidate,
    RubricWeights,
};
use crate::matching::ranker::{combined_score, rank_candidates};
use crate::matching::scorer::{LlmRelevanceScorer, RelevanceScorer};
use crate::vector_store::{document_id, CvIndex, SearchError, SearchHit, StoreError};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Could not embed the job description: {0}")]
    JobEmbedding(EmbeddingError),

    #[error("No CV could be ranked ({} failed)", .failures.len())]
    NoCandidates { failures: Vec<CvFailure> },

    #[error("Vector store is disabled")]
    StoreDisabled,

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// One `/match-candidates` call after validation.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub job_title: String,
    pub job_description: String,
    pub cv_paths: Vec<String>,
    pub top_n: usize,
    pub fusion: FusionWeights,
    pub rubric: RubricWeights,
}

#[derive(Debug, Default, Serialize)]
pub struct MatchOutcome {
    pub results: Vec<RankedCandidate>,
    pub errors: Vec<CvFailure>,
}

pub struct MatchEngine {
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    scorer: Arc<dyn RelevanceScorer>,
    index: Option<CvIndex>,
    max_workers: usize,
    stage_timeout: Duration,
}

impl MatchEngine {
    /// `index` is the optional CV cache; `None` disables caching, search and
    /// hybrid matching. Every model call is bounded by `stage_timeout`.
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        index: Option<CvIndex>,
        max_workers: usize,
        stage_timeout: Duration,
    ) -> Self {
        let scorer = Arc::new(LlmRelevanceScorer::new(llm.clone(), stage_timeout));
        Self {
            llm,
            embedder,
            scorer,
            index,
            max_workers: max_workers.max(1),
            stage_timeout,
        }
    }

    pub fn store_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// Number of cached CVs, or `None` when caching is disabled.
    pub async fn cached_cvs(&self) -> Result<Option<usize>, StoreError> {
        match &self.index {
            Some(index) => Ok(Some(index.len().await?)),
            None => Ok(None),
        }
    }

    /// Ranks the CVs at `request.cv_paths` against the job description.
    #[instrument(
        name = "match_request",
        skip_all,
        fields(request_id = %Uuid::new_v4(), job_title = %request.job_title)
    )]
    pub async fn match_candidates(&self, request: MatchRequest) -> Result<MatchOutcome, MatchError> {
        let MatchRequest {
            job_title,
            job_description,
            cv_paths,
            top_n,
            fusion,
            rubric,
        } = request;

        if cv_paths.is_empty() {
            info!("No CVs submitted, nothing to rank");
            return Ok(MatchOutcome::default());
        }
        info!(
            "Matching {} CV(s) with {} worker(s)",
            cv_paths.len(),
            self.max_workers
        );

        let embedding = embed_within(self.embedder.as_ref(), &job_description, self.stage_timeout)
            .await
            .map_err(|e| {
                error!("Job description embedding failed, aborting request: {e}");
                MatchError::JobEmbedding(e)
            })?;

        let job = JobQuery {
            title: job_title,
            description: job_description,
            embedding,
            top_n,
            fusion,
            rubric,
        };

        let job_embedding = job.embedding.as_slice();
        let mut prepared: Vec<(usize, Result<CvDocument, CvFailure>)> =
            stream::iter(cv_paths.into_iter().enumerate())
                .map(|(position, path)| async move {
                    (position, self.prepare_cv(position, path, job_embedding).await)
                })
                .buffer_unordered(self.max_workers)
                .collect()
                .await;
        prepared.sort_by_key(|(position, _)| *position);

        let mut documents = Vec::new();
        let mut errors = Vec::new();
        for (_, result) in prepared {
            match result {
                Ok(doc) => documents.push(doc),
                Err(failure) => {
                    warn!(
                        "CV {} failed at {:?}: {}",
                        failure.cv_path, failure.stage, failure.message
                    );
                    errors.push(failure);
                }
            }
        }

        let candidates: Vec<RankedCandidate> = stream::iter(documents)
            .map(|doc| self.score_document(doc, &job))
            .buffered(self.max_workers)
            .collect()
            .await;

        if candidates.is_empty() {
            error!("No CV reached ranking ({} failed)", errors.len());
            return Err(MatchError::NoCandidates { failures: errors });
        }

        let scored = candidates.len();
        let results = rank_candidates(candidates, job.top_n);
        info!(
            "Ranked {scored} candidate(s) for '{}', returning {}, {} failed",
            job.title,
            results.len(),
            errors.len()
        );

        Ok(MatchOutcome { results, errors })
    }

    /// Extract, parse, embed and compare one CV. Caches it on success.
    async fn prepare_cv(
        &self,
        position: usize,
        path: String,
        job_embedding: &[f32],
    ) -> Result<CvDocument, CvFailure> {
        let fail = |stage: CvStage, kind: FailureKind, message: String| CvFailure {
            cv_path: path.clone(),
            stage,
            kind,
            message,
        };

        let text = extract_text(Path::new(&path)).await.map_err(|e| match e {
            ExtractionError::EmptyDocument { .. } => fail(
                CvStage::Extracting,
                FailureKind::EmptyDocument,
                EMPTY_DOCUMENT_MESSAGE.to_string(),
            ),
            other => fail(
                CvStage::Extracting,
                FailureKind::ExtractionFailed,
                other.to_string(),
            ),
        })?;

        let structured = parse_cv(&text, self.llm.as_ref(), self.stage_timeout)
            .await
            .map_err(|e| {
                fail(
                    CvStage::Parsing,
                    FailureKind::UpstreamUnavailable,
                    format!("Language model unavailable: {e}"),
                )
            })?;

        let embedding = embed_within(self.embedder.as_ref(), &text, self.stage_timeout)
            .await
            .map_err(|e| {
                fail(
                    CvStage::Embedding,
                    FailureKind::UpstreamUnavailable,
                    format!("Embedding service unavailable: {e}"),
                )
            })?;

        let similarity = cosine_similarity(job_embedding, &embedding)
            .map_err(|e| fail(CvStage::Scoring, FailureKind::SimilarityUndefined, e.to_string()))?
            .clamp(0.0, 1.0);

        if let Some(index) = &self.index {
            if let Err(e) = index.store_cv(&path, &text, &structured, &embedding).await {
                warn!("Could not cache CV {path}: {e}");
            }
        }

        debug!("Prepared {path}: similarity {similarity:.3}");
        Ok(CvDocument {
            index: position,
            id: document_id(&path),
            path,
            text,
            structured,
            embedding,
            similarity,
        })
    }

    async fn score_document(&self, doc: CvDocument, job: &JobQuery) -> RankedCandidate {
        let score = self
            .scorer
            .score(&doc.structured, &job.description, &job.rubric)
            .await;
        let combined = combined_score(doc.similarity, score.relevance_score, &job.fusion);
        debug!(
            "Scored {} (#{}, {} chars, {}-dim): relevance {} combined {combined:.3}",
            doc.path,
            doc.index,
            doc.text.len(),
            doc.embedding.len(),
            score.relevance_score
        );

        RankedCandidate {
            applicant: doc.structured.name,
            cv_id: doc.id,
            cv_path: doc.path,
            similarity: doc.similarity,
            combined_score: combined,
            score,
        }
    }

    /// Semantic search over cached CVs.
    pub async fn search(&self, query: &str, top_n: usize) -> Result<Vec<SearchHit>, MatchError> {
        let index = self.index.as_ref().ok_or(MatchError::StoreDisabled)?;
        let hits = tokio::time::timeout(self.stage_timeout, index.search(query, top_n))
            .await
            .map_err(|_| SearchError::Timeout(self.stage_timeout))??;
        Ok(hits)
    }

    /// Ranks cached CVs for a job without re-reading any file: retrieves the
    /// `2 · top_n` nearest, scores each with the rubric, fuses and truncates.
    #[instrument(name = "hybrid_match", skip_all, fields(request_id = %Uuid::new_v4(), top_n = top_n))]
    pub async fn hybrid_match(
        &self,
        job_description: &str,
        top_n: usize,
        fusion: FusionWeights,
        rubric: RubricWeights,
    ) -> Result<Vec<RankedCandidate>, MatchError> {
        let hits = self.search(job_description, top_n.saturating_mul(2)).await?;
        info!("Scoring {} cached CV(s)", hits.len());

        let candidates: Vec<RankedCandidate> = stream::iter(hits)
            .map(|hit| async move {
                let score = self.scorer.score(&hit.cv, job_description, &rubric).await;
                RankedCandidate {
                    combined_score: combined_score(hit.similarity, score.relevance_score, &fusion),
                    applicant: hit.cv.name,
                    cv_id: hit.id,
                    cv_path: hit.cv_path,
                    similarity: hit.similarity,
                    score,
                }
            })
            .buffered(self.max_workers)
            .collect()
            .await;

        Ok(rank_candidates(candidates, top_n))
    }

    pub async fn feedback(&self, cv_path: &str, job_description: &str) -> Result<String, FeedbackError> {
        cv_feedback(
            Path::new(cv_path),
            job_description,
            self.llm.as_ref(),
            self.stage_timeout,
        )
        .await
    }
}
