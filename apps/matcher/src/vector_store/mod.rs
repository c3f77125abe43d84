//! Vector Store — best-effort cache of processed CVs for reuse across requests.
//!
//! Documents are keyed by a hash of their source path, so re-processing the same
//! path replaces the earlier entry. Distances are cosine distances; `CvIndex`
//! reports them back as `similarity = 1 - distance`, floored at 0.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::embeddings::{cosine_similarity, Embedder, EmbeddingError};
use crate::matching::models::StructuredCv;

pub mod memory;
pub mod redis_store;

pub use memory::InMemoryVectorStore;
pub use redis_store::RedisVectorStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {0} not found")]
    NotFound(String),

    #[error("Document {0} already exists")]
    AlreadyExists(String),

    #[error("Vector store backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Vector store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A cached CV: text, structured fields and embedding under a path-derived id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCv {
    pub id: String,
    pub source_path: String,
    pub text: String,
    pub cv: StructuredCv,
    pub embedding: Vec<f32>,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces the document with the same id.
    async fn upsert(&self, doc: StoredCv) -> Result<(), StoreError>;

    /// Inserts a new document; `AlreadyExists` if the id is taken.
    async fn add(&self, doc: StoredCv) -> Result<(), StoreError>;

    /// Removes a document; `NotFound` if absent.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// The `n` nearest documents with their cosine distance, nearest first.
    async fn query(&self, embedding: &[f32], n: usize)
        -> Result<Vec<(StoredCv, f32)>, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

/// Deterministic document id for a CV location: hex SHA-256 of the path string.
pub fn document_id(source_path: &str) -> String {
    hex::encode(Sha256::digest(source_path.as_bytes()))
}

/// Ranks `docs` by cosine distance to `embedding`. Documents whose similarity is
/// undefined (wrong dimension, zero norm) are skipped.
pub(crate) fn nearest<I>(docs: I, embedding: &[f32], n: usize) -> Vec<(StoredCv, f32)>
where
    I: IntoIterator<Item = StoredCv>,
{
    let mut scored: Vec<(StoredCv, f32)> = docs
        .into_iter()
        .filter_map(|doc| match cosine_similarity(embedding, &doc.embedding) {
            Ok(similarity) => Some((doc, 1.0 - similarity)),
            Err(e) => {
                debug!("Skipping cached CV {} in query: {e}", doc.id);
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
    scored.truncate(n);
    scored
}

// ────────────────────────────────────────────────────────────────────────────
// CvIndex — store + embedder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("could not embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("search timed out after {0:?}")]
    Timeout(Duration),
}

/// A search hit: the cached CV fields plus similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub cv_path: String,
    #[serde(flatten)]
    pub cv: StructuredCv,
    pub similarity: f32,
}

/// The engine's handle on the cache: stores CVs and answers text queries.
#[derive(Clone)]
pub struct CvIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl CvIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Stores a processed CV under its path-derived id, replacing any earlier entry.
    ///
    /// Falls back to delete-then-add when the backend cannot upsert; a missing
    /// document on that delete is expected and ignored.
    pub async fn store_cv(
        &self,
        source_path: &str,
        text: &str,
        cv: &StructuredCv,
        embedding: &[f32],
    ) -> Result<String, StoreError> {
        let id = document_id(source_path);
        let doc = StoredCv {
            id: id.clone(),
            source_path: source_path.to_string(),
            text: text.to_string(),
            cv: cv.clone(),
            embedding: embedding.to_vec(),
            stored_at: Utc::now(),
        };

        match self.store.upsert(doc.clone()).await {
            Ok(()) => {
                debug!("Upserted cached CV {id} ({source_path})");
                return Ok(id);
            }
            Err(e) => warn!("Upsert of {id} failed ({e}), falling back to delete + add"),
        }

        match self.store.delete(&id).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.store.add(doc).await?;
        debug!("Stored cached CV {id} via delete + add");
        Ok(id)
    }

    /// The `n` cached CVs closest to `query`.
    pub async fn search(&self, query: &str, n: usize) -> Result<Vec<SearchHit>, SearchError> {
        if n == 0 {
            return Ok(vec![]);
        }
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.query(&embedding, n).await?;

        Ok(hits
            .into_iter()
            .map(|(doc, distance)| SearchHit {
                id: doc.id,
                cv_path: doc.source_path,
                cv: doc.cv,
                similarity: (1.0 - distance).clamp(0.0, 1.0),
            })
            .collect())
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        self.store.len().await
    }
}
