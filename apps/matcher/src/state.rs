use std::sync::Arc;

use crate::config::Config;
use crate::matching::pipeline::MatchEngine;
use crate::uploads::UploadStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the model, embedder and optional CV cache handles.
    pub engine: Arc<MatchEngine>,
    pub uploads: UploadStore,
}
