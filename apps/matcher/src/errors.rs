use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::matching::feedback::FeedbackError;
use crate::matching::pipeline::MatchError;
use crate::uploads::UploadError;
use crate::vector_store::SearchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Upstream service unavailable: {0}")]
    Upstream(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Matching error: {0}")]
    Matching(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::Upload(msg) => {
                tracing::error!("Upload error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPLOAD_ERROR",
                    "Error during upload".to_string(),
                )
            }
            AppError::Matching(msg) => {
                tracing::error!("Matching error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MATCHING_ERROR",
                    "Error during matching".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::JobEmbedding(e) => {
                AppError::Upstream(format!("Could not embed the job description: {e}"))
            }
            MatchError::NoCandidates { failures } => {
                let details: Vec<String> = failures
                    .iter()
                    .map(|f| format!("{}: {}", f.cv_path, f.message))
                    .collect();
                AppError::UnprocessableEntity(format!(
                    "No CV could be ranked. {}",
                    details.join("; ")
                ))
            }
            MatchError::StoreDisabled => AppError::UnprocessableEntity(
                "The CV store is disabled (VECTOR_STORE=none)".to_string(),
            ),
            MatchError::Search(e) => e.into(),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Embedding(e) => AppError::Upstream(format!("Could not embed the query: {e}")),
            SearchError::Timeout(limit) => {
                AppError::Upstream(format!("Search timed out after {limit:?}"))
            }
            SearchError::Store(e) => AppError::Matching(e.to_string()),
        }
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::Extraction(e) => AppError::UnprocessableEntity(e.to_string()),
            FeedbackError::Upstream(e) => AppError::Upstream(e.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidJobId(_) | UploadError::InvalidFilename(_) => {
                AppError::Validation(err.to_string())
            }
            UploadError::JobNotFound(_) => AppError::NotFound(err.to_string()),
            UploadError::Io { .. } => AppError::Upload(err.to_string()),
        }
    }
}
