use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::state::AppState;
use crate::uploads::validate_job_id;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub cv_paths: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct JobUploadsResponse {
    pub job_id: String,
    pub cv_paths: Vec<String>,
}

/// POST /upload-cvs
/// Multipart form: `job_id` plus one or more `files` attachments.
pub async fn handle_upload_cvs(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut job_id: Option<String> = None;
    let mut files: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("job_id: {}", e.body_text())))?;
                job_id = Some(value);
            }
            "files" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("files: attachment has no filename".to_string()))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("files: {}", e.body_text())))?;
                files.push((filename, data));
            }
            other => debug!("Ignoring unexpected form field '{other}'"),
        }
    }

    let job_id = job_id.ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;
    validate_job_id(&job_id)?;
    if files.is_empty() {
        return Err(AppError::Validation(
            "files: at least one file is required".to_string(),
        ));
    }

    let mut cv_paths = Vec::with_capacity(files.len());
    for (filename, data) in &files {
        cv_paths.push(state.uploads.save(&job_id, filename, data).await?);
    }
    info!("Stored {} CV(s) for job '{job_id}'", cv_paths.len());

    Ok(Json(UploadResponse {
        message: format!("{} CV(s) uploaded successfully for job '{job_id}'", cv_paths.len()),
        job_id,
        cv_paths,
    }))
}

/// GET /uploads/:job_id
pub async fn handle_list_uploads(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobUploadsResponse>, AppError> {
    let cv_paths = state.uploads.list(&job_id).await?;
    Ok(Json(JobUploadsResponse { job_id, cv_paths }))
}
