//! Text Extractor — turns a CV PDF into plain text, one newline-joined chunk per page.
//!
//! Pages without a text layer (scans) contribute an empty string instead of failing the
//! document. A document that opens but yields only whitespace is `EmptyDocument`, which
//! callers must be able to tell apart from a file that could not be decoded at all.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Message reported for documents with no extractable text.
pub const EMPTY_DOCUMENT_MESSAGE: &str = "Empty or image-only PDF";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Could not extract text from {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Empty or image-only PDF")]
    EmptyDocument { path: PathBuf },
}

/// Reads `path` and returns its text. Decoding runs on the blocking pool.
pub async fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let failed = |reason: String| ExtractionError::ExtractionFailed {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| failed(format!("cannot open file: {e}")))?;

    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(failed("not a PDF document".to_string()));
    }

    // The decoder panics on some malformed inputs; the join error carries that out.
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| failed(format!("PDF decoder aborted: {e}")))?
    .map_err(|e| failed(format!("cannot decode PDF: {e}")))?;

    debug!("Extracted {} page(s) from {}", pages.len(), path.display());

    join_pages(path, pages)
}

/// Joins per-page text with newlines; whitespace-only output is an `EmptyDocument`.
fn join_pages(path: &Path, pages: Vec<String>) -> Result<String, ExtractionError> {
    let text = pages.join("\n");
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}
