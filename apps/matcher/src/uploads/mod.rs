//! Job-scoped CV storage on local disk: `{UPLOAD_DIR}/{job_id}/{file}`.

pub mod handlers;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid job_id '{0}': must be non-empty and contain no path separators or '..'")]
    InvalidJobId(String),

    #[error("Invalid filename '{0}'")]
    InvalidFilename(String),

    #[error("No uploads found for job '{0}'")]
    JobNotFound(String),

    #[error("Could not {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `bytes` as `filename` in the job's directory and returns the stored path.
    /// An existing file of the same name is overwritten.
    pub async fn save(&self, job_id: &str, filename: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let job_dir = self.job_dir(job_id)?;
        let name = sanitize_filename(filename)
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;

        tokio::fs::create_dir_all(&job_dir)
            .await
            .map_err(|source| UploadError::Io {
                action: "create",
                path: job_dir.clone(),
                source,
            })?;

        let path = job_dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| UploadError::Io {
                action: "write",
                path: path.clone(),
                source,
            })?;

        debug!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(path.to_string_lossy().into_owned())
    }

    /// Stored PDF paths for a job, sorted by file name.
    pub async fn list(&self, job_id: &str) -> Result<Vec<String>, UploadError> {
        let job_dir = self.job_dir(job_id)?;

        let mut entries = match tokio::fs::read_dir(&job_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(UploadError::JobNotFound(job_id.to_string()))
            }
            Err(source) => {
                return Err(UploadError::Io {
                    action: "read",
                    path: job_dir,
                    source,
                })
            }
        };

        let read_failed = |source: io::Error| UploadError::Io {
            action: "read",
            path: job_dir.clone(),
            source,
        };
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
            let path = entry.path();
            let is_file = entry.file_type().await.map_err(read_failed)?.is_file();
            if is_file && is_pdf(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf, UploadError> {
        validate_job_id(job_id)?;
        Ok(self.root.join(job_id))
    }
}

pub fn validate_job_id(job_id: &str) -> Result<(), UploadError> {
    let trimmed = job_id.trim();
    if trimmed.is_empty()
        || trimmed != job_id
        || job_id.contains(['/', '\\'])
        || job_id.contains("..")
    {
        return Err(UploadError::InvalidJobId(job_id.to_string()));
    }
    Ok(())
}

/// Keeps only the final path component and replaces spaces with underscores.
fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.replace(' ', "_"))
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My CV.pdf").as_deref(), Some("My_CV.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\cv 2024.pdf").as_deref(),
            Some("cv_2024.pdf")
        );
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("dir/"), None);
    }

    #[test]
    fn test_validate_job_id() {
        assert!(validate_job_id("backend_dev").is_ok());
        assert!(validate_job_id("42").is_ok());
        for bad in ["", "  ", "a/b", "a\\b", "..", "x..y", " padded"] {
            assert!(validate_job_id(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_save_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let saved = store.save("backend_dev", "Jane Doe.pdf", b"%PDF-1.4").await.unwrap();
        assert!(saved.ends_with("Jane_Doe.pdf"));
        store.save("backend_dev", "alpha.pdf", b"%PDF-1.4").await.unwrap();
        store.save("backend_dev", "notes.txt", b"hello").await.unwrap();

        let listed = store.list("backend_dev").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].ends_with("Jane_Doe.pdf"));
        assert!(listed[1].ends_with("alpha.pdf"));
    }

    #[tokio::test]
    async fn test_reupload_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let first = store.save("job", "cv.pdf", b"old").await.unwrap();
        let second = store.save("job", "cv.pdf", b"new").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"new");
        assert_eq!(store.list("job").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_unknown_job_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        assert!(matches!(
            store.list("nobody").await,
            Err(UploadError::JobNotFound(_))
        ));
        assert!(matches!(
            store.list("../escape").await,
            Err(UploadError::InvalidJobId(_))
        ));
    }
}
