pub mod health;

use std::any::Any;
use std::convert::Infallible;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::errors::AppError;
use crate::matching::handlers;
use crate::state::AppState;
use crate::uploads::handlers as uploads;

/// Multipart bodies carry whole PDFs; everything else keeps axum's default limit.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Uploads
        .route(
            "/upload-cvs",
            post(uploads::handle_upload_cvs)
                .layer::<_, Infallible>(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(CatchPanicLayer::custom(upload_panic)),
        )
        .route(
            "/uploads/:job_id",
            get(uploads::handle_list_uploads).layer(CatchPanicLayer::custom(upload_panic)),
        )
        // Matching
        .route(
            "/match-candidates",
            post(handlers::handle_match_candidates).layer(CatchPanicLayer::custom(matching_panic)),
        )
        .route(
            "/hybrid-match",
            post(handlers::handle_hybrid_match).layer(CatchPanicLayer::custom(matching_panic)),
        )
        .route(
            "/search-cvs",
            post(handlers::handle_search_cvs).layer(CatchPanicLayer::custom(matching_panic)),
        )
        .route(
            "/cv-feedback",
            post(handlers::handle_cv_feedback).layer(CatchPanicLayer::custom(matching_panic)),
        )
        .with_state(state)
}

fn upload_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Upload(format!("handler panicked: {}", panic_message(panic.as_ref()))).into_response()
}

fn matching_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Matching(format!("handler panicked: {}", panic_message(panic.as_ref())))
        .into_response()
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::extraction::tests::minimal_pdf;
    use crate::matching::pipeline::MatchEngine;
    use crate::test_support::{KeywordEmbedder, ScriptedLlm};
    use crate::uploads::UploadStore;
    use crate::vector_store::{CvIndex, InMemoryVectorStore};

    const BOUNDARY: &str = "matcher-test-boundary";

    fn scripted_llm() -> ScriptedLlm {
        let parsed = json!({
            "name": "Alice Adams",
            "email": "alice@example.com",
            "technical_skills": ["Rust"],
            "soft_skills": [],
            "experience": [],
            "education": "BSc"
        });
        let scored = json!({
            "relevance_score": 77,
            "justification": "The candidate knows Rust.",
            "key_matches": ["Rust"]
        });
        ScriptedLlm::always(&parsed.to_string()).route("Hard skills match", &scored.to_string())
    }

    fn test_state(dir: &TempDir, with_store: bool) -> AppState {
        let backend = if with_store { "memory" } else { "none" };
        let config = Config::from_lookup(|key| match key {
            "VECTOR_STORE" => Some(backend.to_string()),
            _ => None,
        })
        .unwrap();

        let embedder = Arc::new(KeywordEmbedder::new(&["rust", "java"]));
        let index = with_store
            .then(|| CvIndex::new(Arc::new(InMemoryVectorStore::new()), embedder.clone()));
        let engine = MatchEngine::new(
            Arc::new(scripted_llm()),
            embedder,
            index,
            2,
            Duration::from_secs(5),
        );

        AppState {
            config,
            engine: Arc::new(engine),
            uploads: UploadStore::new(dir.path().join("uploads")),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_upload(job_id: Option<&str>, files: &[(&str, Vec<u8>)]) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(job_id) = job_id {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_id\"\r\n\r\n{job_id}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload-cvs")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "cv-matcher");
        assert_eq!(body["vector_store"], "memory");
        assert_eq!(body["cached_cvs"], 0);

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (_, body) = send(build_router(test_state(&dir, false)), request).await;
        assert_eq!(body["vector_store"], "none");
        assert!(body["cached_cvs"].is_null());
    }

    #[tokio::test]
    async fn test_empty_cv_paths_is_empty_success() {
        let dir = tempfile::tempdir().unwrap();
        let request = post_json(
            "/match-candidates",
            json!({"job_title": "Dev", "job_description": "Rust developer", "cv_paths": []}),
        );
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([]));
        assert_eq!(body["errors"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_field_is_400_naming_it() {
        let dir = tempfile::tempdir().unwrap();
        let request = post_json("/match-candidates", json!({"cv_paths": []}));
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("job_description"));
    }

    #[tokio::test]
    async fn test_blank_job_description_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let request = post_json(
            "/match-candidates",
            json!({"job_description": "   ", "cv_paths": ["a.pdf"]}),
        );
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("job_description"));
    }

    #[tokio::test]
    async fn test_bad_query_params_are_400() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({"job_description": "Rust developer", "cv_paths": []});

        let (status, resp) = send(
            build_router(test_state(&dir, true)),
            post_json("/match-candidates?tech_weight=-0.5", body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["error"].as_str().unwrap().contains("tech_weight"));

        let (status, _) = send(
            build_router(test_state(&dir, true)),
            post_json("/match-candidates?top_n=many", body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_list_and_match_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, true);

        let (status, uploaded) = send(
            build_router(state.clone()),
            multipart_upload(
                Some("backend_dev"),
                &[("Alice Adams.pdf", minimal_pdf("alice rust engineer"))],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(uploaded["job_id"], "backend_dev");
        let cv_path = uploaded["cv_paths"][0].as_str().unwrap().to_string();
        assert!(cv_path.ends_with("Alice_Adams.pdf"));

        let request = Request::builder()
            .uri("/uploads/backend_dev")
            .body(Body::empty())
            .unwrap();
        let (status, listed) = send(build_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["cv_paths"], json!([cv_path.clone()]));

        let request = post_json(
            "/match-candidates?top_n=3",
            json!({"job_description": "Rust engineer", "cv_paths": [cv_path]}),
        );
        let (status, matched) = send(build_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(matched["results"][0]["applicant"], "Alice Adams");
        assert_eq!(matched["results"][0]["relevance_score"], 77);

        let (status, found) = send(
            build_router(state),
            post_json("/search-cvs", json!({"query": "rust"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["results"][0]["name"], "Alice Adams");
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_job_id_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();

        let (status, _) = send(
            build_router(test_state(&dir, true)),
            multipart_upload(Some("../escape"), &[("cv.pdf", b"%PDF-1.4".to_vec())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            build_router(test_state(&dir, true)),
            multipart_upload(Some("job"), &[]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("files"));

        let (status, body) = send(
            build_router(test_state(&dir, true)),
            multipart_upload(None, &[("cv.pdf", b"%PDF-1.4".to_vec())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("job_id"));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_and_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, true);
        let oversized = vec![b'x'; MAX_UPLOAD_BYTES + 1024];

        let (status, _) = send(
            build_router(state.clone()),
            multipart_upload(Some("big_job"), &[("huge.pdf", oversized)]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!dir.path().join("uploads/big_job/huge.pdf").exists());
    }

    #[tokio::test]
    async fn test_unknown_job_listing_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/uploads/nobody")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_batch_with_only_blank_cvs_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.pdf");
        std::fs::write(&blank, minimal_pdf("")).unwrap();

        let request = post_json(
            "/match-candidates",
            json!({"job_description": "Rust engineer", "cv_paths": [blank.to_string_lossy()]}),
        );
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Empty or image-only PDF"));
    }

    #[tokio::test]
    async fn test_store_routes_need_a_store() {
        let dir = tempfile::tempdir().unwrap();

        let (status, _) = send(
            build_router(test_state(&dir, false)),
            post_json("/search-cvs", json!({"query": "rust"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            build_router(test_state(&dir, false)),
            post_json("/hybrid-match", json!({"job_description": "rust"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            build_router(test_state(&dir, true)),
            post_json("/search-cvs", json!({"query": "rust", "top_n": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn test_feedback_on_unreadable_cv_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let request = post_json(
            "/cv-feedback",
            json!({"cv_path": "/no/such/cv.pdf", "job_description": "Rust engineer"}),
        );
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("cannot open file"));
    }

    #[tokio::test]
    async fn test_feedback_returns_model_summary() {
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("cv.pdf");
        std::fs::write(&cv, minimal_pdf("alice rust engineer")).unwrap();

        let request = post_json(
            "/cv-feedback",
            json!({"cv_path": cv.to_string_lossy(), "job_description": "Rust engineer"}),
        );
        let (status, body) = send(build_router(test_state(&dir, true)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cv_path"], json!(cv.to_string_lossy()));
        assert!(body["feedback"].as_str().unwrap().contains("Alice Adams"));
    }

    #[tokio::test]
    async fn test_panic_responses_name_the_stage() {
        let (status, body) = {
            let response = upload_panic(Box::new("boom"));
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap())
        };
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Error during upload");

        let response = matching_panic(Box::new(String::from("kaboom")));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Error during matching");
        assert_eq!(body["code"], "MATCHING_ERROR");
    }

    #[test]
    fn test_panic_message_downcasts() {
        assert_eq!(panic_message(&"static str"), "static str");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
