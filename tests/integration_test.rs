//! Integration tests for the ingest → merge → search flow.
//!
//! A deterministic letter-histogram embedder stands in for the LLM provider,
//! so nothing here needs network access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use ad_sales_assistant::api;
use ad_sales_assistant::config::{Config, LlmConfig};
use ad_sales_assistant::error::DocError;
use ad_sales_assistant::llm::embeddings::Embedder;
use ad_sales_assistant::state::AppState;

const DIM: usize = 8;

/// Counts letters into `DIM` buckets by code point.
struct LetterHistogram;

#[async_trait]
impl Embedder for LetterHistogram {
    async fn embed_many(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| histogram(t)).collect())
    }
}

fn histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        let c = c.to_ascii_lowercase();
        v[(c as usize) % DIM] += 1.0;
    }
    v
}

fn test_config(dir: &Path) -> Config {
    Config {
        data_dir: dir.to_path_buf(),
        catalog_db: dir.join("catalog.db"),
        chunk_size: 40,
        chunk_overlap: 0,
        llm: LlmConfig {
            embedding_dim: DIM,
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

async fn test_state(dir: &Path) -> AppState {
    AppState::with_embedder(test_config(dir), Arc::new(LetterHistogram))
        .await
        .unwrap()
}

/// Three paragraphs, each short enough to be one chunk but too long to share one.
fn write_rate_card(dir: &Path) -> PathBuf {
    let path = dir.join("rate_card.txt");
    std::fs::write(
        &path,
        "Prime time spots sell out fast.\n\n\
         Morning news slots are discounted.\n\n\
         Sports packages bundle ten spots.",
    )
    .unwrap();
    path
}

fn write_sponsorship_memo(dir: &Path) -> PathBuf {
    let path = dir.join("sponsorship.txt");
    std::fs::write(
        &path,
        "Late movie airtime is cheapest.\n\nDrama sponsorships include logos.",
    )
    .unwrap();
    path
}

// ─── Pipeline ────────────────────────────────────────────

#[tokio::test]
async fn test_ingest_two_documents_then_search() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let a = write_rate_card(dir.path());
    let b = write_sponsorship_memo(dir.path());

    let meta_a = state.pipeline.ingest(&a).await.unwrap();
    let meta_b = state.pipeline.ingest(&b).await.unwrap();
    assert_eq!(meta_a.chunks.len(), 3);
    assert_eq!(meta_b.chunks.len(), 2);

    let (index, merged) = state.pipeline.merged().load().unwrap();
    assert_eq!(index.len(), 5);
    assert_eq!(merged.total_vectors, 5);
    assert_eq!(merged.dimension, DIM);
    assert_eq!(
        merged.original_files,
        vec![
            a.to_string_lossy().into_owned(),
            b.to_string_lossy().into_owned()
        ]
    );
    assert_eq!(merged.chunks[3], "Late movie airtime is cheapest.");
    assert_eq!(merged.source_mapping[3], b.to_string_lossy());

    let results = state
        .pipeline
        .search("Drama sponsorships include logos.", 2, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].distance <= results[1].distance);
    assert_eq!(results[0].chunk, "Drama sponsorships include logos.");
    assert_eq!(results[0].distance, 0.0);

    // No backups left behind after successful appends
    let leftovers: Vec<_> = std::fs::read_dir(state.pipeline.merged().dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".backup"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_rebuild_matches_incremental_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state
        .pipeline
        .ingest(&write_rate_card(dir.path()))
        .await
        .unwrap();
    state
        .pipeline
        .ingest(&write_sponsorship_memo(dir.path()))
        .await
        .unwrap();

    let (_, incremental) = state.pipeline.merged().load().unwrap();

    let first = state.pipeline.rebuild().await.unwrap();
    let (_, rebuilt) = state.pipeline.merged().load().unwrap();
    let second = state.pipeline.rebuild().await.unwrap();
    let (_, rebuilt_again) = state.pipeline.merged().load().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_vectors, 5);
    assert_eq!(first.total_documents, 2);
    assert_eq!(rebuilt, incremental);
    assert_eq!(rebuilt, rebuilt_again);
}

#[tokio::test]
async fn test_search_before_any_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    assert!(matches!(
        state.pipeline.search("prime time", 3, None).await,
        Err(DocError::IndexNotFound(_))
    ));
    assert!(matches!(state.pipeline.rebuild().await, Err(DocError::NoDocuments)));
}

#[tokio::test]
async fn test_catalog_tracks_ingested_documents() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let meta = state
        .pipeline
        .ingest(&write_rate_card(dir.path()))
        .await
        .unwrap();

    let list = state.pipeline.catalog().list().await.unwrap();
    assert_eq!(list.total, 1);
    let row = &list.document_list[0];
    assert_eq!(row.unique_id, meta.unique_id);
    assert_eq!(row.embedding_file, meta.embedding_file);
    assert!(Path::new(&row.index_file).exists());
}

// ─── HTTP ────────────────────────────────────────────────

async fn send(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

#[tokio::test]
async fn test_http_supported_formats() {
    let dir = tempfile::tempdir().unwrap();
    let app = api::router(test_state(dir.path()).await);

    let (status, body) = send(&app, "GET", "/api/doc/supported-formats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["supported_formats"],
        serde_json::json!([".pdf", ".txt", ".docx", ".csv"])
    );
}

#[tokio::test]
async fn test_http_error_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let app = api::router(test_state(dir.path()).await);

    let xlsx = dir.path().join("plan.xlsx");
    std::fs::write(&xlsx, "not supported").unwrap();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/doc/process-document?file_path={}", xlsx.display()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.as_str().unwrap().contains(".xlsx"));

    let missing = dir.path().join("missing.txt");
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/doc/process-document?file_path={}", missing.display()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/doc/search-merged?query=prime").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/doc/search-merged?query=prime&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/query/tables").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_http_ingest_list_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let app = api::router(test_state(dir.path()).await);
    let memo = write_sponsorship_memo(dir.path());

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/doc/process-document?file_path={}", memo.display()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["metadata"]["chunks"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/api/doc/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let id = body["document_list"][0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/doc/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_path"], memo.to_string_lossy().into_owned());

    let (status, body) = send(
        &app,
        "POST",
        "/api/doc/search-merged?query=Late+movie+airtime+is+cheapest.&k=5",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["chunk"], "Late movie airtime is cheapest.");

    let (status, body) = send(&app, "POST", "/api/doc/rebuild-merged").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_vectors"], 2);
    assert_eq!(body["total_documents"], 1);

    let (status, _) = send(
        &app,
        "POST",
        "/api/doc/search-merged?query=movie&merged_db_path=../outside",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_config_redacts_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.llm.api_key = Some("sk-secret".to_string());
    let state = AppState::with_embedder(config, Arc::new(LetterHistogram))
        .await
        .unwrap();
    let app = api::router(state);

    let (status, body) = send(&app, "GET", "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_api_key"], true);
    assert!(!body.to_string().contains("sk-secret"));
}
