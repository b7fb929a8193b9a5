use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::loaders::SUPPORTED_EXTENSIONS;
use crate::models::{
    Document, DocumentList, ProcessDocumentParams, ProcessDocumentResponse, RebuildOutcome,
    SearchMergedParams, SearchMergedResponse, SupportedFormatsResponse,
};
use crate::state::AppState;

/// POST /api/doc/process-document?file_path=... - Ingest a document into the indexes
pub async fn process_document(
    State(state): State<AppState>,
    Query(params): Query<ProcessDocumentParams>,
) -> Result<Json<ProcessDocumentResponse>, (StatusCode, String)> {
    let path = PathBuf::from(&params.file_path);
    let metadata = state.pipeline.ingest(&path).await.map_err(|e| {
        tracing::warn!("Failed to process {}: {e}", params.file_path);
        e
    })?;

    Ok(Json(ProcessDocumentResponse {
        status: "success".to_string(),
        message: "Document processed successfully".to_string(),
        metadata,
    }))
}

/// GET /api/doc/supported-formats
pub async fn supported_formats() -> Json<SupportedFormatsResponse> {
    Json(SupportedFormatsResponse {
        supported_formats: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
    })
}

/// POST /api/doc/search-merged?query=...&k=5 - k-NN search over the merged index
pub async fn search_merged(
    State(state): State<AppState>,
    Query(params): Query<SearchMergedParams>,
) -> Result<Json<SearchMergedResponse>, (StatusCode, String)> {
    let results = state
        .pipeline
        .search(&params.query, params.k, params.merged_db_path.as_deref())
        .await?;

    Ok(Json(SearchMergedResponse {
        status: "success".to_string(),
        query: params.query,
        results,
    }))
}

/// POST /api/doc/rebuild-merged - Rebuild the merged index from every stored document
pub async fn rebuild_merged(
    State(state): State<AppState>,
) -> Result<Json<RebuildOutcome>, (StatusCode, String)> {
    let outcome = state.pipeline.rebuild().await?;
    Ok(Json(outcome))
}

/// GET /api/doc/list - Catalog entries, newest first
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentList>, (StatusCode, String)> {
    state
        .pipeline
        .catalog()
        .list()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))
}

/// GET /api/doc/{id}
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Document>, (StatusCode, String)> {
    state
        .pipeline
        .catalog()
        .get(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Document {id} not found")))
}
