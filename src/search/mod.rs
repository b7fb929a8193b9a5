//! Query service over the merged index.

use std::sync::Arc;

use crate::error::{DocError, DocResult};
use crate::index::{run_blocking, MergedIndex};
use crate::llm::embeddings::Embedder;
use crate::models::SearchResult;

/// Embed `query` and return its `k` nearest chunks, closest first.
///
/// A missing merged index is reported before any embedding request is made.
pub async fn search_merged(
    embedder: &dyn Embedder,
    merged: &Arc<MergedIndex>,
    query: &str,
    k: usize,
) -> DocResult<Vec<SearchResult>> {
    if k == 0 {
        return Err(DocError::InvalidArgument("k must be at least 1".to_string()));
    }
    if query.trim().is_empty() {
        return Err(DocError::InvalidArgument("query must not be empty".to_string()));
    }
    if !merged.exists() {
        return Err(DocError::IndexNotFound(merged.dir().to_path_buf()));
    }

    let vector = embedder
        .embed_one(query)
        .await
        .map_err(|e| DocError::Embedding(format!("{e:#}")))?;

    let merged = Arc::clone(merged);
    let results = run_blocking(move || merged.search(&vector, k)).await?;
    tracing::debug!("Query returned {} results (k={k})", results.len());
    Ok(results)
}
