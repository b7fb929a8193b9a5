use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON sidecar written once per ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub chunks: Vec<String>,
    pub embedding_file: String,
    pub index_file: String,
    /// Identifier naming this document's artifact files.
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Metadata stored next to the merged index. `chunks[i]` and
/// `source_mapping[i]` describe vector `i` of the merged index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMetadata {
    pub total_vectors: usize,
    pub dimension: usize,
    pub source_mapping: Vec<String>,
    pub chunks: Vec<String>,
    /// Distinct source files in first-seen order.
    pub original_files: Vec<String>,
}

impl MergedMetadata {
    /// Parallel arrays agree with the vector count.
    pub fn is_aligned(&self) -> bool {
        self.chunks.len() == self.total_vectors && self.source_mapping.len() == self.total_vectors
    }
}

/// A single ranked hit from the merged index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: String,
    pub source_file: String,
    pub distance: f32,
    /// Position in the merged chunk arrays
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildOutcome {
    pub index_path: String,
    pub metadata_path: String,
    pub total_vectors: usize,
    pub total_documents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendOutcome {
    pub added_vectors: usize,
    pub total_vectors: usize,
    pub total_documents: usize,
    /// The merged index was missing and was rebuilt from the sidecars first
    pub rebuilt: bool,
}

/// Document catalog row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub file_path: String,
    pub embedding_file: String,
    pub index_file: String,
    pub unique_id: String,
    pub create_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub file_path: String,
    pub embedding_file: String,
    pub index_file: String,
    pub unique_id: String,
    pub create_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentList {
    pub total: usize,
    pub document_list: Vec<Document>,
}

/// Query string of `POST /api/doc/process-document`
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessDocumentParams {
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessDocumentResponse {
    pub status: String,
    pub message: String,
    pub metadata: DocumentMetadata,
}

/// Query string of `POST /api/doc/search-merged`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchMergedParams {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Merged index directory, relative to the data directory
    pub merged_db_path: Option<String>,
}

fn default_k() -> usize {
    5
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMergedResponse {
    pub status: String,
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedFormatsResponse {
    pub supported_formats: Vec<String>,
}

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSender {
    pub sender: String,
    pub message: String,
    pub history: Option<Vec<ChatMessage>>,
    /// Ground the reply in the merged document index
    #[serde(default)]
    pub use_documents: bool,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub sender: String,
    pub message: String,
    pub reply: String,
    /// Source files of the chunks used as context
    pub sources: Vec<String>,
}

/// A single chat turn (system, user or assistant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Query string of `GET /query/execute`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryParams {
    pub query: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub result: Vec<serde_json::Map<String, serde_json::Value>>,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_without_id_fields_still_parses() {
        let json = r#"{
            "file_path": "docs/rate_card.pdf",
            "chunks": ["a", "b"],
            "embedding_file": "vector_db/embeddings_x.bin",
            "index_file": "vector_db/index_x.idx"
        }"#;
        let meta: DocumentMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.chunks.len(), 2);
        assert!(meta.unique_id.is_empty());
        assert!(meta.created_at.is_none());
    }

    #[test]
    fn test_search_params_default_k() {
        let params: SearchMergedParams = serde_json::from_str(r#"{"query":"prime time"}"#).unwrap();
        assert_eq!(params.k, 5);
        assert!(params.merged_db_path.is_none());
    }

    #[test]
    fn test_merged_metadata_alignment() {
        let mut meta = MergedMetadata {
            total_vectors: 2,
            dimension: 3,
            source_mapping: vec!["a.txt".into(), "a.txt".into()],
            chunks: vec!["x".into(), "y".into()],
            original_files: vec!["a.txt".into()],
        };
        assert!(meta.is_aligned());
        meta.chunks.pop();
        assert!(!meta.is_aligned());
    }
}
