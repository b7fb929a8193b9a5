//! Document ingestion: load → chunk → embed → per-document index → catalog → merged append.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::chunking::{split_text, ChunkConfig};
use crate::config::Config;
use crate::error::{DocError, DocResult};
use crate::index::{run_blocking, DocumentStore, MergedIndex};
use crate::llm::embeddings::Embedder;
use crate::loaders::load_document;
use crate::models::{AppendOutcome, DocumentMetadata, NewDocument, RebuildOutcome, SearchResult};
use crate::search::search_merged;

pub struct DocumentPipeline {
    chunking: ChunkConfig,
    embedder: Arc<dyn Embedder>,
    /// Vector length every embedding must have.
    embedding_dim: usize,
    documents: DocumentStore,
    merged: Arc<MergedIndex>,
    catalog: Catalog,
    data_dir: PathBuf,
}

impl DocumentPipeline {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        catalog: Catalog,
    ) -> DocResult<Self> {
        Ok(Self {
            chunking: ChunkConfig::new(config.chunk_size, config.chunk_overlap)?,
            embedder,
            embedding_dim: config.llm.embedding_dim,
            documents: DocumentStore::new(config.vector_db_dir(), config.metadata_dir()),
            merged: Arc::new(MergedIndex::new(config.merged_db_dir())),
            catalog,
            data_dir: config.data_dir.clone(),
        })
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn merged(&self) -> &MergedIndex {
        &self.merged
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Ingest one document and fold it into the merged index.
    pub async fn ingest(&self, path: &Path) -> DocResult<DocumentMetadata> {
        let file_path = path.to_string_lossy().into_owned();
        let chunks = self.load_chunks(path).await?;
        let vectors = self.embed(&chunks).await?;

        let documents = self.documents.clone();
        let path_for_store = file_path.clone();
        let (stored, vectors) = run_blocking(move || {
            let stored = documents.persist(&path_for_store, chunks, &vectors)?;
            Ok((stored, vectors))
        })
        .await?;

        self.catalog
            .insert(&NewDocument {
                file_path: file_path.clone(),
                embedding_file: stored.metadata.embedding_file.clone(),
                index_file: stored.metadata.index_file.clone(),
                unique_id: stored.unique_id.clone(),
                create_date: stored.metadata.created_at,
            })
            .await
            .map_err(|e| DocError::Catalog(format!("{e:#}")))?;

        // Vectors computed above are reused rather than requested again
        let documents = self.documents.clone();
        let merged = self.merged.clone();
        let unique_id = stored.unique_id.clone();
        let chunks = stored.metadata.chunks.clone();
        let path_for_merge = file_path.clone();
        let outcome = run_blocking(move || {
            merged.append(
                &documents,
                Some(unique_id.as_str()),
                &path_for_merge,
                &chunks,
                &vectors,
            )
        })
        .await?;
        tracing::info!(
            "Ingested {file_path}: {} chunks, merged index holds {} vectors",
            stored.metadata.chunks.len(),
            outcome.total_vectors
        );

        Ok(stored.metadata)
    }

    /// Load, chunk and embed `path`, then append it to the merged index.
    pub async fn append(&self, path: &Path) -> DocResult<AppendOutcome> {
        let file_path = path.to_string_lossy().into_owned();
        let chunks = self.load_chunks(path).await?;
        let vectors = self.embed(&chunks).await?;
        let documents = self.documents.clone();
        let merged = self.merged.clone();
        run_blocking(move || merged.append(&documents, None, &file_path, &chunks, &vectors)).await
    }

    pub async fn rebuild(&self) -> DocResult<RebuildOutcome> {
        let documents = self.documents.clone();
        let merged = self.merged.clone();
        run_blocking(move || merged.rebuild(&documents)).await
    }

    /// Search the merged index, or another merged directory under the data dir.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        merged_db_path: Option<&str>,
    ) -> DocResult<Vec<SearchResult>> {
        match merged_db_path {
            None => search_merged(self.embedder.as_ref(), &self.merged, query, k).await,
            Some(relative) => {
                let other = Arc::new(MergedIndex::new(self.resolve_data_path(relative)?));
                search_merged(self.embedder.as_ref(), &other, query, k).await
            }
        }
    }

    /// Resolve a caller-supplied path relative to the data directory,
    /// refusing anything that could escape it.
    fn resolve_data_path(&self, relative: &str) -> DocResult<PathBuf> {
        let candidate = Path::new(relative);
        let escapes = candidate.is_absolute()
            || candidate
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir));
        if escapes {
            return Err(DocError::InvalidArgument(format!(
                "merged_db_path must be relative to the data directory: {relative}"
            )));
        }
        Ok(self.data_dir.join(candidate))
    }

    async fn load_chunks(&self, path: &Path) -> DocResult<Vec<String>> {
        let owned = path.to_path_buf();
        let chunking = self.chunking;
        let chunks = tokio::task::spawn_blocking(move || {
            load_document(&owned).map(|text| split_text(&text, chunking))
        })
        .await
        .map_err(|e| DocError::Load {
            path: path.to_path_buf(),
            message: format!("loader task failed: {e}"),
        })??;

        if chunks.is_empty() {
            return Err(DocError::Load {
                path: path.to_path_buf(),
                message: "document contains no extractable text".to_string(),
            });
        }
        Ok(chunks)
    }

    async fn embed(&self, chunks: &[String]) -> DocResult<Vec<Vec<f32>>> {
        let vectors = self
            .embedder
            .embed_many(chunks)
            .await
            .map_err(|e| DocError::Embedding(format!("{e:#}")))?;
        if vectors.len() != chunks.len() {
            return Err(DocError::Embedding(format!(
                "provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.embedding_dim) {
            return Err(DocError::DimensionMismatch {
                expected: self.embedding_dim,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}
