use bincode::config::standard as bincode_config;
use bincode::{decode_from_slice, encode_to_vec};
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{ensure_dir, write_atomic, FlatL2Index};
use crate::error::{DocError, DocResult};
use crate::models::DocumentMetadata;

/// Artifacts of one ingested document.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub unique_id: String,
    pub metadata: DocumentMetadata,
    pub metadata_path: PathBuf,
}

/// Per-document artifact store: vector arrays and indexes under `vector_db/`,
/// JSON sidecars under `metadata/`.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    vector_db_dir: PathBuf,
    metadata_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(vector_db_dir: impl Into<PathBuf>, metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            vector_db_dir: vector_db_dir.into(),
            metadata_dir: metadata_dir.into(),
        }
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// Build the single-document index and persist vectors, index and sidecar
    /// under a fresh identifier. Writes are sequential with no cross-file atomicity.
    pub fn persist(
        &self,
        file_path: &str,
        chunks: Vec<String>,
        vectors: &[Vec<f32>],
    ) -> DocResult<StoredDocument> {
        if chunks.len() != vectors.len() {
            return Err(DocError::Embedding(format!(
                "provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        let index = FlatL2Index::from_vectors(vectors)?;

        ensure_dir(&self.vector_db_dir)?;
        ensure_dir(&self.metadata_dir)?;

        let unique_id = Uuid::new_v4().to_string();
        let embedding_file = self
            .vector_db_dir
            .join(format!("embeddings_{unique_id}.bin"));
        let index_file = self.vector_db_dir.join(format!("index_{unique_id}.idx"));
        let metadata_path = self.metadata_dir.join(format!("{unique_id}.json"));

        let encoded = encode_to_vec(vectors, bincode_config())?;
        write_atomic(&embedding_file, &encoded)?;
        write_atomic(&index_file, &index.to_bytes()?)?;

        let metadata = DocumentMetadata {
            file_path: file_path.to_string(),
            chunks,
            embedding_file: embedding_file.to_string_lossy().into_owned(),
            index_file: index_file.to_string_lossy().into_owned(),
            unique_id: unique_id.clone(),
            created_at: Some(Utc::now()),
        };
        write_atomic(&metadata_path, serde_json::to_string_pretty(&metadata)?.as_bytes())?;

        tracing::info!(
            "Stored {} vectors (dim {}) for {file_path} as {unique_id}",
            index.len(),
            index.dimension()
        );

        Ok(StoredDocument {
            unique_id,
            metadata,
            metadata_path,
        })
    }

    /// Every sidecar in the metadata directory, ordered by creation time then
    /// identifier so rebuilds do not depend on directory listing order.
    pub fn load_all(&self) -> DocResult<Vec<DocumentMetadata>> {
        if !self.metadata_dir.exists() {
            return Ok(Vec::new());
        }

        let entries =
            std::fs::read_dir(&self.metadata_dir).map_err(|e| DocError::io(&self.metadata_dir, e))?;

        let mut all = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| DocError::io(&self.metadata_dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = std::fs::read_to_string(&path).map_err(|e| DocError::io(&path, e))?;
            let mut metadata: DocumentMetadata = serde_json::from_str(&data)?;
            if metadata.unique_id.is_empty() {
                // Sidecars predating the id field are named after it
                if let Some(stem) = path.file_stem() {
                    metadata.unique_id = stem.to_string_lossy().into_owned();
                }
            }
            all.push(metadata);
        }

        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.unique_id.cmp(&b.unique_id))
        });
        Ok(all)
    }

    /// Vectors persisted for a document, in chunk order.
    pub fn load_vectors(&self, metadata: &DocumentMetadata) -> DocResult<Vec<Vec<f32>>> {
        let path = Path::new(&metadata.embedding_file);
        let bytes = std::fs::read(path).map_err(|e| DocError::io(path, e))?;
        let (vectors, _): (Vec<Vec<f32>>, usize) = decode_from_slice(&bytes, bincode_config())?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> DocumentStore {
        DocumentStore::new(dir.join("vector_db"), dir.join("metadata"))
    }

    #[test]
    fn test_persist_writes_three_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let stored = store
            .persist(
                "docs/rates.txt",
                vec!["a".into(), "b".into(), "c".into()],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .unwrap();

        assert!(Path::new(&stored.metadata.embedding_file).exists());
        assert!(Path::new(&stored.metadata.index_file).exists());
        assert!(stored.metadata_path.exists());
        assert!(stored
            .metadata
            .embedding_file
            .ends_with(&format!("embeddings_{}.bin", stored.unique_id)));

        // len(vectors) == len(chunks) == index.count
        let vectors = store.load_vectors(&stored.metadata).unwrap();
        let index = FlatL2Index::load(Path::new(&stored.metadata.index_file)).unwrap();
        assert_eq!(vectors.len(), stored.metadata.chunks.len());
        assert_eq!(index.len(), stored.metadata.chunks.len());
    }

    #[test]
    fn test_persist_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .persist("a.txt", vec!["a".into(), "b".into()], &[vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, DocError::Embedding(_)));
    }

    #[test]
    fn test_persist_rejects_ragged_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .persist("a.txt", vec!["a".into(), "b".into()], &[vec![1.0, 2.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, DocError::DimensionMismatch { .. }));
        assert!(store(dir.path()).load_all().unwrap().is_empty());
    }

    #[test]
    fn test_load_all_sorted_by_creation() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let first = store.persist("first.txt", vec!["x".into()], &[vec![1.0]]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.persist("second.txt", vec!["y".into()], &[vec![2.0]]).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].unique_id, first.unique_id);
        assert_eq!(all[1].unique_id, second.unique_id);
    }

    #[test]
    fn test_load_all_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(&dir.path().join("nowhere")).load_all().unwrap().is_empty());
    }
}
