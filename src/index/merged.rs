//! Corpus-wide merged index.
//!
//! One [`FlatL2Index`] plus a JSON [`MergedMetadata`] whose `chunks` and
//! `source_mapping` arrays stay positionally aligned with the index vectors.
//! Appends follow a backup → mutate → commit → delete-backup protocol so a
//! failure leaves the live files byte-identical to their previous state.
//! Writers hold the lock exclusively; readers share it, so a search never
//! observes the index and metadata from different generations.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{ensure_dir, sibling_with_suffix, write_atomic, DocumentStore, FlatL2Index};
use crate::error::{DocError, DocResult};
use crate::models::{AppendOutcome, MergedMetadata, RebuildOutcome, SearchResult};

pub const MERGED_INDEX_FILE: &str = "merged_index.idx";
pub const MERGED_METADATA_FILE: &str = "merged_metadata.json";
pub const BACKUP_SUFFIX: &str = ".backup";

pub struct MergedIndex {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl MergedIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(MERGED_INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(MERGED_METADATA_FILE)
    }

    fn backup_paths(&self) -> (PathBuf, PathBuf) {
        (
            sibling_with_suffix(&self.index_path(), BACKUP_SUFFIX),
            sibling_with_suffix(&self.metadata_path(), BACKUP_SUFFIX),
        )
    }

    /// Both the index and its metadata are on disk.
    pub fn exists(&self) -> bool {
        self.index_path().exists() && self.metadata_path().exists()
    }

    /// Load the live index and metadata, checking that they agree.
    pub fn load(&self) -> DocResult<(FlatL2Index, MergedMetadata)> {
        let _guard = self.lock.read();
        self.load_unlocked()
    }

    fn load_unlocked(&self) -> DocResult<(FlatL2Index, MergedMetadata)> {
        if !self.exists() {
            return Err(DocError::IndexNotFound(self.dir.clone()));
        }
        let index = FlatL2Index::load(&self.index_path())?;
        let metadata_path = self.metadata_path();
        let data =
            std::fs::read_to_string(&metadata_path).map_err(|e| DocError::io(&metadata_path, e))?;
        let metadata: MergedMetadata = serde_json::from_str(&data)?;

        if !metadata.is_aligned() || metadata.total_vectors != index.len() {
            return Err(DocError::MergeCorruption(format!(
                "index holds {} vectors but metadata records {} (chunks {}, sources {})",
                index.len(),
                metadata.total_vectors,
                metadata.chunks.len(),
                metadata.source_mapping.len()
            )));
        }
        Ok((index, metadata))
    }

    /// Rebuild the merged index from every per-document sidecar.
    pub fn rebuild(&self, documents: &DocumentStore) -> DocResult<RebuildOutcome> {
        let _guard = self.lock.write();
        self.rebuild_locked(documents).map(|(outcome, _)| outcome)
    }

    /// Returns the outcome and the identifiers of the documents included.
    fn rebuild_locked(&self, documents: &DocumentStore) -> DocResult<(RebuildOutcome, Vec<String>)> {
        let all_metadata = documents.load_all()?;
        if all_metadata.is_empty() {
            return Err(DocError::NoDocuments);
        }

        let mut all_vectors = Vec::new();
        let mut chunks = Vec::new();
        let mut source_mapping = Vec::new();
        let mut original_files = Vec::new();
        let mut seen = HashSet::new();

        for metadata in &all_metadata {
            let vectors = documents.load_vectors(metadata)?;
            if vectors.len() != metadata.chunks.len() {
                return Err(DocError::MergeCorruption(format!(
                    "document {} has {} chunks but {} vectors",
                    metadata.unique_id,
                    metadata.chunks.len(),
                    vectors.len()
                )));
            }
            all_vectors.extend(vectors);
            chunks.extend(metadata.chunks.iter().cloned());
            source_mapping.extend(std::iter::repeat(metadata.file_path.clone()).take(metadata.chunks.len()));
            if seen.insert(metadata.file_path.clone()) {
                original_files.push(metadata.file_path.clone());
            }
        }

        if all_vectors.is_empty() {
            return Err(DocError::EmptyCorpus);
        }

        let index = FlatL2Index::from_vectors(&all_vectors)?;
        let metadata = MergedMetadata {
            total_vectors: index.len(),
            dimension: index.dimension(),
            source_mapping,
            chunks,
            original_files,
        };

        ensure_dir(&self.dir)?;
        self.write_live(&index, &metadata)?;

        tracing::info!(
            "Rebuilt merged index: {} vectors from {} documents",
            metadata.total_vectors,
            all_metadata.len()
        );

        let ids = all_metadata.iter().map(|m| m.unique_id.clone()).collect();
        Ok((
            RebuildOutcome {
                index_path: self.index_path().to_string_lossy().into_owned(),
                metadata_path: self.metadata_path().to_string_lossy().into_owned(),
                total_vectors: metadata.total_vectors,
                total_documents: all_metadata.len(),
            },
            ids,
        ))
    }

    /// Append one document's chunks and vectors.
    ///
    /// A missing merged index is rebuilt from the sidecars first. When
    /// `unique_id` names a sidecar that the rebuild already picked up, its
    /// vectors are not added a second time.
    pub fn append(
        &self,
        documents: &DocumentStore,
        unique_id: Option<&str>,
        file_path: &str,
        chunks: &[String],
        vectors: &[Vec<f32>],
    ) -> DocResult<AppendOutcome> {
        if chunks.len() != vectors.len() {
            return Err(DocError::InvalidArgument(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let _guard = self.lock.write();

        let mut rebuilt = false;
        if !self.exists() {
            tracing::info!("Merged index missing at {}, rebuilding", self.dir.display());
            let (outcome, ids) = self.rebuild_locked(documents)?;
            rebuilt = true;
            if let Some(id) = unique_id {
                if ids.iter().any(|included| included == id) {
                    return Ok(AppendOutcome {
                        added_vectors: vectors.len(),
                        total_vectors: outcome.total_vectors,
                        total_documents: outcome.total_documents,
                        rebuilt,
                    });
                }
            }
        }

        let (mut index, mut metadata) = self.load_unlocked()?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != index.dimension()) {
            return Err(DocError::DimensionMismatch {
                expected: index.dimension(),
                actual: bad.len(),
            });
        }

        let (index_backup, metadata_backup) = self.backup_paths();
        if index_backup.exists() || metadata_backup.exists() {
            tracing::error!(
                "Backup files present in {}; a previous append did not finish",
                self.dir.display()
            );
            return Err(DocError::MergeCorruption(format!(
                "stale backup files in {}, inspect and remove them before appending",
                self.dir.display()
            )));
        }

        copy_file(&self.index_path(), &index_backup)?;
        if let Err(e) = copy_file(&self.metadata_path(), &metadata_backup) {
            let _ = std::fs::remove_file(&index_backup);
            return Err(e);
        }

        let committed = (|| -> DocResult<()> {
            index.add(vectors)?;
            metadata.total_vectors += vectors.len();
            metadata.chunks.extend(chunks.iter().cloned());
            metadata
                .source_mapping
                .extend(std::iter::repeat(file_path.to_string()).take(vectors.len()));
            if !metadata.original_files.iter().any(|f| f == file_path) {
                metadata.original_files.push(file_path.to_string());
            }
            self.write_live(&index, &metadata)
        })();

        if let Err(err) = committed {
            tracing::warn!("Append of {file_path} failed, restoring merged index: {err}");
            return Err(self.restore(err));
        }

        for backup in [&index_backup, &metadata_backup] {
            if let Err(e) = std::fs::remove_file(backup) {
                tracing::warn!("Failed to delete backup {}: {e}", backup.display());
            }
        }

        tracing::info!(
            "Appended {} vectors from {file_path}; merged index now holds {}",
            vectors.len(),
            metadata.total_vectors
        );

        Ok(AppendOutcome {
            added_vectors: vectors.len(),
            total_vectors: metadata.total_vectors,
            total_documents: metadata.original_files.len(),
            rebuilt,
        })
    }

    /// k-nearest-neighbor search over the live merged index, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> DocResult<Vec<SearchResult>> {
        let _guard = self.lock.read();
        let (index, metadata) = self.load_unlocked()?;
        let neighbors = index.search(query, k)?;

        Ok(neighbors
            .into_iter()
            .map(|n| SearchResult {
                chunk: metadata.chunks[n.index].clone(),
                source_file: metadata.source_mapping[n.index].clone(),
                distance: n.distance,
                index: n.index,
            })
            .collect())
    }

    fn write_live(&self, index: &FlatL2Index, metadata: &MergedMetadata) -> DocResult<()> {
        write_atomic(&self.index_path(), &index.to_bytes()?)?;
        write_atomic(
            &self.metadata_path(),
            serde_json::to_string_pretty(metadata)?.as_bytes(),
        )
    }

    /// Move the backups over the live files and hand back the error to report.
    fn restore(&self, original: DocError) -> DocError {
        let (index_backup, metadata_backup) = self.backup_paths();
        let restored = std::fs::rename(&index_backup, self.index_path())
            .and_then(|()| std::fs::rename(&metadata_backup, self.metadata_path()));

        match restored {
            Ok(()) => original,
            Err(restore_err) => {
                tracing::error!(
                    "Restoring merged index in {} failed: {restore_err}",
                    self.dir.display()
                );
                DocError::MergeCorruption(format!(
                    "append failed ({original}) and restore from backup failed ({restore_err})"
                ))
            }
        }
    }
}

fn copy_file(from: &Path, to: &Path) -> DocResult<()> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| DocError::io(to, e))
}
