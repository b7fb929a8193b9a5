//! Similarity indexes: the flat L2 index, per-document artifacts and the merged corpus index.

pub mod document;
pub mod flat;
pub mod merged;

use std::path::{Path, PathBuf};

use crate::error::{DocError, DocResult};

pub use document::{DocumentStore, StoredDocument};
pub use flat::{FlatL2Index, Neighbor};
pub use merged::MergedIndex;

/// Write via a temp sibling + rename so readers never see a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> DocResult<()> {
    let tmp_path = sibling_with_suffix(path, ".tmp");
    std::fs::write(&tmp_path, bytes).map_err(|e| DocError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| DocError::io(path, e))
}

/// Run blocking file work on tokio's blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> DocResult<T>
where
    F: FnOnce() -> DocResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DocError::Task(e.to_string()))?
}

pub(crate) fn ensure_dir(dir: &Path) -> DocResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| DocError::io(dir, e))
}

/// `merged_index.idx` + `.backup` -> `merged_index.idx.backup`
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_keeps_full_extension() {
        let path = Path::new("merged_db/merged_metadata.json");
        assert_eq!(
            sibling_with_suffix(path, ".backup"),
            PathBuf::from("merged_db/merged_metadata.json.backup")
        );
    }

    #[tokio::test]
    async fn test_run_blocking_passes_result_through() {
        assert_eq!(run_blocking(|| Ok(7)).await.unwrap(), 7);
        assert!(matches!(
            run_blocking::<(), _>(|| Err(DocError::NoDocuments)).await,
            Err(DocError::NoDocuments)
        ));
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
        assert!(!sibling_with_suffix(&path, ".tmp").exists());
    }
}
