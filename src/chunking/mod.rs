//! Text chunking: recursive character splitting with bounded size and overlap.

pub mod recursive;

use crate::error::{DocError, DocResult};

/// Size limits applied to every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks (upper bound).
    pub chunk_overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> DocResult<Self> {
        if chunk_size == 0 {
            return Err(DocError::InvalidArgument(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(DocError::InvalidArgument(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Split document text into ordered chunks.
/// Whitespace-only input yields no chunks.
pub fn split_text(content: &str, config: ChunkConfig) -> Vec<String> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    recursive::split_recursive(content, &recursive::DEFAULT_SEPARATORS, config)
}
