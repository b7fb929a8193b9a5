use bincode::config::standard as bincode_config;
use bincode::{decode_from_slice, encode_to_vec, Decode, Encode};
use std::path::Path;

use crate::error::{DocError, DocResult};

/// Exhaustive squared-L2 index over dense `f32` vectors.
///
/// Vectors are stored contiguously in insertion order, so the position of a
/// vector in the index is the position of its chunk in the caller's arrays.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FlatL2Index {
    version: u32,
    dimension: usize,
    data: Vec<f32>,
}

/// A neighbor returned by [`FlatL2Index::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

impl FlatL2Index {
    /// On-disk format version
    pub const VERSION: u32 = 1;

    pub fn new(dimension: usize) -> Self {
        Self {
            version: Self::VERSION,
            dimension,
            data: Vec::new(),
        }
    }

    /// Build an index whose dimension is taken from the first vector.
    pub fn from_vectors(vectors: &[Vec<f32>]) -> DocResult<Self> {
        let first = vectors.first().ok_or(DocError::EmptyCorpus)?;
        if first.is_empty() {
            return Err(DocError::InvalidArgument(
                "embedding vectors must not be empty".to_string(),
            ));
        }
        let mut index = Self::new(first.len());
        index.add(vectors)?;
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append vectors. Either all vectors are added or none are.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> DocResult<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(DocError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// The `k` nearest vectors by squared L2 distance, closest first.
    /// Returns fewer than `k` neighbors when the index is smaller.
    pub fn search(&self, query: &[f32], k: usize) -> DocResult<Vec<Neighbor>> {
        if k == 0 {
            return Err(DocError::InvalidArgument("k must be at least 1".to_string()));
        }
        if query.len() != self.dimension {
            return Err(DocError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                distance: squared_l2(query, v),
            })
            .collect();

        // Sort ascending by distance, ties broken by position
        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        scored.truncate(k);

        Ok(scored)
    }

    pub fn to_bytes(&self) -> DocResult<Vec<u8>> {
        Ok(encode_to_vec(self, bincode_config())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> DocResult<Self> {
        let (index, _): (Self, usize) = decode_from_slice(bytes, bincode_config())?;
        if index.version != Self::VERSION {
            return Err(DocError::Serialization(format!(
                "unsupported index version {} (expected {})",
                index.version,
                Self::VERSION
            )));
        }
        if index.dimension == 0 || index.data.len() % index.dimension != 0 {
            return Err(DocError::Serialization(format!(
                "index data length {} is not a multiple of dimension {}",
                index.data.len(),
                index.dimension
            )));
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> DocResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| DocError::io(path, e))?;
        Self::from_bytes(&bytes)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
