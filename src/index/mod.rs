// Vector index module
// Exact nearest-neighbor search over question embeddings, plus the paired
// on-disk artifacts

pub mod consistency;
pub mod store;


use std::borrow::Cow;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{FaqError, Result};

pub use consistency::{ConsistencyReport, RecordChange, check_against_corpus};
pub use store::{IndexArtifacts, IndexManifest};

const MAGIC: &[u8; 6] = b"FAQIDX";
const FORMAT_VERSION: u16 = 1;

/// A search hit: squared L2 distance and the vector's insertion position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub position: usize,
}

/// Flat (exhaustive) index under squared Euclidean distance.
///
/// Vectors are stored contiguously in insertion order. Position `i` is the
/// `i`-th vector added, which is also the `i`-th corpus record.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    values: Vec<f32>,
}

impl FlatIndex {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            values: Vec::new(),
        }
    }

    /// Build an index from vectors that must all share one dimension
    #[inline]
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(FaqError::EmptyIndex);
        };

        let mut index = Self::new(first.len());
        index.values.reserve(vectors.len() * index.dimension);
        for vector in &vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Append a vector; its position is the current length
    #[inline]
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if self.dimension == 0 {
            return Err(FaqError::DimensionMismatch {
                expected: 0,
                actual: vector.len(),
            });
        }
        if vector.len() != self.dimension {
            return Err(FaqError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|value| !value.is_finite()) {
            return Err(FaqError::Other(anyhow::anyhow!(
                "Embedding contains non-finite values"
            )));
        }

        let position = self.len();
        self.values.extend_from_slice(vector);
        Ok(position)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.values.len() / self.dimension
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Vector stored at `position`
    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.values.get(start..end)
    }

    /// Exact k-nearest search.
    ///
    /// Results ascend by distance; equal distances keep insertion order.
    /// Returns `min(k, len)` neighbors.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() {
            return Err(FaqError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(FaqError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .values
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| Neighbor {
                distance: squared_l2(query, vector),
                position,
            })
            .collect();

        let k = k.min(neighbors.len());
        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, compare_neighbors);
            neighbors.truncate(k);
        }
        neighbors.sort_by(compare_neighbors);

        debug!(
            "Flat search over {} vectors returned {} neighbors",
            self.len(),
            neighbors.len()
        );
        Ok(neighbors)
    }

    /// Write the index as a bincode-encoded file
    #[inline]
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dimension = u32::try_from(self.dimension).map_err(|_| {
            FaqError::Other(anyhow::anyhow!(
                "Dimension {} does not fit the index format",
                self.dimension
            ))
        })?;

        let file = IndexFile {
            magic: *MAGIC,
            format_version: FORMAT_VERSION,
            dimension,
            count: self.len() as u64,
            values: Cow::Borrowed(self.values.as_slice()),
        };

        let mut writer = BufWriter::new(File::create(path)?);
        codec()
            .serialize_into(&mut writer, &file)
            .map_err(|e| FaqError::Other(anyhow::anyhow!("Failed to encode index: {}", e)))?;
        writer.flush()?;
        Ok(())
    }

    /// Read an index written by [`FlatIndex::write_to`]
    #[inline]
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let corrupt = |reason: &str| {
            FaqError::ArtifactMismatch(format!("Index file is not a valid FAQ index: {}", reason))
        };

        let file: IndexFile<'_> = codec()
            .deserialize(bytes)
            .map_err(|e| corrupt(&e.to_string()))?;

        if &file.magic != MAGIC {
            return Err(corrupt("bad magic"));
        }
        if file.format_version != FORMAT_VERSION {
            return Err(corrupt(&format!(
                "unsupported format version {}",
                file.format_version
            )));
        }

        let dimension = file.dimension as usize;
        if dimension == 0 && file.count > 0 {
            return Err(corrupt("zero dimension"));
        }
        let expected = usize::try_from(file.count)
            .ok()
            .and_then(|count| count.checked_mul(dimension))
            .ok_or_else(|| corrupt("vector count overflows"))?;
        if file.values.len() != expected {
            return Err(corrupt(&format!(
                "header lists {} vectors of {} values but {} values are stored",
                file.count,
                dimension,
                file.values.len()
            )));
        }

        Ok(Self {
            dimension,
            values: file.values.into_owned(),
        })
    }
}

/// On-disk layout of `faq_index.bin`
#[derive(Serialize, Deserialize)]
struct IndexFile<'a> {
    magic: [u8; 6],
    format_version: u16,
    dimension: u32,
    count: u64,
    values: Cow<'a, [f32]>,
}

/// Fixed-width little-endian encoding; trailing bytes mean a damaged file
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Squared Euclidean distance between two equal-length vectors
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.position.cmp(&b.position))
}
