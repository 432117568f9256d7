//! Vector and metadata types shared across storage, indices, and persistence.

use serde::{Deserialize, Serialize};

/// A single metadata key/value pair. Stored as an ordered list (not a map):
/// keys are not required to be unique and ordering is insertion order, and
/// that ordering must round-trip through persistence (spec data model §3).
pub type MetadataList = Vec<(String, String)>;

/// A dense vector ready for insertion: fixed dimension, an opaque stable id,
/// and an ordered metadata list.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector {
    pub id: u64,
    pub data: Vec<f32>,
    pub metadata: MetadataList,
}

impl DenseVector {
    pub fn new(id: u64, data: Vec<f32>) -> Self {
        Self {
            id,
            data,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataList) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A sparse vector: logical dimension `dim`, entries sorted by index with no
/// duplicates (spec data model §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub id: u64,
    pub dim: u32,
    /// (index, value) pairs, sorted ascending by index, no duplicate indices.
    pub entries: Vec<(u32, f32)>,
    pub metadata: MetadataList,
}

impl SparseVector {
    pub fn new(id: u64, dim: u32, entries: Vec<(u32, f32)>) -> Self {
        Self {
            id,
            dim,
            entries,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataList) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Validates the sortedness/no-duplicate-index invariant required by the
    /// sparse index contract.
    pub fn is_well_formed(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].0 < w[1].0)
            && self.entries.iter().all(|&(i, _)| i < self.dim)
    }
}
