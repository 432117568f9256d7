//! Namespace (spec §3, §4.9, §6): a named handle owning configuration, SoA
//! storage, one primary index, and the optional sparse/named-vector/path
//! indices, plus creation/modification timestamps and byte/vector quotas.

use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::filter::Predicate;
use crate::index::flat::FlatIndex;
use crate::index::ivf::IvfFlatIndex;
use crate::index::kdtree::KdTreeIndex;
use crate::index::pq::PqIndex;
use crate::index::sparse::SparseIndex;
use crate::index::{PrimaryIndex, PrimaryIndexHandle};
use crate::jsonpath::JsonPathIndex;
use crate::schema::NamedVectorStore;
use crate::storage::SoaStorage;
use crate::vector::MetadataList;
use serde::{Deserialize, Serialize};

/// Which primary index a namespace is configured to use (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Flat,
    KdTree,
    IvfFlat,
    Pq,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvfConfig {
    pub nlist: usize,
    pub nprobe: usize,
    pub train_iters: usize,
    pub use_cosine: bool,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            nlist: 16,
            nprobe: 4,
            train_iters: 25,
            use_cosine: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PqConfig {
    pub m: usize,
    pub nbits: u8,
    pub train_iters: usize,
    pub retain_raw: bool,
}

impl Default for PqConfig {
    fn default() -> Self {
        Self {
            m: 8,
            nbits: 8,
            train_iters: 25,
            retain_raw: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacuumPriority {
    Low,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacuumConfig {
    pub min_deleted_count: u64,
    pub min_fragmentation_ratio: f64,
    pub batch_size: u64,
    pub priority: VacuumPriority,
    pub interval_sec: u64,
}

impl Default for VacuumConfig {
    fn default() -> Self {
        Self {
            min_deleted_count: 100,
            min_fragmentation_ratio: 0.10,
            batch_size: 1000,
            priority: VacuumPriority::Normal,
            interval_sec: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub dimension: usize,
    pub index_type: IndexType,
    pub max_vectors: u64,
    pub max_memory_bytes: u64,
    #[serde(default)]
    pub ivf: IvfConfig,
    #[serde(default)]
    pub pq: PqConfig,
    #[serde(default)]
    pub vacuum: VacuumConfig,
}

impl NamespaceConfig {
    pub fn flat(dimension: usize) -> Self {
        Self {
            dimension,
            index_type: IndexType::Flat,
            max_vectors: 0,
            max_memory_bytes: 0,
            ivf: IvfConfig::default(),
            pq: PqConfig::default(),
            vacuum: VacuumConfig::default(),
        }
    }
}

fn build_primary_index(config: &NamespaceConfig) -> Result<PrimaryIndexHandle> {
    Ok(match config.index_type {
        IndexType::Flat => PrimaryIndexHandle::Flat(FlatIndex::new()),
        IndexType::KdTree => PrimaryIndexHandle::KdTree(KdTreeIndex::new(config.dimension)),
        IndexType::IvfFlat => PrimaryIndexHandle::IvfFlat(IvfFlatIndex::new(
            config.dimension,
            config.ivf.nlist,
            config.ivf.nprobe,
            config.ivf.train_iters,
            config.ivf.use_cosine,
        )?),
        IndexType::Pq => PrimaryIndexHandle::Pq(PqIndex::new(
            config.dimension,
            config.pq.m,
            config.pq.nbits,
            config.pq.train_iters,
            config.pq.retain_raw,
        )?),
    })
}

/// Read-only snapshot of a namespace's size, exposed so an ambient
/// HTTP/SQL layer (out of scope here) can report quota usage without
/// reaching into storage internals.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceStats {
    pub live_count: u64,
    pub dimension: usize,
    pub estimated_bytes: u64,
}

/// A namespace: one dense SoA storage, one primary index, and optional
/// secondary indices, all mutated together under the manager's per-namespace
/// lock (spec §5 — the lock itself lives on the manager's handle, not here).
pub struct Namespace {
    pub config: NamespaceConfig,
    pub storage: SoaStorage,
    pub primary: PrimaryIndexHandle,
    pub sparse: Option<SparseIndex>,
    pub named_vectors: Option<NamedVectorStore>,
    pub path_index: Option<JsonPathIndex>,
    pub created_at_micros: u64,
    pub modified_at_micros: u64,
}

impl Namespace {
    pub fn new(config: NamespaceConfig, now_micros: u64) -> Result<Self> {
        if config.dimension == 0 {
            return Err(Error::invalid("namespace dimension must be > 0"));
        }
        let primary = build_primary_index(&config)?;
        log::info!(
            "namespace opened: dimension={}, index_type={:?}",
            config.dimension,
            config.index_type
        );
        Ok(Self {
            storage: SoaStorage::new(config.dimension)?,
            primary,
            sparse: None,
            named_vectors: None,
            path_index: None,
            config,
            created_at_micros: now_micros,
            modified_at_micros: now_micros,
        })
    }

    /// Estimated resident bytes used for quota accounting (spec §4.9).
    pub fn estimated_bytes(&self) -> u64 {
        self.storage.estimated_bytes()
    }

    /// Read-only size snapshot for callers outside the core (spec §4.9).
    pub fn stats(&self) -> NamespaceStats {
        NamespaceStats {
            live_count: self.storage.live_count() as u64,
            dimension: self.config.dimension,
            estimated_bytes: self.estimated_bytes(),
        }
    }

    fn check_quota(&self, additional: usize) -> Result<()> {
        if self.config.max_vectors > 0
            && self.storage.live_count() as u64 + additional as u64 > self.config.max_vectors
        {
            return Err(Error::quota(format!(
                "namespace would exceed max_vectors ({})",
                self.config.max_vectors
            )));
        }
        if self.config.max_memory_bytes > 0 {
            let projected = self.estimated_bytes()
                + (additional * self.config.dimension * 4) as u64;
            if projected > self.config.max_memory_bytes {
                return Err(Error::quota(format!(
                    "namespace would exceed max_memory_bytes ({})",
                    self.config.max_memory_bytes
                )));
            }
        }
        Ok(())
    }

    /// Appends a dense vector and inserts it into the primary index,
    /// enforcing the configured quotas first (spec §4.9).
    pub fn add_vector(&mut self, id: u64, data: Vec<f32>, metadata: MetadataList, now_micros: u64) -> Result<u64> {
        self.check_quota(1)?;
        let slot = self.storage.append(id, data, metadata)?;
        if let Err(e) = self.primary.insert(&self.storage, slot) {
            // Spec §7: a failed insert after SoA append but before secondary
            // index update leaves the new slot tombstoned rather than
            // corrupting the index.
            let _ = self.storage.delete(slot);
            return Err(e);
        }
        self.modified_at_micros = now_micros;
        Ok(slot)
    }

    pub fn delete_vector(&mut self, slot: u64, now_micros: u64) -> Result<()> {
        self.storage.delete(slot)?;
        let _ = self.primary.delete(slot);
        if let Some(path_index) = &mut self.path_index {
            path_index.remove_slot(slot);
        }
        self.modified_at_micros = now_micros;
        Ok(())
    }

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        self.primary.search(&self.storage, query, k, metric, predicate)
    }

    pub fn range_search(
        &self,
        query: &[f32],
        radius: f32,
        max_results: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        self.primary
            .range_search(&self.storage, query, radius, max_results, metric, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_vector_respects_max_vectors_quota() {
        let mut config = NamespaceConfig::flat(2);
        config.max_vectors = 1;
        let mut ns = Namespace::new(config, 0).unwrap();
        ns.add_vector(1, vec![1.0, 1.0], vec![], 0).unwrap();
        assert!(ns.add_vector(2, vec![2.0, 2.0], vec![], 0).is_err());
    }

    #[test]
    fn search_round_trips_through_flat_index() {
        let config = NamespaceConfig::flat(2);
        let mut ns = Namespace::new(config, 0).unwrap();
        ns.add_vector(1, vec![1.0, 0.0], vec![], 0).unwrap();
        ns.add_vector(2, vec![0.0, 1.0], vec![], 0).unwrap();
        let results = ns.search(&[1.0, 0.0], 1, Metric::Euclidean, None).unwrap();
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn delete_then_search_excludes_slot() {
        let config = NamespaceConfig::flat(2);
        let mut ns = Namespace::new(config, 0).unwrap();
        ns.add_vector(1, vec![1.0, 0.0], vec![], 0).unwrap();
        ns.delete_vector(0, 0).unwrap();
        let results = ns.search(&[1.0, 0.0], 5, Metric::Euclidean, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn stats_reflects_live_count_after_delete() {
        let config = NamespaceConfig::flat(2);
        let mut ns = Namespace::new(config, 0).unwrap();
        ns.add_vector(1, vec![1.0, 0.0], vec![], 0).unwrap();
        ns.add_vector(2, vec![0.0, 1.0], vec![], 0).unwrap();
        ns.delete_vector(0, 0).unwrap();
        let stats = ns.stats();
        assert_eq!(stats.live_count, 1);
        assert_eq!(stats.dimension, 2);
        assert!(stats.estimated_bytes > 0);
    }
}
