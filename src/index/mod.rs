//! Primary index dispatch (spec design note: "tagged union of index
//! variants with a shared capability trait" replacing the source's
//! `void*` + typedef polymorphism).

pub mod flat;
pub mod ivf;
pub mod kdtree;
pub mod pq;
pub mod sparse;

use crate::distance::Metric;
use crate::error::Result;
use crate::filter::Predicate;
use crate::storage::SoaStorage;

/// Shared capability interface every primary (dense) index implements.
/// The namespace holds exactly one variant at a time, dispatched through
/// `PrimaryIndexHandle` below rather than `dyn` trait objects, so each
/// variant's extra configuration (train, nprobe, ...) stays reachable
/// without a downcast.
pub trait PrimaryIndex {
    /// Indexes `slot`'s current vector, read from `storage`.
    fn insert(&mut self, storage: &SoaStorage, slot: u64) -> Result<()>;

    /// Notifies the index that `slot` was tombstoned. Most indices need do
    /// nothing here (the tombstone already lives in storage and is checked
    /// during scans); the default is a no-op.
    fn delete(&mut self, _slot: u64) -> Result<()> {
        Ok(())
    }

    /// Notifies the index that `slot`'s vector changed. The default is a
    /// no-op for indices that always re-read from `storage`.
    fn update(&mut self, _storage: &SoaStorage, _slot: u64) -> Result<()> {
        Ok(())
    }

    /// Rebuilds all internal structure from the current contents of
    /// `storage` (post-compaction, since slot indices shifted).
    fn rebuild(&mut self, storage: &SoaStorage) -> Result<()>;

    fn search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        k: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>>;

    fn range_search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        radius: f32,
        max_results: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>>;
}

/// The dense index variant a namespace holds. Kept as an enum (not `Box<dyn
/// PrimaryIndex>`) because IVF-Flat/PQ expose training entry points that
/// aren't part of the shared trait.
pub enum PrimaryIndexHandle {
    Flat(flat::FlatIndex),
    KdTree(kdtree::KdTreeIndex),
    IvfFlat(ivf::IvfFlatIndex),
    Pq(pq::PqIndex),
}

impl PrimaryIndexHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            PrimaryIndexHandle::Flat(_) => "flat",
            PrimaryIndexHandle::KdTree(_) => "kdtree",
            PrimaryIndexHandle::IvfFlat(_) => "ivfflat",
            PrimaryIndexHandle::Pq(_) => "pq",
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            PrimaryIndexHandle::Flat(i) => i.$method($($arg),*),
            PrimaryIndexHandle::KdTree(i) => i.$method($($arg),*),
            PrimaryIndexHandle::IvfFlat(i) => i.$method($($arg),*),
            PrimaryIndexHandle::Pq(i) => i.$method($($arg),*),
        }
    };
}

impl PrimaryIndex for PrimaryIndexHandle {
    fn insert(&mut self, storage: &SoaStorage, slot: u64) -> Result<()> {
        dispatch!(self, insert(storage, slot))
    }

    fn delete(&mut self, slot: u64) -> Result<()> {
        dispatch!(self, delete(slot))
    }

    fn update(&mut self, storage: &SoaStorage, slot: u64) -> Result<()> {
        dispatch!(self, update(storage, slot))
    }

    fn rebuild(&mut self, storage: &SoaStorage) -> Result<()> {
        dispatch!(self, rebuild(storage))
    }

    fn search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        k: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        dispatch!(self, search(storage, query, k, metric, predicate))
    }

    fn range_search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        radius: f32,
        max_results: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        dispatch!(
            self,
            range_search(storage, query, radius, max_results, metric, predicate)
        )
    }
}
