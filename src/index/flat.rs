//! Brute-force (flat) index (spec §4.4). No auxiliary structure: every
//! operation is a direct scan over live storage slots.

use crate::distance::{compute, Metric};
use crate::error::Result;
use crate::filter::{passes, Predicate};
use crate::index::PrimaryIndex;
use crate::storage::SoaStorage;
use crate::topk::BoundedTopK;

#[derive(Default)]
pub struct FlatIndex;

impl FlatIndex {
    pub fn new() -> Self {
        Self
    }
}

impl PrimaryIndex for FlatIndex {
    fn insert(&mut self, _storage: &SoaStorage, _slot: u64) -> Result<()> {
        Ok(())
    }

    fn rebuild(&mut self, _storage: &SoaStorage) -> Result<()> {
        Ok(())
    }

    fn search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        k: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        let mut heap = BoundedTopK::new(k);
        for (slot, vector, metadata) in storage.iter_live() {
            if !passes(predicate, metadata) {
                continue;
            }
            let d = compute(metric, query, vector)?;
            heap.push(d, slot);
        }
        Ok(heap.drain_sorted())
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
        let mut results = Vec::new();
        for (slot, vector, metadata) in storage.iter_live() {
            if results.len() >= max_results {
                break;
            }
            if !passes(predicate, metadata) {
                continue;
            }
            let d = compute(metric, query, vector)?;
            if d <= radius {
                results.push((slot, d));
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> SoaStorage {
        let mut s = SoaStorage::new(4).unwrap();
        s.append(1, vec![1.0, 0.0, 0.0, 0.0], vec![]).unwrap(); // A
        s.append(2, vec![0.0, 1.0, 0.0, 0.0], vec![]).unwrap(); // B
        s.append(3, vec![0.9, 0.1, 0.0, 0.0], vec![]).unwrap(); // C
        s
    }

    #[test]
    fn scenario_flat_k2_dim4() {
        let storage = build();
        let idx = FlatIndex::new();
        let results = idx
            .search(&storage, &[1.0, 0.0, 0.0, 0.0], 2, Metric::Euclidean, None)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 0.0).abs() < 1e-6);
        assert_eq!(results[1].0, 2);
        assert!((results[1].1 - 0.1414213).abs() < 1e-3);
    }

    #[test]
    fn range_search_respects_radius_and_max_results() {
        let storage = build();
        let idx = FlatIndex::new();
        let results = idx
            .range_search(&storage, &[1.0, 0.0, 0.0, 0.0], 0.2, 10, Metric::Euclidean, None)
            .unwrap();
        assert_eq!(results.len(), 2);
        for (_, d) in &results {
            assert!(*d <= 0.2);
        }
    }

    #[test]
    fn predicate_filters_candidates() {
        let storage = build();
        let idx = FlatIndex::new();
        let pred = |m: &crate::vector::MetadataList| !m.is_empty();
        let results = idx
            .search(&storage, &[1.0, 0.0, 0.0, 0.0], 3, Metric::Euclidean, Some(&pred))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn tombstoned_slots_are_skipped() {
        let mut storage = build();
        storage.delete(0).unwrap();
        let idx = FlatIndex::new();
        let results = idx
            .search(&storage, &[1.0, 0.0, 0.0, 0.0], 3, Metric::Euclidean, None)
            .unwrap();
        assert!(results.iter().all(|&(s, _)| s != 0));
    }
}
