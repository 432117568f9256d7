//! Sparse inverted index (spec §4.8): term -> posting list of (point-id,
//! value), with accumulator-based dot-product top-k search.

use crate::error::{Error, Result};
use crate::filter::{passes, Predicate};
use crate::vector::SparseVector;
use std::collections::HashMap;

struct Posting {
    point_id: u64,
    value: f32,
}

pub struct SparseIndex {
    dim: u32,
    postings: HashMap<u32, Vec<Posting>>,
    vectors: HashMap<u64, SparseVector>,
}

impl SparseIndex {
    pub fn new(dim: u32) -> Self {
        Self {
            dim,
            postings: HashMap::new(),
            vectors: HashMap::new(),
        }
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Adds `vector`, taking ownership (spec §4.8: "ownership of the
    /// inserted sparse vector transfers to the index").
    pub fn add(&mut self, vector: SparseVector) -> Result<()> {
        if vector.dim != self.dim {
            return Err(Error::invalid(format!(
                "dimension mismatch: index is {}, vector is {}",
                self.dim, vector.dim
            )));
        }
        if !vector.is_well_formed() {
            return Err(Error::invalid(
                "sparse vector entries must be sorted ascending by index with no duplicates",
            ));
        }
        for &(term, value) in &vector.entries {
            self.postings.entry(term).or_default().push(Posting {
                point_id: vector.id,
                value,
            });
        }
        self.vectors.insert(vector.id, vector);
        Ok(())
    }

    pub fn delete(&mut self, id: u64) -> Result<()> {
        let Some(vector) = self.vectors.remove(&id) else {
            return Err(Error::not_found(format!("sparse point {id} not found")));
        };
        for (term, _) in vector.entries {
            if let Some(list) = self.postings.get_mut(&term) {
                list.retain(|p| p.point_id != id);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<&SparseVector> {
        self.vectors.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SparseVector> {
        self.vectors.values()
    }

    /// Dot-product (or cosine, if both sides are pre-normalized by the
    /// caller — the index does not compute norms, spec §4.8) top-k search.
    pub fn search(
        &self,
        query: &SparseVector,
        k: usize,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        if query.dim != self.dim {
            return Err(Error::invalid("query dimension mismatch"));
        }
        let mut accumulators: HashMap<u64, f32> = HashMap::new();
        for &(term, qval) in &query.entries {
            if let Some(list) = self.postings.get(&term) {
                for posting in list {
                    *accumulators.entry(posting.point_id).or_insert(0.0) += qval * posting.value;
                }
            }
        }

        let mut heap = crate::topk::BoundedTopK::new(k);
        for (&id, &score) in &accumulators {
            if let Some(vector) = self.vectors.get(&id) {
                if !passes(predicate, &vector.metadata) {
                    continue;
                }
            }
            // Top-k heaps in this crate order "smaller is closer"; dot
            // product accumulators are "larger is better," so negate.
            heap.push(-score, id);
        }
        let drained = heap.drain_sorted();
        Ok(drained.into_iter().map(|(id, neg_score)| (id, -neg_score)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(id: u64, entries: &[(u32, f32)]) -> SparseVector {
        SparseVector::new(id, 10, entries.to_vec())
    }

    #[test]
    fn rejects_unsorted_entries() {
        let mut idx = SparseIndex::new(10);
        let bad = v(1, &[(5, 1.0), (2, 1.0)]);
        assert!(idx.add(bad).is_err());
    }

    #[test]
    fn dot_product_top_k() {
        let mut idx = SparseIndex::new(10);
        idx.add(v(1, &[(1, 2.0), (2, 1.0)])).unwrap();
        idx.add(v(2, &[(1, 0.5)])).unwrap();
        idx.add(v(3, &[(2, 5.0)])).unwrap();

        let query = v(99, &[(1, 1.0), (2, 1.0)]);
        let results = idx.search(&query, 3, None).unwrap();
        // id1: 1*2 + 1*1 = 3; id2: 1*0.5 = 0.5; id3: 1*5 = 5
        assert_eq!(results[0].0, 3);
        assert!((results[0].1 - 5.0).abs() < 1e-6);
        assert_eq!(results[1].0, 1);
        assert!((results[1].1 - 3.0).abs() < 1e-6);
        assert_eq!(results[2].0, 2);
    }

    #[test]
    fn accumulator_equals_dense_dot_product() {
        let dim = 6usize;
        let dense_a = vec![0.0, 2.0, 0.0, 0.0, 3.0, 0.0];
        let dense_b = vec![1.0, 1.0, 0.0, 0.0, 4.0, 0.0];
        let mut idx = SparseIndex::new(dim as u32);
        let sparse_b: Vec<(u32, f32)> = dense_b
            .iter()
            .enumerate()
            .filter(|&(_, &x)| x != 0.0)
            .map(|(i, &x)| (i as u32, x))
            .collect();
        idx.add(v(1, &sparse_b)).unwrap();

        let sparse_a: Vec<(u32, f32)> = dense_a
            .iter()
            .enumerate()
            .filter(|&(_, &x)| x != 0.0)
            .map(|(i, &x)| (i as u32, x))
            .collect();
        let query = v(0, &sparse_a);
        let results = idx.search(&query, 1, None).unwrap();
        let expected: f32 = dense_a.iter().zip(&dense_b).map(|(a, b)| a * b).sum();
        assert!((results[0].1 - expected).abs() < 1e-6);
    }

    #[test]
    fn delete_removes_from_postings() {
        let mut idx = SparseIndex::new(10);
        idx.add(v(1, &[(1, 2.0)])).unwrap();
        idx.delete(1).unwrap();
        let query = v(0, &[(1, 1.0)]);
        let results = idx.search(&query, 5, None).unwrap();
        assert!(results.is_empty());
    }
}
