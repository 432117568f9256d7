//! KD-Tree index (spec §4.5).
//!
//! The source's "node owns left/right pointers" pattern becomes an arena of
//! nodes addressed by `u32` index (design note), so deletion/rebuild is a
//! bulk reset rather than pointer-graph surgery. Insertion is incremental,
//! axis-cycling by depth, no rebalancing. Search is bounded best-first:
//! explore the near child first, then the far child only if its
//! axis-aligned half-space could still contain a better candidate than the
//! current worst-of-k.

use crate::distance::{compute, Metric};
use crate::error::{Error, Result};
use crate::filter::{passes, Predicate};
use crate::index::PrimaryIndex;
use crate::storage::SoaStorage;
use crate::topk::BoundedTopK;

struct Node {
    slot: u64,
    axis: usize,
    left: Option<u32>,
    right: Option<u32>,
}

pub struct KdTreeIndex {
    dim: usize,
    nodes: Vec<Node>,
    root: Option<u32>,
}

impl KdTreeIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            nodes: Vec::new(),
            root: None,
        }
    }

    fn check_metric(metric: Metric) -> Result<()> {
        match metric {
            Metric::Euclidean | Metric::Manhattan => Ok(()),
            Metric::Cosine | Metric::Dot => Err(Error::invalid(
                "KD-tree axis pruning is only sound for Euclidean or Manhattan distance",
            )),
        }
    }

    fn insert_slot(&mut self, storage: &SoaStorage, slot: u64) -> Result<()> {
        let value = storage
            .get(slot)
            .ok_or_else(|| Error::out_of_range(format!("slot {slot} not in storage")))?
            .to_vec();

        let new_idx = self.nodes.len() as u32;

        let Some(root) = self.root else {
            self.nodes.push(Node {
                slot,
                axis: 0,
                left: None,
                right: None,
            });
            self.root = Some(new_idx);
            return Ok(());
        };

        let mut cur = root;
        let mut depth = 0usize;
        loop {
            let axis = depth % self.dim;
            let cur_slot = self.nodes[cur as usize].slot;
            let cur_value = storage
                .get(cur_slot)
                .ok_or_else(|| Error::corrupt("kdtree node references missing slot"))?;
            let go_left = value[axis] < cur_value[axis];
            let child = if go_left {
                self.nodes[cur as usize].left
            } else {
                self.nodes[cur as usize].right
            };
            match child {
                Some(next) => {
                    cur = next;
                    depth += 1;
                }
                None => {
                    self.nodes.push(Node {
                        slot,
                        axis: (depth + 1) % self.dim,
                        left: None,
                        right: None,
                    });
                    if go_left {
                        self.nodes[cur as usize].left = Some(new_idx);
                    } else {
                        self.nodes[cur as usize].right = Some(new_idx);
                    }
                    return Ok(());
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_topk(
        &self,
        node: u32,
        storage: &SoaStorage,
        query: &[f32],
        metric: Metric,
        predicate: Option<&dyn Predicate>,
        heap: &mut BoundedTopK,
    ) -> Result<()> {
        let n = &self.nodes[node as usize];
        let Some(point) = storage.get(n.slot) else {
            return Ok(());
        };
        if !storage.is_deleted(n.slot) {
            if let Some(metadata) = storage.metadata(n.slot) {
                if passes(predicate, metadata) {
                    let d = compute(metric, query, point)?;
                    heap.push(d, n.slot);
                }
            }
        }

        let diff = query[n.axis] - point[n.axis];
        let (near, far) = if diff < 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };

        if let Some(near) = near {
            self.visit_topk(near, storage, query, metric, predicate, heap)?;
        }

        let bound = diff.abs();
        let should_visit_far = match heap.worst() {
            Some(worst) => bound < worst,
            None => true,
        };
        if should_visit_far {
            if let Some(far) = far {
                self.visit_topk(far, storage, query, metric, predicate, heap)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_range(
        &self,
        node: u32,
        storage: &SoaStorage,
        query: &[f32],
        radius: f32,
        max_results: usize,
        metric: Metric,
        predicate: Option<&dyn Predicate>,
        results: &mut Vec<(u64, f32)>,
    ) -> Result<()> {
        if results.len() >= max_results {
            return Ok(());
        }
        let n = &self.nodes[node as usize];
        let Some(point) = storage.get(n.slot) else {
            return Ok(());
        };
        if !storage.is_deleted(n.slot) {
            if let Some(metadata) = storage.metadata(n.slot) {
                if passes(predicate, metadata) {
                    let d = compute(metric, query, point)?;
                    if d <= radius {
                        results.push((n.slot, d));
                    }
                }
            }
        }

        let diff = query[n.axis] - point[n.axis];
        let (near, far) = if diff < 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };
        if let Some(near) = near {
            self.visit_range(near, storage, query, radius, max_results, metric, predicate, results)?;
        }
        if diff.abs() < radius {
            if let Some(far) = far {
                self.visit_range(far, storage, query, radius, max_results, metric, predicate, results)?;
            }
        }
        Ok(())
    }

    /// Raw node count, including tombstoned slots not yet compacted away.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serializes the tree by pre-order traversal (spec §4.11). Returns
    /// `(axis, slot, has_left, has_right)` tuples in pre-order.
    pub fn preorder(&self) -> Vec<(u32, u64, bool, bool)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            self.preorder_visit(root, &mut out);
        }
        out
    }

    fn preorder_visit(&self, node: u32, out: &mut Vec<(u32, u64, bool, bool)>) {
        let n = &self.nodes[node as usize];
        out.push((n.axis as u32, n.slot, n.left.is_some(), n.right.is_some()));
        if let Some(l) = n.left {
            self.preorder_visit(l, out);
        }
        if let Some(r) = n.right {
            self.preorder_visit(r, out);
        }
    }

    /// Rebuilds a tree from a pre-order node stream (inverse of `preorder`).
    pub fn from_preorder(dim: usize, stream: &[(u32, u64, bool, bool)]) -> Result<Self> {
        let mut tree = KdTreeIndex::new(dim);
        if stream.is_empty() {
            return Ok(tree);
        }
        let mut cursor = 0usize;
        let root = tree.build_from_stream(stream, &mut cursor)?;
        tree.root = Some(root);
        Ok(tree)
    }

    fn build_from_stream(&mut self, stream: &[(u32, u64, bool, bool)], cursor: &mut usize) -> Result<u32> {
        if *cursor >= stream.len() {
            return Err(Error::corrupt("kdtree preorder stream truncated"));
        }
        let (axis, slot, has_left, has_right) = stream[*cursor];
        *cursor += 1;
        let node_idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            slot,
            axis: axis as usize,
            left: None,
            right: None,
        });
        if has_left {
            let left = self.build_from_stream(stream, cursor)?;
            self.nodes[node_idx as usize].left = Some(left);
        }
        if has_right {
            let right = self.build_from_stream(stream, cursor)?;
            self.nodes[node_idx as usize].right = Some(right);
        }
        Ok(node_idx)
    }
}

impl PrimaryIndex for KdTreeIndex {
    fn insert(&mut self, storage: &SoaStorage, slot: u64) -> Result<()> {
        self.insert_slot(storage, slot)
    }

    fn rebuild(&mut self, storage: &SoaStorage) -> Result<()> {
        self.nodes.clear();
        self.root = None;
        for (slot, _, _) in storage.iter_live() {
            self.insert_slot(storage, slot)?;
        }
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
        Self::check_metric(metric)?;
        if query.len() != self.dim {
            return Err(Error::invalid(format!(
                "query dimension {} != index dimension {}",
                query.len(),
                self.dim
            )));
        }
        let mut heap = BoundedTopK::new(k);
        if let Some(root) = self.root {
            self.visit_topk(root, storage, query, metric, predicate, &mut heap)?;
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
        Self::check_metric(metric)?;
        let mut results = Vec::new();
        if let Some(root) = self.root {
            self.visit_range(
                root, storage, query, radius, max_results, metric, predicate, &mut results,
            )?;
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> (SoaStorage, KdTreeIndex) {
        let mut storage = SoaStorage::new(2).unwrap();
        let points: [[f32; 2]; 6] = [
            [0.0, 0.0],
            [8.0, 1.0],
            [1.0, 8.0],
            [9.0, 9.0],
            [2.0, 2.0],
            [7.0, 3.0],
        ];
        let mut idx = KdTreeIndex::new(2);
        for (i, p) in points.iter().enumerate() {
            let slot = storage.append(i as u64, p.to_vec(), vec![]).unwrap();
            idx.insert(&storage, slot).unwrap();
        }
        (storage, idx)
    }

    #[test]
    fn scenario_partial_space_pruning() {
        let (storage, idx) = build();
        let results = idx
            .search(&storage, &[2.0, 3.0], 1, Metric::Euclidean, None)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 4);
        assert!((results[0].1 - 1.0).abs() < 1e-4);
    }

    #[test]
    fn matches_brute_force_for_k_equal_to_all() {
        let (storage, idx) = build();
        let query = [3.0, 3.0];
        let mut brute: Vec<(u64, f32)> = storage
            .iter_live()
            .map(|(s, v, _)| (s, compute(Metric::Euclidean, &query, v).unwrap()))
            .collect();
        brute.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let results = idx
            .search(&storage, &query, 6, Metric::Euclidean, None)
            .unwrap();
        assert_eq!(results.len(), 6);
        for (a, b) in results.iter().zip(brute.iter()) {
            assert!((a.1 - b.1).abs() < 1e-4);
        }
    }

    #[test]
    fn cosine_metric_is_rejected() {
        let (storage, idx) = build();
        assert!(idx
            .search(&storage, &[1.0, 1.0], 1, Metric::Cosine, None)
            .is_err());
    }

    #[test]
    fn tombstoned_node_skipped_but_still_traversed() {
        let (mut storage, idx) = build();
        storage.delete(4).unwrap(); // the nearest point to [2,3]
        let results = idx
            .search(&storage, &[2.0, 3.0], 1, Metric::Euclidean, None)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_ne!(results[0].0, 4);
    }

    #[test]
    fn preorder_roundtrips_search_results() {
        let (storage, idx) = build();
        let stream = idx.preorder();
        assert_eq!(stream.len(), 6);

        let rebuilt = KdTreeIndex::from_preorder(2, &stream).unwrap();
        let a = idx
            .search(&storage, &[2.0, 3.0], 6, Metric::Euclidean, None)
            .unwrap();
        let b = rebuilt
            .search(&storage, &[2.0, 3.0], 6, Metric::Euclidean, None)
            .unwrap();
        assert_eq!(a, b);
    }
}
