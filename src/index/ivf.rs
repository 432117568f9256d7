//! IVF-Flat index (spec §4.6): coarse k-means centroids plus per-centroid
//! posting lists of slot indices.

use crate::distance::{compute, normalize_in_place, Metric};
use crate::error::{Error, Result};
use crate::filter::{passes, Predicate};
use crate::index::PrimaryIndex;
use crate::kmeans;
use crate::storage::SoaStorage;
use crate::topk::BoundedTopK;

pub struct IvfFlatIndex {
    dim: usize,
    nlist: usize,
    nprobe: usize,
    train_iters: usize,
    use_cosine: bool,
    trained: bool,
    centroids: Vec<f32>, // nlist * dim
    posting_lists: Vec<Vec<u64>>,
}

impl IvfFlatIndex {
    pub fn new(dim: usize, nlist: usize, nprobe: usize, train_iters: usize, use_cosine: bool) -> Result<Self> {
        if nlist == 0 {
            return Err(Error::invalid("nlist must be > 0"));
        }
        Ok(Self {
            dim,
            nlist,
            nprobe: nprobe.max(1),
            train_iters,
            use_cosine,
            trained: false,
            centroids: Vec::new(),
            posting_lists: vec![Vec::new(); nlist],
        })
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn nlist(&self) -> usize {
        self.nlist
    }

    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    pub fn train_iters(&self) -> usize {
        self.train_iters
    }

    pub fn use_cosine(&self) -> bool {
        self.use_cosine
    }

    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    pub fn posting_lists(&self) -> &[Vec<u64>] {
        &self.posting_lists
    }

    /// Trains centroids on a sample of `count` vectors drawn from `storage`.
    /// Assignment during training always uses Euclidean distance (spec
    /// §4.6); cosine mode only changes how queries/inserts are prepared.
    pub fn train(&mut self, storage: &SoaStorage) -> Result<()> {
        let n = storage.live_count();
        if n == 0 {
            return Err(Error::precondition("cannot train IVF-Flat on empty storage"));
        }
        log::info!("ivf-flat training started: {n} vectors, nlist={}", self.nlist);
        let mut samples = Vec::with_capacity(n * self.dim);
        for (_, v, _) in storage.iter_live() {
            if self.use_cosine {
                let mut nv = v.to_vec();
                normalize_in_place(&mut nv);
                samples.extend_from_slice(&nv);
            } else {
                samples.extend_from_slice(v);
            }
        }
        let effective_k = self.nlist.min(n);
        self.centroids = kmeans::train(&samples, self.dim, n, effective_k, self.train_iters);
        if effective_k < self.nlist {
            // Pad with copies of the last centroid so downstream indexing by
            // centroid id stays within `nlist` even when the sample was
            // smaller than the requested partition count.
            let last = self.centroids[(effective_k - 1) * self.dim..effective_k * self.dim].to_vec();
            for _ in effective_k..self.nlist {
                self.centroids.extend_from_slice(&last);
            }
        }
        self.posting_lists = vec![Vec::new(); self.nlist];
        self.trained = true;

        for (slot, v, _) in storage.iter_live() {
            self.assign(slot, v);
        }
        log::info!("ivf-flat training finished: {} centroids", self.nlist);
        Ok(())
    }

    /// Restores trained state from persistence: centroids and posting lists
    /// are loaded verbatim rather than retrained.
    pub fn restore_trained_state(
        &mut self,
        trained: bool,
        centroids: Vec<f32>,
        posting_lists: Vec<Vec<u64>>,
    ) -> Result<()> {
        if posting_lists.len() != self.nlist {
            return Err(Error::corrupt("posting list count does not match nlist"));
        }
        self.trained = trained;
        self.centroids = centroids;
        self.posting_lists = posting_lists;
        Ok(())
    }

    fn assign(&mut self, slot: u64, vector: &[f32]) {
        let prepared;
        let v = if self.use_cosine {
            let mut nv = vector.to_vec();
            normalize_in_place(&mut nv);
            prepared = nv;
            &prepared[..]
        } else {
            vector
        };
        let k = kmeans::nearest_centroid(v, &self.centroids, self.dim, self.nlist);
        self.posting_lists[k].push(slot);
    }

    fn nearest_centroids(&self, query: &[f32], nprobe: usize) -> Vec<usize> {
        let mut dists: Vec<(usize, f32)> = (0..self.nlist)
            .map(|k| {
                let c = &self.centroids[k * self.dim..(k + 1) * self.dim];
                let d: f32 = query
                    .iter()
                    .zip(c.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (k, d)
            })
            .collect();
        dists.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        dists.into_iter().take(nprobe).map(|(k, _)| k).collect()
    }

    fn prepared_query(&self, query: &[f32]) -> Vec<f32> {
        let mut nq = query.to_vec();
        if self.use_cosine {
            normalize_in_place(&mut nq);
        }
        nq
    }
}

impl PrimaryIndex for IvfFlatIndex {
    fn insert(&mut self, storage: &SoaStorage, slot: u64) -> Result<()> {
        if !self.trained {
            return Err(Error::precondition("IVF-Flat index is not trained"));
        }
        let vector = storage
            .get(slot)
            .ok_or_else(|| Error::out_of_range(format!("slot {slot} not in storage")))?;
        self.assign(slot, vector);
        Ok(())
    }

    fn rebuild(&mut self, storage: &SoaStorage) -> Result<()> {
        if !self.trained {
            return Ok(());
        }
        self.posting_lists = vec![Vec::new(); self.nlist];
        for (slot, v, _) in storage.iter_live() {
            self.assign(slot, v);
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
        if !self.trained {
            return Err(Error::precondition("IVF-Flat index is not trained"));
        }
        let nq = self.prepared_query(query);
        let probes = self.nearest_centroids(&nq, self.nprobe);
        let mut heap = BoundedTopK::new(k);
        for list_id in probes {
            for &slot in &self.posting_lists[list_id] {
                if storage.is_deleted(slot) {
                    continue;
                }
                let Some(vector) = storage.get(slot) else {
                    continue;
                };
                let Some(metadata) = storage.metadata(slot) else {
                    continue;
                };
                if !passes(predicate, metadata) {
                    continue;
                }
                let d = compute(metric, query, vector)?;
                heap.push(d, slot);
            }
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
        if !self.trained {
            return Err(Error::precondition("IVF-Flat index is not trained"));
        }
        let nq = self.prepared_query(query);
        let probes = self.nearest_centroids(&nq, self.nprobe);
        let mut results = Vec::new();
        'outer: for list_id in probes {
            for &slot in &self.posting_lists[list_id] {
                if results.len() >= max_results {
                    break 'outer;
                }
                if storage.is_deleted(slot) {
                    continue;
                }
                let Some(vector) = storage.get(slot) else {
                    continue;
                };
                let Some(metadata) = storage.metadata(slot) else {
                    continue;
                };
                if !passes(predicate, metadata) {
                    continue;
                }
                let d = compute(metric, query, vector)?;
                if d <= radius {
                    results.push((slot, d));
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gaussian_clusters(n_per: usize, dim: usize, seed: u64) -> (SoaStorage, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut storage = SoaStorage::new(dim).unwrap();
        let centers: Vec<Vec<f32>> = (0..3)
            .map(|i| {
                let mut v = vec![0.0f32; dim];
                v[i] = 5.0;
                v
            })
            .collect();
        let mut labels = Vec::new();
        let mut id = 0u64;
        for (label, center) in centers.iter().enumerate() {
            for _ in 0..n_per {
                let v: Vec<f32> = center
                    .iter()
                    .map(|&c| c + (rng.gen::<f32>() - 0.5) * 0.5)
                    .collect();
                storage.append(id, v, vec![]).unwrap();
                labels.push(label);
                id += 1;
            }
        }
        (storage, labels)
    }

    #[test]
    fn insert_before_train_fails() {
        let storage = SoaStorage::new(4).unwrap();
        let mut idx = IvfFlatIndex::new(4, 2, 1, 5, false).unwrap();
        assert!(idx.insert(&storage, 0).is_err());
    }

    #[test]
    fn scenario_nprobe_recall() {
        let (storage, labels) = gaussian_clusters(100, 4, 7);
        let mut idx = IvfFlatIndex::new(4, 3, 1, 25, false).unwrap();
        idx.train(&storage).unwrap();

        for center_label in 0..3 {
            let mut query = vec![0.0f32; 4];
            query[center_label] = 5.0;

            let results1 = idx
                .search(&storage, &query, 50, Metric::Euclidean, None)
                .unwrap();
            let hits1 = results1
                .iter()
                .filter(|&&(slot, _)| labels[slot as usize] == center_label)
                .count();
            assert!(
                hits1 as f64 / 50.0 >= 0.70,
                "nprobe=1 recall too low: {hits1}/50"
            );

            let mut idx3 = IvfFlatIndex::new(4, 3, 3, 25, false).unwrap();
            idx3.train(&storage).unwrap();
            let results3 = idx3
                .search(&storage, &query, 50, Metric::Euclidean, None)
                .unwrap();
            let hits3 = results3
                .iter()
                .filter(|&&(slot, _)| labels[slot as usize] == center_label)
                .count();
            assert!(hits3 as f64 / 50.0 >= 0.95, "nprobe=3 recall too low: {hits3}/50");
        }
    }

    #[test]
    fn nprobe_equal_nlist_matches_bruteforce() {
        let (storage, _labels) = gaussian_clusters(20, 3, 11);
        let mut idx = IvfFlatIndex::new(3, 4, 4, 15, false).unwrap();
        idx.train(&storage).unwrap();
        let query = vec![1.0, 1.0, 1.0];

        let mut brute: Vec<(u64, f32)> = storage
            .iter_live()
            .map(|(s, v, _)| (s, compute(Metric::Euclidean, &query, v).unwrap()))
            .collect();
        brute.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        let brute_top5: Vec<f32> = brute.iter().take(5).map(|&(_, d)| d).collect();

        let results = idx
            .search(&storage, &query, 5, Metric::Euclidean, None)
            .unwrap();
        let ivf_top5: Vec<f32> = results.iter().map(|&(_, d)| d).collect();
        for (a, b) in ivf_top5.iter().zip(brute_top5.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}
