//! Product Quantization index (spec §4.7): `m` sub-quantizers, asymmetric
//! distance computation (ADC) for search, optional exact rerank against
//! retained raw vectors.

use crate::distance::{euclidean, Metric};
use crate::error::{Error, Result};
use crate::filter::{passes, Predicate};
use crate::index::PrimaryIndex;
use crate::kmeans;
use crate::storage::SoaStorage;
use crate::topk::BoundedTopK;

pub(crate) struct Entry {
    pub(crate) slot: u64,
    pub(crate) codes: Vec<u8>, // length m
    pub(crate) raw: Option<Vec<f32>>,
}

pub struct PqIndex {
    dim: usize,
    m: usize,
    nbits: u8,
    dsub: usize,
    ksub: usize,
    train_iters: usize,
    retain_raw: bool,
    trained: bool,
    codebook: Vec<f32>, // m * ksub * dsub
    entries: Vec<Entry>,
    slot_to_entry: std::collections::HashMap<u64, usize>,
}

impl PqIndex {
    pub fn new(dim: usize, m: usize, nbits: u8, train_iters: usize, retain_raw: bool) -> Result<Self> {
        if m == 0 || dim % m != 0 {
            return Err(Error::invalid(format!(
                "dimension {dim} must be divisible by m={m}"
            )));
        }
        if nbits == 0 || nbits > 8 {
            return Err(Error::invalid("nbits must be in [1, 8]"));
        }
        let dsub = dim / m;
        let ksub = 1usize << nbits;
        Ok(Self {
            dim,
            m,
            nbits,
            dsub,
            ksub,
            train_iters,
            retain_raw,
            trained: false,
            codebook: Vec::new(),
            entries: Vec::new(),
            slot_to_entry: std::collections::HashMap::new(),
        })
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn nbits(&self) -> u8 {
        self.nbits
    }

    pub fn ksub(&self) -> usize {
        self.ksub
    }

    pub fn dsub(&self) -> usize {
        self.dsub
    }

    pub fn retain_raw(&self) -> bool {
        self.retain_raw
    }

    pub fn codebook(&self) -> &[f32] {
        &self.codebook
    }

    pub(crate) fn entries_for_persistence(&self) -> &[Entry] {
        &self.entries
    }

    /// Restores trained state from persistence: the codebook and per-slot
    /// codes/raw vectors are loaded verbatim rather than retrained.
    /// Per-entry metadata in the persisted record is not used here — storage
    /// is the source of truth for metadata and is reloaded separately.
    pub fn restore_trained_state(
        &mut self,
        trained: bool,
        codebook: Vec<f32>,
        entries: Vec<(u64, Vec<u8>, Option<Vec<f32>>, crate::vector::MetadataList)>,
    ) -> Result<()> {
        if trained && codebook.len() != self.m * self.ksub * self.dsub {
            return Err(Error::corrupt("PQ codebook size does not match m/nbits/dim"));
        }
        self.trained = trained;
        self.codebook = codebook;
        self.entries.clear();
        self.slot_to_entry.clear();
        for (slot, codes, raw, _metadata) in entries {
            let idx = self.entries.len();
            self.entries.push(Entry { slot, codes, raw });
            self.slot_to_entry.insert(slot, idx);
        }
        Ok(())
    }

    fn sub_codebook(&self, sub: usize) -> &[f32] {
        let start = sub * self.ksub * self.dsub;
        &self.codebook[start..start + self.ksub * self.dsub]
    }

    /// Trains the `m` independent sub-codebooks from `storage`'s live
    /// vectors.
    pub fn train(&mut self, storage: &SoaStorage) -> Result<()> {
        let n = storage.live_count();
        if n == 0 {
            return Err(Error::precondition("cannot train PQ on empty storage"));
        }
        if n < self.ksub {
            log::warn!(
                "PQ training sample ({n}) smaller than ksub ({}); some codes may degenerate",
                self.ksub
            );
        }
        log::info!("pq training started: {n} vectors, m={}, ksub={}", self.m, self.ksub);

        let vectors: Vec<&[f32]> = storage.iter_live().map(|(_, v, _)| v).collect();
        self.codebook = vec![0.0f32; self.m * self.ksub * self.dsub];

        for sub in 0..self.m {
            let mut sub_samples = Vec::with_capacity(n * self.dsub);
            for v in &vectors {
                sub_samples.extend_from_slice(&v[sub * self.dsub..(sub + 1) * self.dsub]);
            }
            let effective_k = self.ksub.min(n);
            let mut centroids = kmeans::train(&sub_samples, self.dsub, n, effective_k, self.train_iters);
            if effective_k < self.ksub {
                let last = centroids[(effective_k - 1) * self.dsub..effective_k * self.dsub].to_vec();
                for _ in effective_k..self.ksub {
                    centroids.extend_from_slice(&last);
                }
            }
            let start = sub * self.ksub * self.dsub;
            self.codebook[start..start + self.ksub * self.dsub].copy_from_slice(&centroids);
        }

        self.trained = true;
        self.entries.clear();
        self.slot_to_entry.clear();
        for (slot, v, _) in storage.iter_live() {
            self.encode_and_store(slot, v);
        }
        log::info!("pq training finished: {} entries encoded", self.entries.len());
        Ok(())
    }

    fn encode(&self, vector: &[f32]) -> Vec<u8> {
        let mut codes = Vec::with_capacity(self.m);
        for sub in 0..self.m {
            let sub_vec = &vector[sub * self.dsub..(sub + 1) * self.dsub];
            let centroids = self.sub_codebook(sub);
            let k = kmeans::nearest_centroid(sub_vec, centroids, self.dsub, self.ksub);
            codes.push(k as u8);
        }
        codes
    }

    fn encode_and_store(&mut self, slot: u64, vector: &[f32]) {
        let codes = self.encode(vector);
        let raw = if self.retain_raw {
            Some(vector.to_vec())
        } else {
            None
        };
        let idx = self.entries.len();
        self.entries.push(Entry { slot, codes, raw });
        self.slot_to_entry.insert(slot, idx);
    }

    /// Builds the `m x ksub` table of squared per-subspace distances from
    /// `query` to every sub-centroid (the ADC lookup table).
    fn build_adc_table(&self, query: &[f32]) -> Vec<f32> {
        let mut table = vec![0.0f32; self.m * self.ksub];
        for sub in 0..self.m {
            let q = &query[sub * self.dsub..(sub + 1) * self.dsub];
            let centroids = self.sub_codebook(sub);
            for k in 0..self.ksub {
                let c = &centroids[k * self.dsub..(k + 1) * self.dsub];
                let mut d = 0.0f32;
                for i in 0..self.dsub {
                    let diff = q[i] - c[i];
                    d += diff * diff;
                }
                table[sub * self.ksub + k] = d;
            }
        }
        table
    }

    fn adc_distance(&self, table: &[f32], codes: &[u8]) -> f32 {
        let mut acc = 0.0f32;
        for (sub, &code) in codes.iter().enumerate() {
            acc += table[sub * self.ksub + code as usize];
        }
        acc.sqrt()
    }
}

impl PrimaryIndex for PqIndex {
    fn insert(&mut self, storage: &SoaStorage, slot: u64) -> Result<()> {
        if !self.trained {
            return Err(Error::precondition("PQ index is not trained"));
        }
        let vector = storage
            .get(slot)
            .ok_or_else(|| Error::out_of_range(format!("slot {slot} not in storage")))?
            .to_vec();
        self.encode_and_store(slot, &vector);
        Ok(())
    }

    fn rebuild(&mut self, storage: &SoaStorage) -> Result<()> {
        if !self.trained {
            return Ok(());
        }
        self.entries.clear();
        self.slot_to_entry.clear();
        for (slot, v, _) in storage.iter_live() {
            self.encode_and_store(slot, v);
        }
        Ok(())
    }

    fn search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        k: usize,
        _metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        if !self.trained {
            return Err(Error::precondition("PQ index is not trained"));
        }
        if query.len() != self.dim {
            return Err(Error::invalid("query dimension mismatch"));
        }
        let table = self.build_adc_table(query);
        let mut heap = BoundedTopK::new(k);
        for entry in &self.entries {
            if storage.is_deleted(entry.slot) {
                continue;
            }
            let Some(metadata) = storage.metadata(entry.slot) else {
                continue;
            };
            if !passes(predicate, metadata) {
                continue;
            }
            let approx = self.adc_distance(&table, &entry.codes);
            heap.push(approx, entry.slot);
        }

        // Exact rerank: recompute true distance on retained raw vectors (or
        // fall back to the approximate distance if raw data wasn't kept —
        // spec §9 flags this fallback as an open question, decided here in
        // DESIGN.md).
        let mut results = heap.drain_sorted();
        for (slot, dist) in results.iter_mut() {
            if let Some(idx) = self.slot_to_entry.get(slot) {
                if let Some(raw) = &self.entries[*idx].raw {
                    *dist = euclidean(query, raw)?;
                }
            }
        }
        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        Ok(results)
    }

    fn range_search(
        &self,
        storage: &SoaStorage,
        query: &[f32],
        radius: f32,
        max_results: usize,
        _metric: Metric,
        predicate: Option<&dyn Predicate>,
    ) -> Result<Vec<(u64, f32)>> {
        if !self.trained {
            return Err(Error::precondition("PQ index is not trained"));
        }
        let table = self.build_adc_table(query);
        // 1.5x slack on the approximate distance to avoid missing points due
        // to quantization error (spec §4.7), then verify by exact distance.
        let slack_radius = radius * 1.5;
        let mut results = Vec::new();
        for entry in &self.entries {
            if results.len() >= max_results {
                break;
            }
            if storage.is_deleted(entry.slot) {
                continue;
            }
            let Some(metadata) = storage.metadata(entry.slot) else {
                continue;
            };
            if !passes(predicate, metadata) {
                continue;
            }
            let approx = self.adc_distance(&table, &entry.codes);
            if approx > slack_radius {
                continue;
            }
            let exact = match &entry.raw {
                Some(raw) => euclidean(query, raw)?,
                None => approx,
            };
            if exact <= radius {
                results.push((entry.slot, exact));
            }
        }
        Ok(results)
    }
}
