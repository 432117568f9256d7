//! Structure-of-Arrays storage (spec §4.1).
//!
//! Mirrors the teacher's `AbkveInner` layout — one contiguous `Vec<f32>` of
//! `count * dim` floats walked sequentially by every index's scan — but adds
//! the tombstone bitmap, per-slot metadata list, and geometric growth the
//! single-purpose cache in `abkve` didn't need.

use crate::error::{Error, Result};
use crate::vector::MetadataList;

const MIN_CAPACITY: usize = 16;

/// Parallel-array storage for one namespace's dense vectors.
///
/// Invariants: `count <= capacity`; `data.len() == capacity * dim` after any
/// growth; a tombstoned slot keeps its vector bytes until compaction but has
/// its metadata freed immediately.
#[derive(Clone)]
pub struct SoaStorage {
    dim: usize,
    count: usize,
    capacity: usize,
    data: Vec<f32>,
    metadata: Vec<MetadataList>,
    tombstones: Vec<bool>,
    ids: Vec<u64>,
}

impl SoaStorage {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid("dimension must be > 0"));
        }
        Ok(Self {
            dim,
            count: 0,
            capacity: 0,
            data: Vec::new(),
            metadata: Vec::new(),
            tombstones: Vec::new(),
            ids: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live_count(&self) -> usize {
        self.tombstones.iter().filter(|&&t| !t).count()
    }

    pub fn is_deleted(&self, slot: u64) -> bool {
        self.tombstones.get(slot as usize).copied().unwrap_or(true)
    }

    pub fn id_at(&self, slot: usize) -> Option<u64> {
        self.ids.get(slot).copied()
    }

    fn grow_to_fit(&mut self, needed: usize) {
        if needed <= self.capacity {
            return;
        }
        let mut new_cap = self.capacity.max(MIN_CAPACITY);
        while new_cap < needed {
            new_cap *= 2;
        }
        self.data.resize(new_cap * self.dim, 0.0);
        self.metadata.resize_with(new_cap, Vec::new);
        self.tombstones.resize(new_cap, false);
        self.ids.resize(new_cap, 0);
        self.capacity = new_cap;
    }

    /// Appends `data`/`metadata`, taking ownership of both. Returns the
    /// pre-append `count`, which becomes the new slot's index.
    pub fn append(&mut self, id: u64, data: Vec<f32>, metadata: MetadataList) -> Result<u64> {
        if data.len() != self.dim {
            return Err(Error::invalid(format!(
                "dimension mismatch: expected {}, got {}",
                self.dim,
                data.len()
            )));
        }
        let slot = self.count;
        self.grow_to_fit(self.count + 1);
        let base = slot * self.dim;
        self.data[base..base + self.dim].copy_from_slice(&data);
        self.metadata[slot] = metadata;
        self.tombstones[slot] = false;
        self.ids[slot] = id;
        self.count += 1;
        Ok(slot as u64)
    }

    /// Sets the tombstone for `slot` and frees its metadata. A no-op
    /// (success) if the slot is already tombstoned.
    pub fn delete(&mut self, slot: u64) -> Result<()> {
        let slot = slot as usize;
        if slot >= self.count {
            return Err(Error::out_of_range(format!(
                "slot {slot} out of range (count {})",
                self.count
            )));
        }
        if self.tombstones[slot] {
            return Ok(());
        }
        self.tombstones[slot] = true;
        self.metadata[slot] = Vec::new();
        Ok(())
    }

    /// Overwrites the vector data for a live slot in place.
    pub fn update(&mut self, slot: u64, data: &[f32]) -> Result<()> {
        let slot = slot as usize;
        if slot >= self.count {
            return Err(Error::out_of_range(format!(
                "slot {slot} out of range (count {})",
                self.count
            )));
        }
        if self.tombstones[slot] {
            return Err(Error::precondition(format!("slot {slot} is deleted")));
        }
        if data.len() != self.dim {
            return Err(Error::invalid(format!(
                "dimension mismatch: expected {}, got {}",
                self.dim,
                data.len()
            )));
        }
        let base = slot * self.dim;
        self.data[base..base + self.dim].copy_from_slice(data);
        Ok(())
    }

    pub fn get(&self, slot: u64) -> Option<&[f32]> {
        let slot = slot as usize;
        if slot >= self.count {
            return None;
        }
        let base = slot * self.dim;
        Some(&self.data[base..base + self.dim])
    }

    pub fn metadata(&self, slot: u64) -> Option<&MetadataList> {
        self.metadata.get(slot as usize)
    }

    /// Iterates over `(slot, vector, metadata)` for every live slot, in slot
    /// order. Used by every index's brute-force scan/training sample.
    pub fn iter_live(&self) -> impl Iterator<Item = (u64, &[f32], &MetadataList)> {
        (0..self.count).filter_map(move |slot| {
            if self.tombstones[slot] {
                None
            } else {
                let base = slot * self.dim;
                Some((
                    slot as u64,
                    &self.data[base..base + self.dim],
                    &self.metadata[slot],
                ))
            }
        })
    }

    /// Rebuilds storage into a freshly allocated, exactly-sized pair holding
    /// only live vectors, in original slot order. Invokes `rebuild_hook`
    /// exactly once with the old->new slot map after the swap.
    ///
    /// On allocation failure the original arrays are left untouched; this
    /// implementation cannot observe allocation failure directly (Rust's
    /// global allocator aborts rather than returning an error for `Vec`), so
    /// the only realistic failure path is an explicit capacity sanity check.
    pub fn compact<F: FnOnce(&[Option<u64>])>(&mut self, rebuild_hook: F) -> Result<()> {
        let live = self.live_count();
        let mut new_data = Vec::with_capacity(live * self.dim);
        let mut new_metadata = Vec::with_capacity(live);
        let mut new_ids = Vec::with_capacity(live);
        let mut old_to_new = vec![None; self.count];

        let mut new_slot = 0u64;
        for old_slot in 0..self.count {
            if self.tombstones[old_slot] {
                continue;
            }
            let base = old_slot * self.dim;
            new_data.extend_from_slice(&self.data[base..base + self.dim]);
            new_metadata.push(std::mem::take(&mut self.metadata[old_slot]));
            new_ids.push(self.ids[old_slot]);
            old_to_new[old_slot] = Some(new_slot);
            new_slot += 1;
        }

        self.data = new_data;
        self.metadata = new_metadata;
        self.ids = new_ids;
        self.tombstones = vec![false; live];
        self.count = live;
        self.capacity = live;

        rebuild_hook(&old_to_new);
        Ok(())
    }

    /// Estimated resident bytes: raw float data plus a rough per-pair
    /// metadata cost, used by namespace quota accounting (spec §4.9).
    pub fn estimated_bytes(&self) -> u64 {
        let vector_bytes = self.count as u64 * self.dim as u64 * 4;
        let metadata_bytes: u64 = self
            .metadata
            .iter()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.len() + v.len()) as u64)
                    .sum::<u64>()
            })
            .sum();
        vector_bytes + metadata_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_sequential_slots() {
        let mut s = SoaStorage::new(4).unwrap();
        let s0 = s.append(1, vec![1.0, 0.0, 0.0, 0.0], vec![]).unwrap();
        let s1 = s.append(2, vec![0.0, 1.0, 0.0, 0.0], vec![]).unwrap();
        assert_eq!(s0, 0);
        assert_eq!(s1, 1);
        assert_eq!(s.count(), 2);
        assert_eq!(s.get(0).unwrap(), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn delete_out_of_range_fails() {
        let mut s = SoaStorage::new(2).unwrap();
        assert!(s.delete(0).is_err());
    }

    #[test]
    fn delete_is_idempotent() {
        let mut s = SoaStorage::new(2).unwrap();
        s.append(1, vec![1.0, 2.0], vec![("k".into(), "v".into())])
            .unwrap();
        s.delete(0).unwrap();
        assert!(s.is_deleted(0));
        assert!(s.metadata(0).unwrap().is_empty());
        s.delete(0).unwrap(); // no-op, still Ok
    }

    #[test]
    fn update_on_deleted_fails() {
        let mut s = SoaStorage::new(2).unwrap();
        s.append(1, vec![1.0, 2.0], vec![]).unwrap();
        s.delete(0).unwrap();
        assert!(s.update(0, &[3.0, 4.0]).is_err());
    }

    #[test]
    fn growth_never_shrinks_outside_compaction() {
        let mut s = SoaStorage::new(1).unwrap();
        for i in 0..20u64 {
            s.append(i, vec![i as f32], vec![]).unwrap();
        }
        assert!(s.capacity() >= 20);
        let cap_before = s.capacity();
        for i in 0..10 {
            s.delete(i).unwrap();
        }
        assert_eq!(s.capacity(), cap_before);
    }

    #[test]
    fn compact_preserves_live_data_and_order() {
        let mut s = SoaStorage::new(1).unwrap();
        for i in 0..9u64 {
            s.append(
                i,
                vec![i as f32],
                vec![("k".to_string(), i.to_string())],
            )
            .unwrap();
        }
        for i in (0..9).step_by(3) {
            s.delete(i).unwrap();
        }
        let mut map_seen = None;
        s.compact(|map| map_seen = Some(map.to_vec())).unwrap();
        assert_eq!(s.live_count(), 6);
        assert_eq!(s.count(), s.live_count());
        assert_eq!(s.capacity(), s.live_count());
        let map = map_seen.unwrap();
        assert_eq!(map[0], None);
        assert_eq!(map[1], Some(0));
        assert_eq!(map[2], Some(1));
        // Remaining values retain original order and content.
        let remaining: Vec<f32> = (0..s.count() as u64).map(|i| s.get(i).unwrap()[0]).collect();
        assert_eq!(remaining, vec![1.0, 2.0, 4.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn dimension_mismatch_on_append_fails() {
        let mut s = SoaStorage::new(3).unwrap();
        assert!(s.append(1, vec![1.0, 2.0], vec![]).is_err());
    }
}
