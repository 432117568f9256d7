//! Snapshots and Versions (spec §3, §5): immutable point-in-time captures of
//! a namespace's vector data.
//!
//! A snapshot is a full copy of the storage's live vector data, tagged with
//! a monotonically assigned id, a microsecond timestamp, and a short label.
//! Versions are the same structure retained in a bounded ring: creating a
//! version past `max_count` evicts the oldest one first.

use crate::error::{Error, Result};
use crate::storage::SoaStorage;
use std::collections::VecDeque;

const MAX_LABEL_BYTES: usize = 63;

pub struct Snapshot {
    pub id: u64,
    pub timestamp_micros: u64,
    pub label: String,
    storage: SoaStorage,
}

impl Snapshot {
    fn new(id: u64, timestamp_micros: u64, label: String, storage: SoaStorage) -> Result<Self> {
        if label.len() > MAX_LABEL_BYTES {
            return Err(Error::invalid(format!(
                "snapshot label must be <= {MAX_LABEL_BYTES} bytes, got {}",
                label.len()
            )));
        }
        Ok(Self {
            id,
            timestamp_micros,
            label,
            storage,
        })
    }

    /// Borrows a vector from the snapshot's owned data. Valid only while the
    /// snapshot itself is alive (spec §5: "returned pointers are borrows
    /// valid until the snapshot is closed or deleted").
    pub fn get_vector(&self, slot: u64) -> Option<&[f32]> {
        self.storage.get(slot)
    }

    pub fn storage(&self) -> &SoaStorage {
        &self.storage
    }
}

/// Owns an unbounded, append-only set of snapshots for one namespace.
pub struct SnapshotManager {
    next_id: u64,
    snapshots: Vec<Snapshot>,
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            snapshots: Vec::new(),
        }
    }

    /// Copies `storage`'s current state into a new snapshot, returning its
    /// assigned id.
    pub fn create(&mut self, label: impl Into<String>, timestamp_micros: u64, storage: &SoaStorage) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;
        let snapshot = Snapshot::new(id, timestamp_micros, label.into(), storage.clone())?;
        self.snapshots.push(snapshot);
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    pub fn delete(&mut self, id: u64) -> Result<()> {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        if self.snapshots.len() == before {
            return Err(Error::not_found(format!("snapshot {id} not found")));
        }
        Ok(())
    }

    pub fn list(&self) -> &[Snapshot] {
        &self.snapshots
    }
}

/// Same data as a snapshot, retained in a bounded ring: creating past
/// `max_count` evicts the oldest version first (spec §3).
pub struct VersionManager {
    max_count: usize,
    next_id: u64,
    versions: VecDeque<Snapshot>,
}

impl VersionManager {
    pub fn new(max_count: usize) -> Self {
        Self {
            max_count: max_count.max(1),
            next_id: 0,
            versions: VecDeque::new(),
        }
    }

    pub fn create(&mut self, label: impl Into<String>, timestamp_micros: u64, storage: &SoaStorage) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;
        let version = Snapshot::new(id, timestamp_micros, label.into(), storage.clone())?;
        if self.versions.len() >= self.max_count {
            self.versions.pop_front();
        }
        self.versions.push_back(version);
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<&Snapshot> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn list(&self) -> impl Iterator<Item = &Snapshot> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
