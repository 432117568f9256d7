//! Namespace manager (spec §4.9): owns the map of namespaces under a
//! dedicated read-write lock, separate from each namespace's own lock.

use crate::error::{Error, Result};
use crate::index::{PrimaryIndex, PrimaryIndexHandle};
use crate::namespace::{Namespace, NamespaceConfig};
use crate::persistence::{self, BinReader, BinWriter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tag written ahead of a namespace's primary-index payload so `load_all`
/// knows which codec to hand the bytes to (spec §4.11's storage record
/// doesn't carry index type, so this manager-level record adds one).
const INDEX_TAG_FLAT: u32 = 0;
const INDEX_TAG_KDTREE: u32 = 1;
const INDEX_TAG_IVF_FLAT: u32 = 2;
const INDEX_TAG_PQ: u32 = 3;

/// A handle to one namespace, individually lockable so readers on different
/// namespaces never contend with each other (spec §5).
pub type NamespaceHandle = Arc<RwLock<Namespace>>;

/// Owns every namespace in a process, keyed by name. `create`/`delete` take
/// the manager's write lock; `get`/`exists`/`list` only need the read lock.
pub struct NamespaceManager {
    base_path: Option<PathBuf>,
    namespaces: RwLock<HashMap<String, NamespaceHandle>>,
}

impl NamespaceManager {
    pub fn new() -> Self {
        Self {
            base_path: None,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, name: impl Into<String>, config: NamespaceConfig, now_micros: u64) -> Result<NamespaceHandle> {
        let name = name.into();
        let mut guard = self.namespaces.write();
        if guard.contains_key(&name) {
            return Err(Error::already_exists(format!("namespace {name} already exists")));
        }
        let namespace = Namespace::new(config, now_micros)?;
        let handle = Arc::new(RwLock::new(namespace));
        guard.insert(name, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Result<NamespaceHandle> {
        self.namespaces
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("namespace {name} not found")))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.namespaces.read().contains_key(name)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut guard = self.namespaces.write();
        if guard.remove(name).is_none() {
            return Err(Error::not_found(format!("namespace {name} not found")));
        }
        drop(guard);
        if let Some(base) = &self.base_path {
            let path = base.join(format!("{name}.gvns"));
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        log::info!("namespace closed: {name}");
        Ok(())
    }

    pub fn list(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }

    fn namespace_path(&self, base: &Path, name: &str) -> PathBuf {
        base.join(format!("{name}.gvns"))
    }

    /// Persists every namespace's storage record plus its primary index's
    /// trained state under `base_path` (spec §4.11). Flat and KD-tree carry
    /// no state worth persisting beyond storage (both rebuild from slot
    /// order in O(n)); IVF-Flat and PQ persist centroids/codebook through
    /// their own codecs so reloading doesn't require retraining.
    pub fn save_all(&self) -> Result<()> {
        let base = self
            .base_path
            .as_ref()
            .ok_or_else(|| Error::precondition("no base path configured for save_all"))?;
        std::fs::create_dir_all(base)?;
        let guard = self.namespaces.read();
        for (name, handle) in guard.iter() {
            let ns = handle.read();
            let path = self.namespace_path(base, name);
            log::info!("namespace {name}: saving to {}", path.display());
            persistence::save_atomic(&path, |buf| {
                let mut w = BinWriter::new(buf);
                persistence::storage::save(&ns.storage, &mut w)?;
                match &ns.primary {
                    PrimaryIndexHandle::Flat(_) => w.write_u32(INDEX_TAG_FLAT)?,
                    PrimaryIndexHandle::KdTree(idx) => {
                        w.write_u32(INDEX_TAG_KDTREE)?;
                        persistence::kdtree::save(ns.config.dimension, idx, &mut w)?;
                    }
                    PrimaryIndexHandle::IvfFlat(idx) => {
                        w.write_u32(INDEX_TAG_IVF_FLAT)?;
                        persistence::ivf::save(ns.config.dimension, idx, &mut w)?;
                    }
                    PrimaryIndexHandle::Pq(idx) => {
                        w.write_u32(INDEX_TAG_PQ)?;
                        persistence::pq::save(ns.config.dimension, idx, &ns.storage, &mut w)?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Loads every `*.gvns` file under `base_path` into fresh namespaces.
    /// Config (dimension, quotas, index type) must be supplied by the
    /// caller per namespace; `configs` maps namespace name to the config to
    /// validate the persisted index tag against and rebuild anything not
    /// itself persisted (Flat/KD-tree rebuild in place from storage).
    pub fn load_all(&self, configs: &HashMap<String, NamespaceConfig>, now_micros: u64) -> Result<()> {
        let base = self
            .base_path
            .as_ref()
            .ok_or_else(|| Error::precondition("no base path configured for load_all"))?;
        if !base.exists() {
            return Ok(());
        }
        let mut guard = self.namespaces.write();
        for entry in std::fs::read_dir(base)? {
            let entry = entry?;
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if path.extension().and_then(|e| e.to_str()) != Some("gvns") {
                continue;
            }
            let Some(config) = configs.get(stem) else {
                continue;
            };
            log::info!("namespace {stem}: loading from {}", path.display());
            let bytes = std::fs::read(&path)?;
            let mut r = BinReader::new(bytes.as_slice());
            let storage = persistence::storage::load(&mut r)?;
            let tag = r.read_u32()?;
            let mut namespace = Namespace::new(config.clone(), now_micros)?;
            namespace.storage = storage;
            match (tag, &mut namespace.primary) {
                (INDEX_TAG_FLAT, PrimaryIndexHandle::Flat(_)) => {
                    namespace.primary.rebuild(&namespace.storage)?;
                }
                (INDEX_TAG_KDTREE, PrimaryIndexHandle::KdTree(_)) => {
                    let (_dim, idx) = persistence::kdtree::load(&mut r)?;
                    namespace.primary = PrimaryIndexHandle::KdTree(idx);
                }
                (INDEX_TAG_IVF_FLAT, PrimaryIndexHandle::IvfFlat(_)) => {
                    let (_dim, idx) = persistence::ivf::load(&mut r)?;
                    namespace.primary = PrimaryIndexHandle::IvfFlat(idx);
                }
                (INDEX_TAG_PQ, PrimaryIndexHandle::Pq(_)) => {
                    let (_dim, idx, _deletions) = persistence::pq::load(&mut r)?;
                    namespace.primary = PrimaryIndexHandle::Pq(idx);
                }
                _ => {
                    return Err(Error::corrupt(format!(
                        "namespace {stem}: persisted index tag {tag} does not match configured index type"
                    )));
                }
            }
            guard.insert(stem.to_string(), Arc::new(RwLock::new(namespace)));
        }
        Ok(())
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}
