//! JSON-path index (supplemented feature, SPEC_FULL.md): maps a metadata
//! key-path to the set of slots whose metadata contains that key with a
//! given value. This is a plain index structure, not a filter-expression
//! evaluator — matching the spec's explicit exclusion of filter-expression
//! parsing as an external collaborator (spec §1 Non-goals).

use crate::error::Result;
use std::collections::HashMap;

/// Indexes `(path, value) -> slots` pairs drawn from metadata lists.
pub struct JsonPathIndex {
    entries: HashMap<(String, String), Vec<u64>>,
}

impl Default for JsonPathIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonPathIndex {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Indexes every `(key, value)` pair in `metadata` against `slot`.
    pub fn index(&mut self, slot: u64, metadata: &[(String, String)]) -> Result<()> {
        for (key, value) in metadata {
            self.entries
                .entry((key.clone(), value.clone()))
                .or_default()
                .push(slot);
        }
        Ok(())
    }

    /// Removes `slot` from every path it was previously indexed under.
    pub fn remove_slot(&mut self, slot: u64) {
        for list in self.entries.values_mut() {
            list.retain(|&s| s != slot);
        }
    }

    pub fn lookup(&self, path: &str, value: &str) -> &[u64] {
        self.entries
            .get(&(path.to_string(), value.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.keys().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&(String, String), &Vec<u64>)> {
        self.entries.iter()
    }
}
