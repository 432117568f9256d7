//! Named vectors / schema (supplemented feature, SPEC_FULL.md): an optional
//! multi-field per-point vector store layered on top of a namespace's
//! primary storage, so a point can carry e.g. a `"title"` embedding and an
//! `"image"` embedding side by side.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// One named field's declared dimension.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub dim: usize,
}

/// Multi-field per-point vector store: `field name -> point id -> vector`.
pub struct NamedVectorStore {
    fields: HashMap<String, FieldSpec>,
    data: HashMap<String, HashMap<u64, Vec<f32>>>,
}

impl Default for NamedVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NamedVectorStore {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
            data: HashMap::new(),
        }
    }

    pub fn create_field(&mut self, name: impl Into<String>, dim: usize) -> Result<()> {
        let name = name.into();
        if dim == 0 {
            return Err(Error::invalid("field dimension must be > 0"));
        }
        if self.fields.contains_key(&name) {
            return Err(Error::already_exists(format!("named field {name} already exists")));
        }
        self.fields.insert(name.clone(), FieldSpec { dim });
        self.data.insert(name, HashMap::new());
        Ok(())
    }

    pub fn drop_field(&mut self, name: &str) -> Result<()> {
        if self.fields.remove(name).is_none() {
            return Err(Error::not_found(format!("named field {name} not found")));
        }
        self.data.remove(name);
        Ok(())
    }

    pub fn set_vector(&mut self, field: &str, point_id: u64, data: Vec<f32>) -> Result<()> {
        let spec = self
            .fields
            .get(field)
            .ok_or_else(|| Error::not_found(format!("named field {field} not found")))?;
        if data.len() != spec.dim {
            return Err(Error::invalid(format!(
                "dimension mismatch for field {field}: expected {}, got {}",
                spec.dim,
                data.len()
            )));
        }
        self.data.get_mut(field).unwrap().insert(point_id, data);
        Ok(())
    }

    pub fn get_vector(&self, field: &str, point_id: u64) -> Option<&[f32]> {
        self.data.get(field)?.get(&point_id).map(|v| v.as_slice())
    }

    pub fn remove_point(&mut self, point_id: u64) {
        for field_data in self.data.values_mut() {
            field_data.remove(&point_id);
        }
    }

    pub fn field_spec(&self, name: &str) -> Option<FieldSpec> {
        self.fields.get(name).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_data(&self, name: &str) -> Option<&HashMap<u64, Vec<f32>>> {
        self.data.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_field_fails() {
        let mut store = NamedVectorStore::new();
        store.create_field("title", 4).unwrap();
        assert!(store.create_field("title", 4).is_err());
    }

    #[test]
    fn set_vector_enforces_field_dimension() {
        let mut store = NamedVectorStore::new();
        store.create_field("title", 4).unwrap();
        assert!(store.set_vector("title", 1, vec![1.0, 2.0]).is_err());
        store.set_vector("title", 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(store.get_vector("title", 1).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn drop_field_removes_its_data() {
        let mut store = NamedVectorStore::new();
        store.create_field("title", 2).unwrap();
        store.set_vector("title", 1, vec![1.0, 2.0]).unwrap();
        store.drop_field("title").unwrap();
        assert!(store.get_vector("title", 1).is_none());
        assert!(store.drop_field("title").is_err());
    }
}
