//! Named-vectors store codec (spec §6): `u32` magic `0x4756_4E56` ("GVNV"),
//! `u32` version, field-count (u32), then per field: name (string), dim
//! (u32), vector-count (u32), then per vector: point id (u64), dim floats.

use super::{BinReader, BinWriter, MAGIC_NAMEDVEC, VERSION_NAMEDVEC};
use crate::error::Result;
use crate::schema::NamedVectorStore;
use std::io::{Read, Write};

pub fn save<W: Write>(store: &NamedVectorStore, w: &mut BinWriter<W>) -> Result<()> {
    w.write_u32(MAGIC_NAMEDVEC)?;
    w.write_u32(VERSION_NAMEDVEC)?;
    let fields: Vec<_> = store.fields().collect();
    w.write_u32(fields.len() as u32)?;
    for (name, spec) in fields {
        w.write_str(name)?;
        w.write_u32(spec.dim as u32)?;
        let data = store.field_data(name).unwrap();
        w.write_u32(data.len() as u32)?;
        for (&point_id, vector) in data {
            w.write_u64(point_id)?;
            w.write_f32_slice(vector)?;
        }
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<NamedVectorStore> {
    super::check_magic_version(r, MAGIC_NAMEDVEC, VERSION_NAMEDVEC)?;
    let field_count = r.read_u32()? as usize;
    let mut store = NamedVectorStore::new();
    for _ in 0..field_count {
        let name = r.read_str()?;
        let dim = r.read_u32()? as usize;
        store.create_field(name.clone(), dim)?;
        let vector_count = r.read_u32()? as usize;
        for _ in 0..vector_count {
            let point_id = r.read_u64()?;
            let vector = r.read_f32_vec(dim)?;
            store.set_vector(&name, point_id, vector)?;
        }
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_fields_and_vectors() {
        let mut store = NamedVectorStore::new();
        store.create_field("title", 3).unwrap();
        store.set_vector("title", 1, vec![1.0, 2.0, 3.0]).unwrap();
        store.create_field("image", 2).unwrap();
        store.set_vector("image", 1, vec![9.0, 8.0]).unwrap();

        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            save(&store, &mut w).unwrap();
        }
        let mut r = BinReader::new(buf.as_slice());
        let loaded = load(&mut r).unwrap();
        assert_eq!(loaded.get_vector("title", 1).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(loaded.get_vector("image", 1).unwrap(), &[9.0, 8.0]);
    }
}
