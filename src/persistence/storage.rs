//! SoA storage codec (spec §4.11).
//!
//! Record: dimension (u32), live-count (u64), then per live vector: id (u64)
//! — necessary to round-trip `DenseVector::id`, which spec §3's data model
//! requires but §4.11's field list for this record omits; see DESIGN.md —
//! raw floats (dim * f32), metadata-count (u32), metadata pairs as
//! length-prefixed UTF-8 key/value. Only live vectors are persisted;
//! tombstones are not round-tripped (a reload starts from a dense slot
//! range with no deletions, equivalent to loading a just-compacted store).

use super::{BinReader, BinWriter, MAGIC_STORAGE, VERSION_STORAGE};
use crate::error::Result;
use crate::storage::SoaStorage;
use std::io::{Read, Write};

pub fn save<W: Write>(storage: &SoaStorage, w: &mut BinWriter<W>) -> Result<()> {
    w.write_u32(MAGIC_STORAGE)?;
    w.write_u32(VERSION_STORAGE)?;
    w.write_u32(storage.dim() as u32)?;
    w.write_u64(storage.live_count() as u64)?;
    for (slot, vector, metadata) in storage.iter_live() {
        let id = storage.id_at(slot as usize).unwrap_or(0);
        w.write_u64(id)?;
        w.write_f32_slice(vector)?;
        w.write_u32(metadata.len() as u32)?;
        for (k, v) in metadata {
            w.write_str(k)?;
            w.write_str(v)?;
        }
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<SoaStorage> {
    super::check_magic_version(r, MAGIC_STORAGE, VERSION_STORAGE)?;
    let dim = r.read_u32()? as usize;
    let live_count = r.read_u64()? as usize;
    let mut storage = SoaStorage::new(dim)?;
    for _ in 0..live_count {
        let id = r.read_u64()?;
        let data = r.read_f32_vec(dim)?;
        let md_count = r.read_u32()? as usize;
        let mut metadata = Vec::with_capacity(md_count);
        for _ in 0..md_count {
            let k = r.read_str()?;
            let v = r.read_str()?;
            metadata.push((k, v));
        }
        storage.append(id, data, metadata)?;
    }
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_data_metadata_and_order() {
        let mut s = SoaStorage::new(3).unwrap();
        s.append(10, vec![1.0, 2.0, 3.0], vec![("color".into(), "red".into())])
            .unwrap();
        s.append(20, vec![4.0, 5.0, 6.0], vec![]).unwrap();

        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            save(&s, &mut w).unwrap();
        }
        let mut r = BinReader::new(buf.as_slice());
        let loaded = load(&mut r).unwrap();

        assert_eq!(loaded.dim(), 3);
        assert_eq!(loaded.live_count(), 2);
        assert_eq!(loaded.get(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(loaded.id_at(0), Some(10));
        assert_eq!(
            loaded.metadata(0).unwrap(),
            &vec![("color".to_string(), "red".to_string())]
        );
        assert_eq!(loaded.get(1).unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn deleted_vectors_are_not_persisted() {
        let mut s = SoaStorage::new(2).unwrap();
        s.append(1, vec![1.0, 1.0], vec![]).unwrap();
        s.append(2, vec![2.0, 2.0], vec![]).unwrap();
        s.delete(0).unwrap();

        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            save(&s, &mut w).unwrap();
        }
        let mut r = BinReader::new(buf.as_slice());
        let loaded = load(&mut r).unwrap();
        assert_eq!(loaded.live_count(), 1);
        assert_eq!(loaded.get(0).unwrap(), &[2.0, 2.0]);
    }
}
