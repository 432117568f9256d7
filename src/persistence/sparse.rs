//! Sparse inverted index codec (spec §4.11 binary framing applied to §4.8's
//! data model): dimension (u32), vector-count (u32), then per vector: id
//! (u64), nnz (u32), nnz pairs of (index u32, value f32), metadata count
//! (u32) and length-prefixed key/value pairs.

use super::{BinReader, BinWriter, MAGIC_SPARSE, VERSION_SPARSE};
use crate::error::Result;
use crate::index::sparse::SparseIndex;
use crate::vector::SparseVector;
use std::io::{Read, Write};

pub fn save<W: Write>(index: &SparseIndex, w: &mut BinWriter<W>) -> Result<()> {
    w.write_u32(MAGIC_SPARSE)?;
    w.write_u32(VERSION_SPARSE)?;
    w.write_u32(index.dim())?;
    w.write_u32(index.len() as u32)?;
    for vector in index.iter() {
        w.write_u64(vector.id)?;
        w.write_u32(vector.entries.len() as u32)?;
        for &(term, value) in &vector.entries {
            w.write_u32(term)?;
            w.write_f32(value)?;
        }
        w.write_u32(vector.metadata.len() as u32)?;
        for (k, v) in &vector.metadata {
            w.write_str(k)?;
            w.write_str(v)?;
        }
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<SparseIndex> {
    super::check_magic_version(r, MAGIC_SPARSE, VERSION_SPARSE)?;
    let dim = r.read_u32()?;
    let count = r.read_u32()? as usize;
    let mut index = SparseIndex::new(dim);
    for _ in 0..count {
        let id = r.read_u64()?;
        let nnz = r.read_u32()? as usize;
        let mut entries = Vec::with_capacity(nnz);
        for _ in 0..nnz {
            let term = r.read_u32()?;
            let value = r.read_f32()?;
            entries.push((term, value));
        }
        let md_count = r.read_u32()? as usize;
        let mut metadata = Vec::with_capacity(md_count);
        for _ in 0..md_count {
            let k = r.read_str()?;
            let v = r.read_str()?;
            metadata.push((k, v));
        }
        index.add(SparseVector::new(id, dim, entries).with_metadata(metadata))?;
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_postings_and_search() {
        let mut idx = SparseIndex::new(10);
        idx.add(
            SparseVector::new(1, 10, vec![(1, 2.0), (2, 1.0)])
                .with_metadata(vec![("tag".into(), "a".into())]),
        )
        .unwrap();
        idx.add(SparseVector::new(2, 10, vec![(2, 5.0)])).unwrap();

        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            save(&idx, &mut w).unwrap();
        }
        let mut r = BinReader::new(buf.as_slice());
        let loaded = load(&mut r).unwrap();
        assert_eq!(loaded.len(), 2);

        let query = SparseVector::new(99, 10, vec![(1, 1.0), (2, 1.0)]);
        let expect = idx.search(&query, 2, None).unwrap();
        let got = loaded.search(&query, 2, None).unwrap();
        assert_eq!(expect, got);
    }
}
