//! KD-tree codec (spec §4.11): flattened by pre-order traversal; each node
//! is axis (u32) + slot (u64) + two 1-byte child-presence flags.

use super::{BinReader, BinWriter, MAGIC_KDTREE, VERSION_KDTREE};
use crate::error::Result;
use crate::index::kdtree::KdTreeIndex;
use std::io::{Read, Write};

pub fn save<W: Write>(dim: usize, index: &KdTreeIndex, w: &mut BinWriter<W>) -> Result<()> {
    w.write_u32(MAGIC_KDTREE)?;
    w.write_u32(VERSION_KDTREE)?;
    w.write_u32(dim as u32)?;
    let nodes = index.preorder();
    w.write_u64(nodes.len() as u64)?;
    for (axis, slot, has_left, has_right) in nodes {
        w.write_u32(axis)?;
        w.write_u64(slot)?;
        w.write_u8(has_left as u8)?;
        w.write_u8(has_right as u8)?;
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<(usize, KdTreeIndex)> {
    super::check_magic_version(r, MAGIC_KDTREE, VERSION_KDTREE)?;
    let dim = r.read_u32()? as usize;
    let count = r.read_u64()? as usize;
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        let axis = r.read_u32()?;
        let slot = r.read_u64()?;
        let has_left = r.read_u8()? != 0;
        let has_right = r.read_u8()? != 0;
        nodes.push((axis, slot, has_left, has_right));
    }
    let index = KdTreeIndex::from_preorder(dim, &nodes)?;
    Ok((dim, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::index::PrimaryIndex;
    use crate::storage::SoaStorage;

    #[test]
    fn roundtrip_preserves_search_behavior() {
        let mut storage = SoaStorage::new(2).unwrap();
        let mut idx = KdTreeIndex::new(2);
        for (i, p) in [[0.0, 0.0], [8.0, 1.0], [1.0, 8.0], [9.0, 9.0]].iter().enumerate() {
            let slot = storage.append(i as u64, p.to_vec(), vec![]).unwrap();
            idx.insert(&storage, slot).unwrap();
        }

        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            save(2, &idx, &mut w).unwrap();
        }
        let mut r = BinReader::new(buf.as_slice());
        let (dim, loaded) = load(&mut r).unwrap();
        assert_eq!(dim, 2);

        let expect = idx.search(&storage, &[2.0, 2.0], 4, Metric::Euclidean, None).unwrap();
        let got = loaded.search(&storage, &[2.0, 2.0], 4, Metric::Euclidean, None).unwrap();
        assert_eq!(expect, got);
    }
}
