//! IVF-Flat codec (spec §4.11): nlist/nprobe/train_iters/cosine-flag
//! (u32 each), trained flag (u32), codebook floats, then `nlist` posting
//! lists (length-prefixed arrays of u64 slot indices).

use super::{BinReader, BinWriter, MAGIC_IVF, VERSION_IVF};
use crate::error::Result;
use crate::index::ivf::IvfFlatIndex;
use std::io::{Read, Write};

pub fn save<W: Write>(dim: usize, index: &IvfFlatIndex, w: &mut BinWriter<W>) -> Result<()> {
    w.write_u32(MAGIC_IVF)?;
    w.write_u32(VERSION_IVF)?;
    w.write_u32(dim as u32)?;
    w.write_u32(index.nlist() as u32)?;
    w.write_u32(index.nprobe() as u32)?;
    w.write_u32(index.train_iters() as u32)?;
    w.write_bool_u32(index.use_cosine())?;
    w.write_bool_u32(index.is_trained())?;
    w.write_f32_slice(index.centroids())?;
    for list in index.posting_lists() {
        w.write_u32(list.len() as u32)?;
        for &slot in list {
            w.write_u64(slot)?;
        }
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<(usize, IvfFlatIndex)> {
    super::check_magic_version(r, MAGIC_IVF, VERSION_IVF)?;
    let dim = r.read_u32()? as usize;
    let nlist = r.read_u32()? as usize;
    let nprobe = r.read_u32()? as usize;
    let train_iters = r.read_u32()? as usize;
    let use_cosine = r.read_bool_u32()?;
    let trained = r.read_bool_u32()?;
    let mut index = IvfFlatIndex::new(dim, nlist, nprobe, train_iters, use_cosine)?;
    let centroids = r.read_f32_vec(nlist * dim)?;
    let mut posting_lists = Vec::with_capacity(nlist);
    for _ in 0..nlist {
        let len = r.read_u32()? as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(r.read_u64()?);
        }
        posting_lists.push(list);
    }
    index.restore_trained_state(trained, centroids, posting_lists)?;
    Ok((dim, index))
}
