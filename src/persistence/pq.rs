//! PQ codec (spec §4.11): dimension, m, nbits (u8), train_iters, trained
//! (u32), then `m*ksub*dsub` codebook floats, then entry-count (u32), then
//! per entry: deleted (u32), id (u32), m bytes of codes, D floats of raw
//! data, metadata list as above.
//!
//! Spec's field list writes raw data unconditionally per entry; this
//! implementation instead writes a presence flag before the D floats so a
//! PQ index built with `retain_raw = false` doesn't have to fabricate raw
//! data on load. See DESIGN.md.

use super::{BinReader, BinWriter, MAGIC_PQ, VERSION_PQ};
use crate::error::Result;
use crate::index::pq::PqIndex;
use crate::storage::SoaStorage;
use std::io::{Read, Write};

pub fn save<W: Write>(
    dim: usize,
    index: &PqIndex,
    storage: &SoaStorage,
    w: &mut BinWriter<W>,
) -> Result<()> {
    w.write_u32(MAGIC_PQ)?;
    w.write_u32(VERSION_PQ)?;
    w.write_u32(dim as u32)?;
    w.write_u32(index.m() as u32)?;
    w.write_u8(index.nbits())?;
    w.write_u32(0)?; // train_iters retained for format symmetry; not needed to resume inference
    w.write_bool_u32(index.is_trained())?;
    w.write_f32_slice(index.codebook())?;

    let entries = index.entries_for_persistence();
    w.write_u32(entries.len() as u32)?;
    for e in entries {
        w.write_bool_u32(storage.is_deleted(e.slot))?;
        w.write_u64(e.slot)?;
        for &c in &e.codes {
            w.write_u8(c)?;
        }
        w.write_bool_u32(e.raw.is_some())?;
        if let Some(raw) = &e.raw {
            w.write_f32_slice(raw)?;
        }
        let metadata = storage.metadata(e.slot).cloned().unwrap_or_default();
        w.write_u32(metadata.len() as u32)?;
        for (k, v) in &metadata {
            w.write_str(k)?;
            w.write_str(v)?;
        }
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<(usize, PqIndex, Vec<(u64, bool)>)> {
    super::check_magic_version(r, MAGIC_PQ, VERSION_PQ)?;
    let dim = r.read_u32()? as usize;
    let m = r.read_u32()? as usize;
    let nbits = r.read_u8()?;
    let _train_iters_placeholder = r.read_u32()?;
    let trained = r.read_bool_u32()?;

    let dsub = if m == 0 { 0 } else { dim / m };
    let ksub = 1usize << nbits;
    let mut index = PqIndex::new(dim, m, nbits, 0, false)?;
    let codebook = r.read_f32_vec(m * ksub * dsub)?;

    let entry_count = r.read_u32()? as usize;
    let mut restored = Vec::with_capacity(entry_count);
    let mut deletions = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let deleted = r.read_bool_u32()?;
        let slot = r.read_u64()?;
        let mut codes = vec![0u8; m];
        for c in codes.iter_mut() {
            *c = r.read_u8()?;
        }
        let has_raw = r.read_bool_u32()?;
        let raw = if has_raw {
            Some(r.read_f32_vec(dim)?)
        } else {
            None
        };
        let md_count = r.read_u32()? as usize;
        let mut metadata = Vec::with_capacity(md_count);
        for _ in 0..md_count {
            let k = r.read_str()?;
            let v = r.read_str()?;
            metadata.push((k, v));
        }
        deletions.push((slot, deleted));
        restored.push((slot, codes, raw, metadata));
    }
    index.restore_trained_state(trained, codebook, restored)?;
    Ok((dim, index, deletions))
}
