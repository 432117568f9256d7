//! Snapshot/version codec (spec §6): fixed 6-byte ASCII magic `GVSNAP`,
//! `u32` version, then id (u64), timestamp_micros (u64), length-prefixed
//! label, followed by the storage record (reusing the SoA storage codec).

use super::{storage as storage_codec, BinReader, BinWriter, MAGIC_SNAPSHOT, VERSION_SNAPSHOT};
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::storage::SoaStorage;
use std::io::{Read, Write};

pub fn save<W: Write>(
    id: u64,
    timestamp_micros: u64,
    label: &str,
    storage: &SoaStorage,
    w: &mut BinWriter<W>,
) -> Result<()> {
    w.write_magic_fixed(MAGIC_SNAPSHOT)?;
    w.write_u32(VERSION_SNAPSHOT)?;
    w.write_u64(id)?;
    w.write_u64(timestamp_micros)?;
    w.write_str(label)?;
    storage_codec::save(storage, w)
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<(u64, u64, String, SoaStorage)> {
    let magic = r.read_magic_fixed(MAGIC_SNAPSHOT.len())?;
    if magic != MAGIC_SNAPSHOT.to_vec() {
        return Err(Error::precondition("unsupported format: bad snapshot magic"));
    }
    let version = r.read_u32()?;
    if version != VERSION_SNAPSHOT {
        return Err(Error::precondition(format!(
            "unsupported version: expected {VERSION_SNAPSHOT}, got {version}"
        )));
    }
    let id = r.read_u64()?;
    let timestamp_micros = r.read_u64()?;
    let label = r.read_str()?;
    let storage = storage_codec::load(r)?;
    Ok((id, timestamp_micros, label, storage))
}

/// Convenience round-trip matching against a live snapshot object.
pub fn save_snapshot<W: Write>(snapshot: &Snapshot, w: &mut BinWriter<W>) -> Result<()> {
    save(
        snapshot.id,
        snapshot.timestamp_micros,
        &snapshot.label,
        snapshot.storage(),
        w,
    )
}
