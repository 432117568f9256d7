//! JSON-path index codec (spec §6): fixed 6-byte ASCII magic `GV_JPI`, `u32`
//! version, entry-count (u32), then per entry: key (string), value
//! (string), slot-count (u32), slots (u64 each).

use super::{BinReader, BinWriter, MAGIC_JSONPATH, VERSION_JSONPATH};
use crate::error::{Error, Result};
use crate::jsonpath::JsonPathIndex;
use std::io::{Read, Write};

pub fn save<W: Write>(index: &JsonPathIndex, w: &mut BinWriter<W>) -> Result<()> {
    w.write_magic_fixed(MAGIC_JSONPATH)?;
    w.write_u32(VERSION_JSONPATH)?;
    let entries: Vec<_> = index.entries().collect();
    w.write_u32(entries.len() as u32)?;
    for ((key, value), slots) in entries {
        w.write_str(key)?;
        w.write_str(value)?;
        w.write_u32(slots.len() as u32)?;
        for &slot in slots {
            w.write_u64(slot)?;
        }
    }
    Ok(())
}

pub fn load<R: Read>(r: &mut BinReader<R>) -> Result<JsonPathIndex> {
    let magic = r.read_magic_fixed(MAGIC_JSONPATH.len())?;
    if magic != MAGIC_JSONPATH.to_vec() {
        return Err(Error::precondition("unsupported format: bad jsonpath magic"));
    }
    let version = r.read_u32()?;
    if version != VERSION_JSONPATH {
        return Err(Error::precondition(format!(
            "unsupported version: expected {VERSION_JSONPATH}, got {version}"
        )));
    }
    let entry_count = r.read_u32()? as usize;
    let mut index = JsonPathIndex::new();
    for _ in 0..entry_count {
        let key = r.read_str()?;
        let value = r.read_str()?;
        let slot_count = r.read_u32()? as usize;
        for _ in 0..slot_count {
            let slot = r.read_u64()?;
            index.index(slot, &[(key.clone(), value.clone())])?;
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_lookups() {
        let mut idx = JsonPathIndex::new();
        idx.index(1, &[("color".to_string(), "red".to_string())]).unwrap();
        idx.index(2, &[("color".to_string(), "red".to_string())]).unwrap();

        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            save(&idx, &mut w).unwrap();
        }
        let mut r = BinReader::new(buf.as_slice());
        let loaded = load(&mut r).unwrap();
        let mut got = loaded.lookup("color", "red").to_vec();
        got.sort();
        assert_eq!(got, vec![1, 2]);
    }
}
