//! Binary persistence framing (spec §4.11, §6).
//!
//! Every on-disk record starts with a 4-byte magic and a 4-byte version,
//! followed by component-specific fields. All numeric fields are written in
//! platform-native order (cross-endian load/save is explicitly out of
//! scope, spec §4.11); strings and byte arrays are `u32`-length-prefixed
//! with no NUL terminator (spec §6). `save_atomic` implements the
//! write-to-temp-then-rename scheme spec §4.11 calls for whenever a base
//! path is supplied.

pub mod ivf;
pub mod jsonpath;
pub mod kdtree;
pub mod namedvec;
pub mod pq;
pub mod snapshot;
pub mod sparse;
pub mod storage;

use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

pub const MAGIC_STORAGE: u32 = u32::from_le_bytes(*b"GVST");
pub const MAGIC_KDTREE: u32 = u32::from_le_bytes(*b"GVKD");
pub const MAGIC_IVF: u32 = u32::from_le_bytes(*b"GVIV");
pub const MAGIC_PQ: u32 = u32::from_le_bytes(*b"GVPQ");
pub const MAGIC_SPARSE: u32 = u32::from_le_bytes(*b"GVSP");
pub const MAGIC_NAMEDVEC: u32 = 0x4756_4E56; // "GVNV"
pub const MAGIC_SNAPSHOT: &[u8; 6] = b"GVSNAP";
pub const MAGIC_JSONPATH: &[u8; 6] = b"GV_JPI";

pub const VERSION_STORAGE: u32 = 1;
pub const VERSION_KDTREE: u32 = 1;
pub const VERSION_IVF: u32 = 1;
pub const VERSION_PQ: u32 = 1;
pub const VERSION_SPARSE: u32 = 1;
pub const VERSION_NAMEDVEC: u32 = 1;
pub const VERSION_SNAPSHOT: u32 = 1;
pub const VERSION_JSONPATH: u32 = 1;

/// Minimal length-prefixed binary writer over any `Write` sink.
pub struct BinWriter<W: Write> {
    inner: W,
}

impl<W: Write> BinWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_all(&[v])?;
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner.write_all(&v.to_ne_bytes())?;
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.inner.write_all(&v.to_ne_bytes())?;
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.inner.write_all(&v.to_ne_bytes())?;
        Ok(())
    }

    pub fn write_bool_u32(&mut self, v: bool) -> Result<()> {
        self.write_u32(if v { 1 } else { 0 })
    }

    pub fn write_f32_slice(&mut self, v: &[f32]) -> Result<()> {
        for &x in v {
            self.write_f32(x)?;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_u32(v.len() as u32)?;
        self.inner.write_all(v)?;
        Ok(())
    }

    pub fn write_str(&mut self, v: &str) -> Result<()> {
        self.write_bytes(v.as_bytes())
    }

    pub fn write_magic_fixed(&mut self, magic: &[u8]) -> Result<()> {
        self.inner.write_all(magic)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Minimal length-prefixed binary reader over any `Read` source.
pub struct BinReader<R: Read> {
    inner: R,
}

impl<R: Read> BinReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| Error::corrupt("unexpected EOF reading u8"))?;
        Ok(buf[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| Error::corrupt("unexpected EOF reading u32"))?;
        Ok(u32::from_ne_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| Error::corrupt("unexpected EOF reading u64"))?;
        Ok(u64::from_ne_bytes(buf))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| Error::corrupt("unexpected EOF reading f32"))?;
        Ok(f32::from_ne_bytes(buf))
    }

    pub fn read_bool_u32(&mut self) -> Result<bool> {
        Ok(self.read_u32()? != 0)
    }

    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_f32()?);
        }
        Ok(out)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| Error::corrupt("unexpected EOF reading byte array"))?;
        Ok(buf)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| Error::corrupt("invalid UTF-8 in string field"))
    }

    pub fn read_magic_fixed(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| Error::corrupt("unexpected EOF reading magic"))?;
        Ok(buf)
    }
}

/// Checks a record's `u32` magic + `u32` version against expectations.
/// Unknown magic fails with "unsupported format"; version mismatch fails
/// with "unsupported version" (spec §4.11, §6).
pub fn check_magic_version<R: Read>(
    reader: &mut BinReader<R>,
    expected_magic: u32,
    expected_version: u32,
) -> Result<()> {
    let magic = reader.read_u32()?;
    if magic != expected_magic {
        return Err(Error::precondition(format!(
            "unsupported format: expected magic {expected_magic:#x}, got {magic:#x}"
        )));
    }
    let version = reader.read_u32()?;
    if version != expected_version {
        return Err(Error::precondition(format!(
            "unsupported version: expected {expected_version}, got {version}"
        )));
    }
    Ok(())
}

/// Writes `bytes` to a temp file beside `path` and renames it into place,
/// so readers never observe a partially written file (spec §4.11).
pub fn save_atomic(path: &Path, write: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> Result<()> {
    let mut buf = Vec::new();
    write(&mut buf)?;
    let tmp_path = path.with_extension("tmp");
    {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(&buf)?;
        f.flush()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
