//! Length-prefixed binary serialization for every persisted structure.
//!
//! All files share one primitive vocabulary: little-endian fixed-width
//! integers and floats, and UTF-8 strings prefixed with a `u32` byte length.
//! Writes go to a temp file in the destination directory and are renamed into
//! place, so a crash mid-write never leaves a truncated output that would
//! satisfy a later skip-and-load check.
//!
//! Map-shaped structures are written in sorted-key order so that rebuilding
//! from identical inputs produces byte-identical files.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::coordinates::Coordinates;
use crate::error::Result;

/// A structure with a fixed on-disk record layout.
pub trait DiskRecord: Sized {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()>;
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self>;
}

/// Writes a `u32` byte-length prefix followed by the UTF-8 bytes.
pub fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

/// Reads a string written by [`write_string`].
pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Serializes `value` to `path` atomically (temp file + rename).
pub fn save<T: DiskRecord>(value: &T, path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    let mut w = BufWriter::new(File::create(&tmp)?);
    value.write_to(&mut w)?;
    w.flush()?;
    drop(w);
    fs::rename(&tmp, path)
}

/// Deserializes a structure written by [`save`].
pub fn load<T: DiskRecord>(path: &Path) -> io::Result<T> {
    let mut r = BufReader::new(File::open(path)?);
    T::read_from(&mut r)
}

/// The phase skip-and-load rule: if `path` exists the structure is read back
/// from disk; otherwise it is built, persisted and returned.
pub fn load_or_build<T, F>(name: &str, path: &Path, build: F) -> Result<T>
where
    T: DiskRecord,
    F: FnOnce() -> Result<T>,
{
    if path.exists() {
        tracing::info!("{name}: loading previously built output from {path:?}");
        return Ok(load(path)?);
    }
    let value = build()?;
    save(&value, path)?;
    tracing::info!("{name}: built and saved to {path:?}");
    Ok(value)
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    keys
}

/// Layout: `N`, then `N x (title, lat: f64, lon: f64)`.
impl DiskRecord for HashMap<String, Coordinates> {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.len() as u32)?;
        for key in sorted_keys(self) {
            write_string(w, key)?;
            self[key].write_to(w)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut map = HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let title = read_string(r)?;
            map.insert(title, Coordinates::read_from(r)?);
        }
        Ok(map)
    }
}

/// Layout: `N`, then `N x (title, target)`. Used for redirects and for the
/// "located-at" mapping, which share the shape.
impl DiskRecord for HashMap<String, String> {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.len() as u32)?;
        for key in sorted_keys(self) {
            write_string(w, key)?;
            write_string(w, &self[key])?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut map = HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let title = read_string(r)?;
            let target = read_string(r)?;
            map.insert(title, target);
        }
        Ok(map)
    }
}

/// Layout: `N`, then `N x (title, k, k x u32)`. Used for article categories.
impl DiskRecord for HashMap<String, Vec<u32>> {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.len() as u32)?;
        for key in sorted_keys(self) {
            write_string(w, key)?;
            let ids = &self[key];
            w.write_u32::<LittleEndian>(ids.len() as u32)?;
            for &id in ids {
                w.write_u32::<LittleEndian>(id)?;
            }
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut map = HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let title = read_string(r)?;
            let k = r.read_u32::<LittleEndian>()?;
            let mut ids = Vec::with_capacity(k as usize);
            for _ in 0..k {
                ids.push(r.read_u32::<LittleEndian>()?);
            }
            map.insert(title, ids);
        }
        Ok(map)
    }
}

/// Layout: `N`, then `N x (title, k, k x string)`. Used for "is-a-in".
impl DiskRecord for HashMap<String, Vec<String>> {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.len() as u32)?;
        for key in sorted_keys(self) {
            write_string(w, key)?;
            let targets = &self[key];
            w.write_u32::<LittleEndian>(targets.len() as u32)?;
            for target in targets {
                write_string(w, target)?;
            }
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut map = HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let title = read_string(r)?;
            let k = r.read_u32::<LittleEndian>()?;
            let mut targets = Vec::with_capacity(k as usize);
            for _ in 0..k {
                targets.push(read_string(r)?);
            }
            map.insert(title, targets);
        }
        Ok(map)
    }
}
