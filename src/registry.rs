//! Bijective string-to-id registries.
//!
//! Ids are dense and assigned in insertion order starting at a configurable
//! base (0 for titles and categories, 1 for dictionary terms). Once a
//! registry is persisted the bijection is stable across runs; new strings
//! extend the range.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::binio::{self, DiskRecord};

/// A bijection between strings and a contiguous integer range.
#[derive(Debug, Clone)]
pub struct StringIdRegistry {
    first_id: u32,
    ids: HashMap<String, u32>,
    /// Index `id - first_id` holds the string for `id`.
    strings: Vec<String>,
}

impl StringIdRegistry {
    /// An empty registry whose first assigned id is `first_id`.
    pub fn new(first_id: u32) -> StringIdRegistry {
        StringIdRegistry {
            first_id,
            ids: HashMap::new(),
            strings: Vec::new(),
        }
    }

    /// Builds a registry from strings in iteration order, ids from `first_id`.
    pub fn from_strings<I>(first_id: u32, strings: I) -> StringIdRegistry
    where
        I: IntoIterator<Item = String>,
    {
        let mut registry = StringIdRegistry::new(first_id);
        for s in strings {
            registry.add(s);
        }
        registry
    }

    /// Inserts `s` if absent and returns its id.
    pub fn add(&mut self, s: String) -> u32 {
        if let Some(&id) = self.ids.get(&s) {
            return id;
        }
        let id = self.first_id + self.strings.len() as u32;
        self.ids.insert(s.clone(), id);
        self.strings.push(s);
        id
    }

    pub fn id(&self, s: &str) -> Option<u32> {
        self.ids.get(s).copied()
    }

    pub fn string(&self, id: u32) -> Option<&str> {
        let index = id.checked_sub(self.first_id)? as usize;
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// The id one past the largest assigned id.
    pub fn end_id(&self) -> u32 {
        self.first_id + self.strings.len() as u32
    }

    /// Strings in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (self.first_id + i as u32, s.as_str()))
    }
}

/// Layout: `N`, then `N x (string, id)` in id order.
impl DiskRecord for StringIdRegistry {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.strings.len() as u32)?;
        for (id, s) in self.iter() {
            binio::write_string(w, s)?;
            w.write_u32::<LittleEndian>(id)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<StringIdRegistry> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut pairs = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let s = binio::read_string(r)?;
            let id = r.read_u32::<LittleEndian>()?;
            pairs.push((id, s));
        }
        pairs.sort_unstable_by_key(|&(id, _)| id);

        let first_id = pairs.first().map_or(0, |&(id, _)| id);
        let mut registry = StringIdRegistry::new(first_id);
        for (id, s) in pairs {
            if id != registry.end_id() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("registry ids are not dense at id {id}"),
                ));
            }
            registry.add(s);
        }
        Ok(registry)
    }
}
