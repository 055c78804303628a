//! File-level metadata for cache files.
//!
//! Metadata is a small ordered map of typed values. The cache writer
//! stores an informational string under `"Info"` and the fluid's dynamic
//! offset as a float 3-vector under `"Offset"`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use smallvec::SmallVec;
use std::fmt;
use std::io::{Cursor, Read};

use crate::util::{Error, Result};

const TAG_STR: u8 = 0;
const TAG_VEC_FLOAT: u8 = 1;

/// A typed metadata value.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaValue {
    Str(String),
    VecFloat([f32; 3]),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::VecFloat(v) => write!(f, "({}, {}, {})", v[0], v[1], v[2]),
        }
    }
}

/// Metadata storage - ordered key-value pairs.
///
/// Uses SmallVec optimization for the common case of few entries.
#[derive(Clone, Default, PartialEq)]
pub struct FileMetadata {
    entries: SmallVec<[(String, MetaValue); 4]>,
}

impl FileMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: MetaValue) {
        let key = key.into();
        for (k, v) in &mut self.entries {
            if k == &key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, MetaValue::Str(value.into()));
    }

    pub fn set_vec_float(&mut self, key: impl Into<String>, value: [f32; 3]) {
        self.set(key, MetaValue::VecFloat(value));
    }

    /// String value under `key`, or `default` when absent or of another type.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(MetaValue::Str(s)) => s,
            _ => default,
        }
    }

    /// Float 3-vector under `key`, or `default`.
    pub fn vec_float_or(&self, key: &str, default: [f32; 3]) -> [f32; 3] {
        match self.get(key) {
            Some(MetaValue::VecFloat(v)) => *v,
            _ => default,
        }
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over key-value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to the container's metadata block encoding.
    ///
    /// Format: `[count: u32]` then per entry `[key_len: u32][key][tag: u8][value]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writes into a Vec<u8> cannot fail.
        let _ = self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u32::<LittleEndian>(self.entries.len() as u32)?;
        for (key, value) in &self.entries {
            write_str(out, key)?;
            match value {
                MetaValue::Str(s) => {
                    out.write_u8(TAG_STR)?;
                    write_str(out, s)?;
                }
                MetaValue::VecFloat(v) => {
                    out.write_u8(TAG_VEC_FLOAT)?;
                    for c in v {
                        out.write_f32::<LittleEndian>(*c)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse a metadata block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let count = cur.read_u32::<LittleEndian>().map_err(|_| eof(&cur))?;
        let mut meta = Self::new();
        for _ in 0..count {
            let key = read_str(&mut cur)?;
            let tag = cur.read_u8().map_err(|_| eof(&cur))?;
            let value = match tag {
                TAG_STR => MetaValue::Str(read_str(&mut cur)?),
                TAG_VEC_FLOAT => {
                    let mut v = [0.0f32; 3];
                    for c in &mut v {
                        *c = cur.read_f32::<LittleEndian>().map_err(|_| eof(&cur))?;
                    }
                    MetaValue::VecFloat(v)
                }
                other => return Err(Error::invalid(format!("unknown metadata tag {}", other))),
            };
            meta.set(key, value);
        }
        Ok(meta)
    }
}

fn eof(cur: &Cursor<&[u8]>) -> Error {
    Error::UnexpectedEof(cur.position())
}

pub(crate) fn write_str(out: &mut Vec<u8>, s: &str) -> std::io::Result<()> {
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

pub(crate) fn read_str(cur: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cur.read_u32::<LittleEndian>().map_err(|_| eof(cur))? as usize;
    let remaining = cur.get_ref().len() as u64 - cur.position();
    if len as u64 > remaining {
        return Err(eof(cur));
    }
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

impl fmt::Debug for FileMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}
