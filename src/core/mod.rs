//! Core layer - file-level metadata and payload compression.
//!
//! This module provides:
//! - [`FileMetadata`] - typed key-value metadata attached to a whole cache file
//! - [`compress`] / [`decompress`] - zlib framing for layer payloads

mod metadata;
mod compression;

pub use metadata::{FileMetadata, MetaValue};
pub use compression::{compress, decompress};

pub(crate) use metadata::{read_str, write_str};
