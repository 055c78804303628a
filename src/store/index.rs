//! Layer index written at the end of a container.
//!
//! ```text
//! [metadata block position u64]
//! [partition count u32]
//!   per partition: [name][layer count u32]
//!     per layer: [layer header][block position u64]
//! ```

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::format::NO_BLOCK;
use crate::core::{read_str, write_str};
use crate::field::LayerHeader;
use crate::util::{Error, Result};

/// Location of one layer block.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
    pub header: LayerHeader,
    pub pos: u64,
}

/// Layers of one partition, in write order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitionIndex {
    pub name: String,
    pub layers: Vec<IndexEntry>,
}

impl PartitionIndex {
    /// Layer names whose element extent is `extent`.
    pub fn layer_names(&self, extent: u8) -> Vec<String> {
        self.layers
            .iter()
            .filter(|e| e.header.data_type.extent == extent)
            .map(|e| e.header.meta.attribute.clone())
            .collect()
    }
}

/// Table of contents for a container file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerIndex {
    /// Position of the last flushed metadata block, or [`NO_BLOCK`].
    pub metadata_pos: u64,
    pub partitions: Vec<PartitionIndex>,
}

impl ContainerIndex {
    pub fn new() -> Self {
        Self {
            metadata_pos: NO_BLOCK,
            partitions: Vec::new(),
        }
    }

    /// Record a layer block, creating its partition on first use.
    pub fn insert(&mut self, header: LayerHeader, pos: u64) {
        let entry = IndexEntry { header, pos };
        match self.partitions.iter_mut().find(|p| p.name == entry.header.meta.name) {
            Some(part) => part.layers.push(entry),
            None => self.partitions.push(PartitionIndex {
                name: entry.header.meta.name.clone(),
                layers: vec![entry],
            }),
        }
    }

    pub fn partition(&self, name: &str) -> Option<&PartitionIndex> {
        self.partitions.iter().find(|p| p.name == name)
    }

    /// All entries, partition by partition.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.partitions.iter().flat_map(|p| p.layers.iter())
    }

    pub fn layer_count(&self) -> usize {
        self.partitions.iter().map(|p| p.layers.len()).sum()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writes into a Vec<u8> cannot fail.
        let _ = self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u64::<LittleEndian>(self.metadata_pos)?;
        out.write_u32::<LittleEndian>(self.partitions.len() as u32)?;
        for part in &self.partitions {
            write_str(out, &part.name)?;
            out.write_u32::<LittleEndian>(part.layers.len() as u32)?;
            for entry in &part.layers {
                entry.header.write_into(out)?;
                out.write_u64::<LittleEndian>(entry.pos)?;
            }
        }
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let metadata_pos = cur
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::UnexpectedEof(cur.position()))?;
        let num_partitions = cur
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::UnexpectedEof(cur.position()))?;

        let mut partitions = Vec::new();
        for _ in 0..num_partitions {
            let name = read_str(&mut cur)?;
            let num_layers = cur
                .read_u32::<LittleEndian>()
                .map_err(|_| Error::UnexpectedEof(cur.position()))?;
            let mut layers = Vec::new();
            for _ in 0..num_layers {
                let header = LayerHeader::read_from(&mut cur)?;
                if header.meta.name != name {
                    return Err(Error::invalid(format!(
                        "layer '{}' of partition '{}' is indexed under '{}'",
                        header.meta.attribute, header.meta.name, name
                    )));
                }
                let pos = cur
                    .read_u64::<LittleEndian>()
                    .map_err(|_| Error::UnexpectedEof(cur.position()))?;
                layers.push(IndexEntry { header, pos });
            }
            partitions.push(PartitionIndex { name, layers });
        }

        Ok(Self { metadata_pos, partitions })
    }
}
