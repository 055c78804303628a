//! Container reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::format::*;
use super::index::{ContainerIndex, IndexEntry};
use super::{FieldInput, ReadMode};
use crate::core::{decompress, FileMetadata};
use crate::field::{Layer, LayerHeader};
use crate::util::{DataType, Error, Result};

/// Input streams over a container file.
/// Supports both memory-mapped and buffered I/O modes.
pub struct IStreams {
    inner: StreamsInner,
    version: u16,
    frozen: bool,
    size: u64,
}

enum StreamsInner {
    Mmap(Mmap),
    File(Arc<RwLock<File>>),
    /// Whole file copied into memory, independent of the path afterwards.
    Memory(Vec<u8>),
}

impl IStreams {
    /// Open a file for reading with memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = if use_mmap {
            // Safety: the file is opened read-only and not modified while mapped.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(Arc::new(RwLock::new(file)))
        };

        let (version, frozen) = match &inner {
            StreamsInner::Mmap(mmap) => Self::parse_header(mmap)?,
            StreamsInner::Memory(data) => Self::parse_header(data)?,
            StreamsInner::File(file) => {
                let mut f = file.write();
                let mut header = [0u8; HEADER_SIZE];
                f.seek(SeekFrom::Start(0))?;
                f.read_exact(&mut header)?;
                Self::parse_header(&header)?
            }
        };

        Ok(Self { inner, version, frozen, size })
    }

    /// Read the whole file into memory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let (version, frozen) = Self::parse_header(&data)?;
        let size = data.len() as u64;
        Ok(Self {
            inner: StreamsInner::Memory(data),
            version,
            frozen,
            size,
        })
    }

    fn parse_header(data: &[u8]) -> Result<(u16, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[..8] != CACHE_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let frozen = data[FROZEN_OFFSET] == FROZEN_FLAG;
        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        Ok((version, frozen))
    }

    /// True once the writer has closed the file and written its index.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Index position from the header.
    pub fn index_pos(&self) -> Result<u64> {
        self.read_u64(INDEX_POS_OFFSET as u64)
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let end = pos
            .checked_add(buf.len() as u64)
            .ok_or(Error::UnexpectedEof(u64::MAX))?;
        if end > self.size {
            return Err(Error::UnexpectedEof(end));
        }

        match &self.inner {
            StreamsInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..end as usize]);
                Ok(())
            }
            StreamsInner::Memory(data) => {
                buf.copy_from_slice(&data[pos as usize..end as usize]);
                Ok(())
            }
            StreamsInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read the payload of a `[u64 size][payload]` block.
    pub fn read_block(&self, pos: u64) -> Result<Vec<u8>> {
        if pos < HEADER_SIZE as u64 {
            return Err(Error::invalid(format!("block position {} inside header", pos)));
        }
        let len = self.read_u64(pos)?;
        if len > self.size {
            return Err(Error::UnexpectedEof(pos + 8 + len));
        }
        self.read_bytes(pos + 8, len as usize)
    }
}

/// Reads layers and metadata from a finished container file.
#[derive(Default)]
pub struct Field3dInputFile {
    streams: Option<IStreams>,
    path: Option<PathBuf>,
    index: ContainerIndex,
    metadata: FileMetadata,
    read_mode: ReadMode,
}

impl Field3dInputFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file in one call.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = Self::new();
        file.open(path.as_ref())?;
        Ok(file)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }

    /// Container version of the open file.
    pub fn version(&self) -> Option<u16> {
        self.streams.as_ref().map(IStreams::version)
    }

    fn matching<'a>(
        &'a self,
        name: Option<&'a str>,
        data_type: DataType,
    ) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        self.index.entries().filter(move |e| {
            e.header.data_type == data_type && name.map_or(true, |n| e.header.meta.attribute == n)
        })
    }

    fn attach(&mut self, path: &Path, streams: IStreams) -> Result<()> {
        if !streams.is_frozen() {
            return Err(Error::open_failure(path, "file was not closed by its writer"));
        }
        if streams.version() != CURRENT_VERSION {
            return Err(Error::UnsupportedVersion(streams.version()));
        }

        let index = ContainerIndex::from_bytes(&streams.read_block(streams.index_pos()?)?)?;
        let metadata = if index.metadata_pos == NO_BLOCK {
            FileMetadata::new()
        } else {
            FileMetadata::from_bytes(&streams.read_block(index.metadata_pos)?)?
        };

        debug!(
            path = %path.display(),
            partitions = index.partitions.len(),
            layers = index.layer_count(),
            "opened cache file"
        );
        self.streams = Some(streams);
        self.path = Some(path.to_path_buf());
        self.index = index;
        self.metadata = metadata;
        Ok(())
    }

    fn load(&self, entry: &IndexEntry) -> Result<Layer> {
        let streams = self.streams.as_ref().ok_or(Error::NotOpen)?;
        let payload = decompress(&streams.read_block(entry.pos)?)?;
        let layer = Layer::from_bytes(&payload)?;
        if layer.header() != &entry.header {
            return Err(Error::invalid(format!(
                "layer at {} does not match its index entry '{}'",
                entry.pos, entry.header.meta.attribute
            )));
        }
        Ok(layer)
    }
}

impl FieldInput for Field3dInputFile {
    fn open(&mut self, path: &Path) -> Result<()> {
        self.close();
        let streams = IStreams::open_opts(path, self.read_mode == ReadMode::Mapped)?;
        self.attach(path, streams)
    }

    fn open_detached(&mut self, path: &Path) -> Result<()> {
        self.close();
        self.attach(path, IStreams::load(path)?)
    }

    fn close(&mut self) {
        self.streams = None;
        self.path = None;
        self.index = ContainerIndex::new();
        self.metadata.clear();
    }

    #[inline]
    fn is_open(&self) -> bool {
        self.streams.is_some()
    }

    fn set_read_mode(&mut self, mode: ReadMode) {
        self.read_mode = mode;
    }

    fn partition_names(&self) -> Vec<String> {
        self.index.partitions.iter().map(|p| p.name.clone()).collect()
    }

    fn scalar_layer_names(&self, partition: &str) -> Vec<String> {
        self.index
            .partition(partition)
            .map(|p| p.layer_names(1))
            .unwrap_or_default()
    }

    fn vector_layer_names(&self, partition: &str) -> Vec<String> {
        self.index
            .partition(partition)
            .map(|p| p.layer_names(3))
            .unwrap_or_default()
    }

    fn headers(&self, name: Option<&str>, data_type: DataType) -> Vec<LayerHeader> {
        self.matching(name, data_type).map(|e| e.header.clone()).collect()
    }

    fn read_layers(&self, name: Option<&str>, data_type: DataType) -> Result<Vec<Layer>> {
        let layers = self
            .matching(name, data_type)
            .map(|e| self.load(e))
            .collect::<Result<Vec<_>>>();
        if let Err(e) = &layers {
            warn!(layer = ?name, %data_type, "failed to read layers: {}", e);
        }
        layers
    }

    fn read_layer(&self, name: &str, data_type: DataType) -> Result<Option<Layer>> {
        self.matching(Some(name), data_type).next().map(|e| self.load(e)).transpose()
    }

    fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }
}
