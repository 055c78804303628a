//! Container writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, warn};

use super::format::*;
use super::index::ContainerIndex;
use super::FieldOutput;
use crate::core::{compress, FileMetadata};
use crate::field::Layer;
use crate::util::{Error, Result};

/// Buffered output stream that tracks its write position.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, file),
            pos: 0,
        })
    }

    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a `[u64 size][payload]` block and return its position.
    pub fn write_block(&mut self, payload: &[u8]) -> Result<u64> {
        let pos = self.pos;
        self.write_u64(payload.len() as u64)?;
        self.write_bytes(payload)?;
        Ok(pos)
    }

    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::End(0))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes layers and metadata into a new container file.
#[derive(Default)]
pub struct Field3dOutputFile {
    stream: Option<OStream>,
    path: Option<PathBuf>,
    index: ContainerIndex,
    metadata: FileMetadata,
    compression: i32,
}

impl Field3dOutputFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a file in one call.
    pub fn create_at(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let mut out = Self::new();
        out.create(path.as_ref(), overwrite)?;
        Ok(out)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Layers written so far.
    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }

    fn stream(&mut self) -> Result<&mut OStream> {
        self.stream.as_mut().ok_or(Error::NotOpen)
    }
}

impl FieldOutput for Field3dOutputFile {
    fn create(&mut self, path: &Path, overwrite: bool) -> Result<()> {
        // Stale handles are never carried into a new file.
        self.stream = None;
        self.path = None;
        self.index = ContainerIndex::new();
        self.metadata.clear();

        if !overwrite && path.exists() {
            return Err(Error::open_failure(path, "file exists"));
        }

        let mut stream = OStream::create(path).map_err(|e| Error::open_failure(path, e.to_string()))?;
        stream.write_bytes(&make_header(false, NO_BLOCK))?;

        debug!(path = %path.display(), "created cache file");
        self.stream = Some(stream);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        let index_pos = stream.write_block(&self.index.to_bytes())?;
        stream.seek(0)?;
        stream.write_bytes(&make_header(true, index_pos))?;
        stream.seek_end()?;
        stream.flush()?;

        debug!(
            path = ?self.path,
            layers = self.index.layer_count(),
            "closed cache file"
        );
        Ok(())
    }

    #[inline]
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn write_layer(&mut self, layer: &Layer) -> Result<()> {
        let payload = compress(&layer.to_bytes(), self.compression)?;
        let pos = self.stream()?.write_block(&payload)?;
        debug!(
            partition = layer.name(),
            layer = layer.attribute(),
            class = layer.class_name(),
            data_type = %layer.data_type(),
            pos,
            "wrote layer"
        );
        self.index.insert(layer.header().clone(), pos);
        Ok(())
    }

    fn metadata_mut(&mut self) -> &mut FileMetadata {
        &mut self.metadata
    }

    fn flush_global_metadata(&mut self) -> Result<()> {
        let bytes = self.metadata.to_bytes();
        let pos = self.stream()?.write_block(&bytes)?;
        self.index.metadata_pos = pos;
        Ok(())
    }

    fn set_compression(&mut self, level: i32) {
        self.compression = level.clamp(0, 9);
    }
}

impl Drop for Field3dOutputFile {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                warn!("failed to finalize cache file on drop: {}", e);
            }
        }
    }
}
