//! Disk-resident field container.
//!
//! The container capability is split in two halves:
//! - [`FieldInput`] - enumerate partitions and layers, read typed layers and file metadata
//! - [`FieldOutput`] - create a file, append typed layers and file metadata
//!
//! [`Field3dInputFile`] and [`Field3dOutputFile`] implement them over the
//! binary container described in [`format`].

pub mod format;
mod index;
mod reader;
mod writer;

use std::path::Path;

pub use index::{ContainerIndex, IndexEntry, PartitionIndex};
pub use reader::{Field3dInputFile, IStreams};
pub use writer::{Field3dOutputFile, OStream};

use crate::core::FileMetadata;
use crate::field::{FieldClass, Layer, LayerHeader};
use crate::util::{DataType, Error, Result, Sample, Voxel};

/// How a reader accesses the file it opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Memory-map the file.
    #[default]
    Mapped,
    /// Read blocks through a shared file handle.
    Buffered,
}

/// Read side of a field container.
pub trait FieldInput {
    /// Open an existing file. Any previously open file is closed first.
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Open a file without keeping it mapped, so the same path can be
    /// recreated while this handle is still in use.
    fn open_detached(&mut self, path: &Path) -> Result<()> {
        self.open(path)
    }

    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Access mode for subsequent [`FieldInput::open`] calls.
    fn set_read_mode(&mut self, _mode: ReadMode) {}

    /// Partition names in file order.
    fn partition_names(&self) -> Vec<String>;

    /// Names of scalar layers in `partition`, in write order.
    fn scalar_layer_names(&self, partition: &str) -> Vec<String>;

    /// Names of 3-vector layers in `partition`, in write order.
    fn vector_layer_names(&self, partition: &str) -> Vec<String>;

    /// Headers of all layers with the given element type, optionally
    /// restricted to one layer name. Cheap: no voxel data is touched.
    fn headers(&self, name: Option<&str>, data_type: DataType) -> Vec<LayerHeader>;

    /// Load all layers with the given element type, optionally restricted
    /// to one layer name.
    fn read_layers(&self, name: Option<&str>, data_type: DataType) -> Result<Vec<Layer>>;

    /// Load only the first layer named `name` with the given element type.
    fn read_layer(&self, name: &str, data_type: DataType) -> Result<Option<Layer>> {
        Ok(self.read_layers(Some(name), data_type)?.into_iter().next())
    }

    /// File-level metadata as last flushed by the writer.
    fn metadata(&self) -> &FileMetadata;

    fn read_scalar_layers<T: Sample>(&self, name: Option<&str>) -> Result<Vec<Layer>>
    where
        Self: Sized,
    {
        self.read_layers(name, DataType::scalar(T::PRECISION))
    }

    fn read_vector_layers<T: Sample>(&self, name: Option<&str>) -> Result<Vec<Layer>>
    where
        Self: Sized,
    {
        self.read_layers(name, DataType::vector(T::PRECISION))
    }
}

/// Write side of a field container.
pub trait FieldOutput {
    /// Create a new file. Fails if the file exists and `overwrite` is false.
    fn create(&mut self, path: &Path, overwrite: bool) -> Result<()>;

    /// Finalize the file. Closing a handle that is not open is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Append one layer to the partition named after the layer's field name.
    fn write_layer(&mut self, layer: &Layer) -> Result<()>;

    /// File-level metadata, persisted by [`FieldOutput::flush_global_metadata`].
    fn metadata_mut(&mut self) -> &mut FileMetadata;

    fn flush_global_metadata(&mut self) -> Result<()>;

    /// Zlib level for layer payloads, 0 stores them uncompressed.
    fn set_compression(&mut self, level: i32);

    /// Write a field of any element type. Vector fields go through this
    /// entry point too, parameterized on their 3-component element.
    fn write_scalar_layer<F: FieldClass>(&mut self, field: &F) -> Result<()>
    where
        Self: Sized,
    {
        self.write_layer(&Layer::from_field(field))
    }

    /// Write a field whose element type must be a 3-vector.
    fn write_vector_layer<F: FieldClass>(&mut self, field: &F) -> Result<()>
    where
        Self: Sized,
    {
        if !F::Value::DATA_TYPE.is_vector() {
            return Err(Error::TypeUnsupported(format!(
                "{} is not a vector layer ({})",
                field.meta().attribute,
                F::Value::DATA_TYPE
            )));
        }
        self.write_scalar_layer(field)
    }
}
