//! Field encoding descriptors and session storage configuration.

use std::fmt;

use super::channel::{ChannelKind, ChannelShape};
use crate::field::{DenseField, FieldClass, MacField, SparseField};
use crate::store::ReadMode;
use crate::util::{DataType, Error, Precision, Result};

/// Concrete field representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Representation {
    Dense,
    Sparse,
    Mac,
}

impl Representation {
    /// Class tag of the representation's layers.
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Dense => <DenseField<f32> as FieldClass>::CLASS_NAME,
            Self::Sparse => <SparseField<f32> as FieldClass>::CLASS_NAME,
            Self::Mac => <MacField<f32> as FieldClass>::CLASS_NAME,
        }
    }
}

/// On-disk encoding of one channel.
///
/// Resolved per channel by probing the store on read, chosen from the
/// channel kind and the session's [`StorageConfig`] on write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldEncoding {
    DenseScalarHalf,
    DenseScalarFloat,
    SparseScalarHalf,
    SparseScalarFloat,
    DenseVectorHalf,
    DenseVectorFloat,
    SparseVectorHalf,
    SparseVectorFloat,
    MacHalf,
    MacFloat,
}

impl FieldEncoding {
    pub const ALL: [FieldEncoding; 10] = [
        Self::DenseScalarHalf,
        Self::DenseScalarFloat,
        Self::SparseScalarHalf,
        Self::SparseScalarFloat,
        Self::DenseVectorHalf,
        Self::DenseVectorFloat,
        Self::SparseVectorHalf,
        Self::SparseVectorFloat,
        Self::MacHalf,
        Self::MacFloat,
    ];

    /// Look up a descriptor. MAC fields are always vector-valued and only
    /// half and float are supported.
    pub fn new(representation: Representation, vector: bool, precision: Precision) -> Option<Self> {
        use FieldEncoding::*;
        use Representation::*;

        let half = match precision {
            Precision::Half => true,
            Precision::Float => false,
            Precision::Double => return None,
        };
        Some(match (representation, vector, half) {
            (Dense, false, true) => DenseScalarHalf,
            (Dense, false, false) => DenseScalarFloat,
            (Sparse, false, true) => SparseScalarHalf,
            (Sparse, false, false) => SparseScalarFloat,
            (Dense, true, true) => DenseVectorHalf,
            (Dense, true, false) => DenseVectorFloat,
            (Sparse, true, true) => SparseVectorHalf,
            (Sparse, true, false) => SparseVectorFloat,
            (Mac, true, true) => MacHalf,
            (Mac, true, false) => MacFloat,
            (Mac, false, _) => return None,
        })
    }

    pub const fn representation(self) -> Representation {
        match self {
            Self::DenseScalarHalf
            | Self::DenseScalarFloat
            | Self::DenseVectorHalf
            | Self::DenseVectorFloat => Representation::Dense,
            Self::SparseScalarHalf
            | Self::SparseScalarFloat
            | Self::SparseVectorHalf
            | Self::SparseVectorFloat => Representation::Sparse,
            Self::MacHalf | Self::MacFloat => Representation::Mac,
        }
    }

    pub const fn precision(self) -> Precision {
        match self {
            Self::DenseScalarHalf
            | Self::SparseScalarHalf
            | Self::DenseVectorHalf
            | Self::SparseVectorHalf
            | Self::MacHalf => Precision::Half,
            _ => Precision::Float,
        }
    }

    pub const fn is_vector(self) -> bool {
        !matches!(
            self,
            Self::DenseScalarHalf | Self::DenseScalarFloat | Self::SparseScalarHalf | Self::SparseScalarFloat
        )
    }

    /// Element type of the stored layer.
    pub const fn data_type(self) -> DataType {
        if self.is_vector() {
            DataType::vector(self.precision())
        } else {
            DataType::scalar(self.precision())
        }
    }

    /// Shape of channel this encoding can carry.
    pub const fn shape(self) -> ChannelShape {
        match self.representation() {
            Representation::Mac => ChannelShape::Staggered,
            _ if self.is_vector() => ChannelShape::Vector,
            _ => ChannelShape::Scalar,
        }
    }

    /// Human-readable name, e.g. `"Sparse Scalar Field Half"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DenseScalarHalf => "Dense Scalar Field Half",
            Self::DenseScalarFloat => "Dense Scalar Field Float",
            Self::SparseScalarHalf => "Sparse Scalar Field Half",
            Self::SparseScalarFloat => "Sparse Scalar Field Float",
            Self::DenseVectorHalf => "Dense Vector Field Half",
            Self::DenseVectorFloat => "Dense Vector Field Float",
            Self::SparseVectorHalf => "Sparse Vector Field Half",
            Self::SparseVectorFloat => "Sparse Vector Field Float",
            Self::MacHalf => "MACField Half",
            Self::MacFloat => "MACField Float",
        }
    }

    /// Encoding a channel is written with under `storage`.
    ///
    /// Scalar channels follow the session storage. `color` and `coord`
    /// are always dense, `velocity` is always MAC.
    pub fn for_write(kind: ChannelKind, storage: StorageConfig) -> Result<Self> {
        let (representation, vector) = match kind.shape() {
            ChannelShape::Scalar => (storage.representation(), false),
            ChannelShape::Vector => (Representation::Dense, true),
            ChannelShape::Staggered => (Representation::Mac, true),
            ChannelShape::Pseudo => {
                return Err(Error::TypeUnsupported(format!("{} is not stored as a layer", kind)))
            }
        };
        Self::new(representation, vector, storage.precision).ok_or_else(|| {
            Error::TypeUnsupported(format!("{} with {} storage", kind, storage))
        })
    }
}

impl fmt::Display for FieldEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Session-wide layer storage: dense or sparse, at a given precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub sparse: bool,
    pub precision: Precision,
}

impl StorageConfig {
    pub const fn new(sparse: bool, precision: Precision) -> Self {
        Self { sparse, precision }
    }

    #[inline]
    pub const fn representation(&self) -> Representation {
        if self.sparse {
            Representation::Sparse
        } else {
            Representation::Dense
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(false, Precision::Float)
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = if self.sparse { "sparse" } else { "dense" };
        write!(f, "{} {}", layout, self.precision)
    }
}

/// Handling of voxel indices that fall outside the destination array
/// while reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundsCheck {
    /// Out-of-range index is an error.
    #[default]
    Strict,
    /// Out-of-range voxels are skipped.
    Fast,
}

/// Configuration of a channel session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub storage: StorageConfig,
    pub bounds: BoundsCheck,
    /// Zlib level for layer payloads (0-9, 0 stores them as-is).
    pub compression: i32,
    /// How cache files are accessed when opened for reading.
    pub read_mode: ReadMode,
}

impl SessionConfig {
    pub const fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            bounds: BoundsCheck::Strict,
            compression: 0,
            read_mode: ReadMode::Mapped,
        }
    }

    pub const fn dense_half() -> Self {
        Self::new(StorageConfig::new(false, Precision::Half))
    }

    pub const fn dense_float() -> Self {
        Self::new(StorageConfig::new(false, Precision::Float))
    }

    pub const fn sparse_half() -> Self {
        Self::new(StorageConfig::new(true, Precision::Half))
    }

    pub const fn sparse_float() -> Self {
        Self::new(StorageConfig::new(true, Precision::Float))
    }

    pub fn with_bounds(mut self, bounds: BoundsCheck) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_compression(mut self, level: i32) -> Self {
        self.compression = level.clamp(0, 9);
        self
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::dense_float()
    }
}
