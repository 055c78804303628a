//! DataType - combines a sample precision with an extent (scalar or 3-vector).

use super::{Precision, Sample, V3};
use half::f16;
use std::fmt;

/// DataType describes how one voxel of a layer is stored.
///
/// A scalar layer has extent 1, a vector layer extent 3.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// Sample precision
    pub precision: Precision,
    /// Number of samples per voxel (1 for scalar, 3 for vector)
    pub extent: u8,
}

impl DataType {
    /// Create a new DataType with given precision and extent.
    #[inline]
    pub const fn new(precision: Precision, extent: u8) -> Self {
        Self { precision, extent }
    }

    /// Create a scalar DataType (extent = 1).
    #[inline]
    pub const fn scalar(precision: Precision) -> Self {
        Self { precision, extent: 1 }
    }

    /// Create a 3-vector DataType (extent = 3).
    #[inline]
    pub const fn vector(precision: Precision) -> Self {
        Self { precision, extent: 3 }
    }

    /// Returns the total size in bytes for one voxel.
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.precision.num_bytes() * self.extent as usize
    }

    #[inline]
    pub const fn is_scalar(&self) -> bool {
        self.extent == 1
    }

    #[inline]
    pub const fn is_vector(&self) -> bool {
        self.extent == 3
    }

    pub const HALF: Self = Self::scalar(Precision::Half);
    pub const FLOAT: Self = Self::scalar(Precision::Float);
    pub const DOUBLE: Self = Self::scalar(Precision::Double);
    pub const V3H: Self = Self::vector(Precision::Half);
    pub const V3F: Self = Self::vector(Precision::Float);
    pub const V3D: Self = Self::vector(Precision::Double);
}

impl Default for DataType {
    fn default() -> Self {
        Self::FLOAT
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({}[{}])", self.precision.name(), self.extent)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extent == 1 {
            write!(f, "{}", self.precision.name())
        } else {
            write!(f, "{}[{}]", self.precision.name(), self.extent)
        }
    }
}

/// Element type of a field: a scalar sample or a 3-vector of samples.
pub trait Voxel: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The underlying sample type.
    type Scalar: Sample;

    /// On-disk data type tag.
    const DATA_TYPE: DataType;

    /// Encoded size of one voxel in bytes.
    const BYTES: usize = Self::DATA_TYPE.num_bytes();

    fn write_le(&self, buf: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar_voxel {
    ($($t:ty),*) => {$(
        impl Voxel for $t {
            type Scalar = $t;
            const DATA_TYPE: DataType = DataType::scalar(<$t as Sample>::PRECISION);

            #[inline]
            fn write_le(&self, buf: &mut Vec<u8>) {
                Sample::write_le(*self, buf);
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                <$t as Sample>::read_le(bytes)
            }
        }
    )*};
}

macro_rules! impl_vector_voxel {
    ($($t:ty),*) => {$(
        impl Voxel for V3<$t> {
            type Scalar = $t;
            const DATA_TYPE: DataType = DataType::vector(<$t as Sample>::PRECISION);

            #[inline]
            fn write_le(&self, buf: &mut Vec<u8>) {
                Sample::write_le(self.x, buf);
                Sample::write_le(self.y, buf);
                Sample::write_le(self.z, buf);
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let n = <$t as Sample>::SIZE;
                V3::new(
                    <$t as Sample>::read_le(bytes),
                    <$t as Sample>::read_le(&bytes[n..]),
                    <$t as Sample>::read_le(&bytes[2 * n..]),
                )
            }
        }
    )*};
}

impl_scalar_voxel!(f16, f32, f64);
impl_vector_voxel!(f16, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::HALF.num_bytes(), 2);
        assert_eq!(DataType::V3F.num_bytes(), 12);
        assert_eq!(DataType::V3D.num_bytes(), 24);
        assert!(DataType::V3H.is_vector());
        assert!(DataType::FLOAT.is_scalar());
    }

    #[test]
    fn test_voxel_tags() {
        assert_eq!(<f16 as Voxel>::DATA_TYPE, DataType::HALF);
        assert_eq!(<V3<f32> as Voxel>::DATA_TYPE, DataType::V3F);
        assert_eq!(<V3<f16> as Voxel>::BYTES, 6);
    }

    #[test]
    fn test_vector_voxel_bytes() {
        let v = V3::new(1.0f32, -2.0, 3.5);
        let mut buf = Vec::new();
        v.write_le(&mut buf);
        assert_eq!(buf.len(), 12);
        assert_eq!(<V3<f32> as Voxel>::read_le(&buf), v);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::V3H.to_string(), "half[3]");
        assert_eq!(DataType::FLOAT.to_string(), "float");
    }
}
