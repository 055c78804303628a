//! Sample precisions - the floating point storage types of a field layer.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

/// Floating point precision of the samples stored in a layer.
///
/// Layers hold half, single or double precision samples. The cache writer
/// only emits half and float; double is recognized when reading so that
/// grid resolution can be recovered from any layer in the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Precision {
    /// 16-bit floating point (IEEE 754 half precision)
    Half = 0,
    /// 32-bit floating point (IEEE 754 single precision)
    #[default]
    Float = 1,
    /// 64-bit floating point (IEEE 754 double precision)
    Double = 2,
}

impl Precision {
    /// All precisions, in probe order.
    pub const ALL: [Precision; 3] = [Self::Half, Self::Float, Self::Double];

    /// Returns the size in bytes of a single sample.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Half => 2,
            Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Returns the name of this precision.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Convert from the on-disk code.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Half),
            1 => Some(Self::Float),
            2 => Some(Self::Double),
            _ => None,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A floating point sample type that can be stored in a field.
///
/// Conversions go through `f64` on the read side so that a float layer
/// decoded into a double array (or back) loses nothing.
pub trait Sample: Pod + Zeroable + Copy + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// The corresponding precision tag.
    const PRECISION: Precision;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();

    fn from_f32(v: f32) -> Self;
    fn from_f64(v: f64) -> Self;
    fn to_f32(self) -> f32;
    fn to_f64(self) -> f64;

    /// Append the little-endian encoding of this sample.
    fn write_le(self, buf: &mut Vec<u8>);

    /// Decode from the first `SIZE` bytes of `bytes` (little-endian).
    fn read_le(bytes: &[u8]) -> Self;
}

impl Sample for f16 {
    const PRECISION: Precision = Precision::Half;

    #[inline]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v)
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }
    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
    #[inline]
    fn write_le(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }
    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        f16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Sample for f32 {
    const PRECISION: Precision = Precision::Float;

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn write_le(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }
    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl Sample for f64 {
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn from_f32(v: f32) -> Self {
        v as f64
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn write_le(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }
    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut b = [0u8; 8];
        b.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(b)
    }
}
