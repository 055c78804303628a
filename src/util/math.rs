//! Math type re-exports and cache-specific math utilities.
//!
//! Matrices follow glam's column-vector convention. A host that stores
//! 4×4 matrices row-major and multiplies row vectors (translation in the
//! last row) has the same 16 numbers in the same memory order, so
//! [`from_row_major`] / [`to_row_major`] are plain reinterpretations.

pub use glam::{DMat4, DVec3};

use std::fmt;
use std::ops::Index;

/// Reinterpret a row-major, row-vector 4×4 matrix as a glam matrix.
#[inline]
pub fn from_row_major(m: [[f64; 4]; 4]) -> DMat4 {
    DMat4::from_cols_array_2d(&m)
}

/// Inverse of [`from_row_major`].
#[inline]
pub fn to_row_major(m: &DMat4) -> [[f64; 4]; 4] {
    m.to_cols_array_2d()
}

/// Generic 3-component vector used for vector voxels of any precision.
#[derive(Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct V3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Copy> V3<T> {
    #[inline]
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn splat(v: T) -> Self {
        Self { x: v, y: v, z: v }
    }

    #[inline]
    pub fn to_array(self) -> [T; 3] {
        [self.x, self.y, self.z]
    }
}

impl<T: fmt::Debug> fmt::Debug for V3<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V3({:?}, {:?}, {:?})", self.x, self.y, self.z)
    }
}

/// Voxel grid size: cell counts along x, y and z.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Resolution {
    pub const ZERO: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Total number of voxels.
    #[inline]
    pub const fn voxel_count(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Flat index of voxel `(i, j, k)`, x varying fastest.
    #[inline]
    pub const fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.x * j + self.x * self.y * k
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Grid grown by one cell along `axis` (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn grown(self, axis: usize) -> Self {
        match axis {
            0 => Self::new(self.x + 1, self.y, self.z),
            1 => Self::new(self.x, self.y + 1, self.z),
            _ => Self::new(self.x, self.y, self.z + 1),
        }
    }

    #[inline]
    pub fn to_array(self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }
}

impl Index<usize> for Resolution {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl From<[usize; 3]> for Resolution {
    fn from(v: [usize; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolution({} x {} x {})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_index() {
        let r = Resolution::new(4, 3, 2);
        assert_eq!(r.voxel_count(), 24);
        assert_eq!(r.index(0, 0, 0), 0);
        assert_eq!(r.index(1, 0, 0), 1);
        assert_eq!(r.index(0, 1, 0), 4);
        assert_eq!(r.index(0, 0, 1), 12);
        assert_eq!(r.index(3, 2, 1), 23);
    }

    #[test]
    fn test_resolution_grown_and_max() {
        let r = Resolution::new(2, 3, 4);
        assert_eq!(r.grown(0), Resolution::new(3, 3, 4));
        assert_eq!(r.grown(1), Resolution::new(2, 4, 4));
        assert_eq!(r.grown(2), Resolution::new(2, 3, 5));
        assert_eq!(r.max(Resolution::new(5, 1, 4)), Resolution::new(5, 3, 4));
        assert_eq!(r[1], 3);
    }

    #[test]
    fn test_row_major_roundtrip() {
        let rows = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [5.0, 6.0, 7.0, 1.0],
        ];
        let m = from_row_major(rows);
        // Translation row of a row-vector matrix is glam's translation column.
        assert_eq!(m.transform_point3(DVec3::ZERO), DVec3::new(5.0, 6.0, 7.0));
        assert_eq!(to_row_major(&m), rows);
    }
}
