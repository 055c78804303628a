//! Dense field: every voxel stored explicitly.

use super::layer::{expect_voxels, read_voxels};
use super::{Coord, FieldClass, FieldMeta};
use crate::util::{Resolution, Result, Voxel};

/// A field storing every voxel, x varying fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseField<V: Voxel> {
    meta: FieldMeta,
    res: Resolution,
    data: Vec<V>,
}

impl<V: Voxel> DenseField<V> {
    /// Create a field of `res` voxels, all set to the default value.
    pub fn new(meta: FieldMeta, res: Resolution) -> Self {
        Self {
            meta,
            res,
            data: vec![V::default(); res.voxel_count()],
        }
    }

    #[inline]
    pub fn value(&self, i: usize, j: usize, k: usize) -> V {
        self.data[self.res.index(i, j, k)]
    }

    /// Mutable access to voxel `(i, j, k)`. Panics outside the data window.
    #[inline]
    pub fn fast_lvalue(&mut self, i: usize, j: usize, k: usize) -> &mut V {
        let idx = self.res.index(i, j, k);
        &mut self.data[idx]
    }

    /// All voxels in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[V] {
        &self.data
    }

    /// Iterate over every voxel with its coordinate.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, V)> + '_ {
        let (nx, ny) = (self.res.x.max(1), self.res.y.max(1));
        self.data.iter().enumerate().map(move |(idx, v)| {
            ((idx % nx, (idx / nx) % ny, idx / (nx * ny)), *v)
        })
    }

    pub fn meta_mut(&mut self) -> &mut FieldMeta {
        &mut self.meta
    }
}

impl<V: Voxel> FieldClass for DenseField<V> {
    const CLASS_NAME: &'static str = "DenseField";
    type Value = V;

    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn data_resolution(&self) -> Resolution {
        self.res
    }

    fn encode_data(&self, out: &mut Vec<u8>) {
        out.reserve(self.data.len() * V::BYTES);
        for v in &self.data {
            v.write_le(out);
        }
    }

    fn decode_data(meta: FieldMeta, res: Resolution, data: &[u8]) -> Result<Self> {
        let count = res.voxel_count();
        expect_voxels::<V>(data, count, "dense field")?;
        Ok(Self {
            meta,
            res,
            data: read_voxels(data, count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::V3;

    #[test]
    fn test_dense_set_and_iterate() {
        let mut f = DenseField::<f32>::new(FieldMeta::default(), Resolution::new(3, 2, 2));
        *f.fast_lvalue(2, 1, 1) = 7.0;
        *f.fast_lvalue(1, 0, 0) = 3.0;

        let visited: Vec<_> = f.iter().collect();
        assert_eq!(visited.len(), 12);
        assert_eq!(visited[1], ((1, 0, 0), 3.0));
        assert_eq!(visited[11], ((2, 1, 1), 7.0));
    }

    #[test]
    fn test_dense_vector_roundtrip() {
        let mut f = DenseField::<V3<f32>>::new(FieldMeta::default(), Resolution::new(2, 1, 1));
        *f.fast_lvalue(1, 0, 0) = V3::new(1.0, 2.0, 3.0);

        let mut bytes = Vec::new();
        f.encode_data(&mut bytes);
        assert_eq!(bytes.len(), 2 * 12);

        let g = DenseField::<V3<f32>>::decode_data(FieldMeta::default(), Resolution::new(2, 1, 1), &bytes).unwrap();
        assert_eq!(g, f);
    }

    #[test]
    fn test_dense_empty_resolution() {
        let f = DenseField::<f32>::new(FieldMeta::default(), Resolution::new(0, 4, 4));
        assert_eq!(f.iter().count(), 0);
    }
}
