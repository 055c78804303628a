//! Sparse field: voxels stored in blocks allocated on first write.
//!
//! Unallocated voxels read as the field's default value. Iteration is
//! exhaustive over the data window, so readers see the same voxel set for
//! dense and sparse layers.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::layer::read_voxels;
use super::{Coord, FieldClass, FieldMeta};
use crate::util::{Error, Resolution, Result, Voxel};

/// Block edge is `2^DEFAULT_BLOCK_ORDER` voxels.
pub const DEFAULT_BLOCK_ORDER: u8 = 3;

const MAX_BLOCK_ORDER: u8 = 8;

/// A field storing voxels in lazily allocated cubic blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseField<V: Voxel> {
    meta: FieldMeta,
    res: Resolution,
    block_order: u8,
    default_value: V,
    block_res: Resolution,
    blocks: Vec<Option<Box<[V]>>>,
}

impl<V: Voxel> SparseField<V> {
    pub fn new(meta: FieldMeta, res: Resolution) -> Self {
        Self::with_block_order(meta, res, DEFAULT_BLOCK_ORDER)
    }

    pub fn with_block_order(meta: FieldMeta, res: Resolution, block_order: u8) -> Self {
        let block_order = block_order.min(MAX_BLOCK_ORDER);
        let block_res = block_grid(res, block_order);
        Self {
            meta,
            res,
            block_order,
            default_value: V::default(),
            block_res,
            blocks: vec![None; block_res.voxel_count()],
        }
    }

    #[inline]
    pub fn block_order(&self) -> u8 {
        self.block_order
    }

    #[inline]
    fn block_size(&self) -> usize {
        1 << self.block_order
    }

    #[inline]
    pub fn default_value(&self) -> V {
        self.default_value
    }

    /// Number of allocated blocks.
    pub fn allocated_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    #[inline]
    fn locate(&self, i: usize, j: usize, k: usize) -> (usize, usize) {
        let o = self.block_order;
        let mask = self.block_size() - 1;
        let bs = self.block_size();
        let block = self.block_res.index(i >> o, j >> o, k >> o);
        let within = (i & mask) + bs * (j & mask) + bs * bs * (k & mask);
        (block, within)
    }

    pub fn value(&self, i: usize, j: usize, k: usize) -> V {
        let (block, within) = self.locate(i, j, k);
        match &self.blocks[block] {
            Some(data) => data[within],
            None => self.default_value,
        }
    }

    /// Mutable access to voxel `(i, j, k)`, allocating its block.
    /// Panics outside the data window.
    pub fn fast_lvalue(&mut self, i: usize, j: usize, k: usize) -> &mut V {
        assert!(i < self.res.x && j < self.res.y && k < self.res.z, "voxel outside data window");
        let (block, within) = self.locate(i, j, k);
        let cells = self.block_size().pow(3);
        let default_value = self.default_value;
        let data = self.blocks[block].get_or_insert_with(|| vec![default_value; cells].into_boxed_slice());
        &mut data[within]
    }

    /// Iterate over every voxel of the data window, x varying fastest.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, V)> + '_ {
        let res = self.res;
        (0..res.z).flat_map(move |k| {
            (0..res.y).flat_map(move |j| (0..res.x).map(move |i| ((i, j, k), self.value(i, j, k))))
        })
    }
}

fn block_grid(res: Resolution, order: u8) -> Resolution {
    let bs = 1usize << order;
    Resolution::new(res.x.div_ceil(bs), res.y.div_ceil(bs), res.z.div_ceil(bs))
}

impl<V: Voxel> FieldClass for SparseField<V> {
    const CLASS_NAME: &'static str = "SparseField";
    type Value = V;

    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn data_resolution(&self) -> Resolution {
        self.res
    }

    /// Layout: `[block_order: u8][default voxel][allocated: u32]` then per
    /// block `[block index: u32][block voxels]`.
    fn encode_data(&self, out: &mut Vec<u8>) {
        out.push(self.block_order);
        self.default_value.write_le(out);
        // Writes into a Vec<u8> cannot fail.
        let _ = out.write_u32::<LittleEndian>(self.allocated_blocks() as u32);
        for (idx, block) in self.blocks.iter().enumerate() {
            if let Some(data) = block {
                let _ = out.write_u32::<LittleEndian>(idx as u32);
                for v in data.iter() {
                    v.write_le(out);
                }
            }
        }
    }

    fn decode_data(meta: FieldMeta, res: Resolution, data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let eof = |cur: &Cursor<&[u8]>| Error::UnexpectedEof(cur.position());

        let order = cur.read_u8().map_err(|_| eof(&cur))?;
        if order > MAX_BLOCK_ORDER {
            return Err(Error::invalid(format!("sparse block order {} too large", order)));
        }
        let mut field = Self::with_block_order(meta, res, order);

        let pos = cur.position() as usize;
        let default_bytes = data.get(pos..pos + V::BYTES).ok_or(Error::UnexpectedEof(pos as u64))?;
        field.default_value = V::read_le(default_bytes);
        cur.set_position((pos + V::BYTES) as u64);

        let count = cur.read_u32::<LittleEndian>().map_err(|_| eof(&cur))? as usize;
        let cells = field.block_size().pow(3);
        for _ in 0..count {
            let idx = cur.read_u32::<LittleEndian>().map_err(|_| eof(&cur))? as usize;
            if idx >= field.blocks.len() {
                return Err(Error::invalid(format!("sparse block index {} out of range", idx)));
            }
            let start = cur.position() as usize;
            let end = cells
                .checked_mul(V::BYTES)
                .and_then(|n| start.checked_add(n))
                .ok_or(Error::UnexpectedEof(u64::MAX))?;
            let bytes = data.get(start..end).ok_or(Error::UnexpectedEof(end as u64))?;
            field.blocks[idx] = Some(read_voxels::<V>(bytes, cells).into_boxed_slice());
            cur.set_position(end as u64);
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_lazy_allocation() {
        let mut f = SparseField::<f32>::new(FieldMeta::default(), Resolution::new(20, 10, 10));
        assert_eq!(f.allocated_blocks(), 0);
        assert_eq!(f.value(19, 9, 9), 0.0);

        *f.fast_lvalue(19, 9, 9) = 2.5;
        assert_eq!(f.allocated_blocks(), 1);
        assert_eq!(f.value(19, 9, 9), 2.5);
        assert_eq!(f.value(18, 9, 9), 0.0);
    }

    #[test]
    fn test_sparse_iteration_is_exhaustive() {
        let mut f = SparseField::<f32>::new(FieldMeta::default(), Resolution::new(3, 3, 2));
        *f.fast_lvalue(1, 2, 1) = 1.0;
        let visited: Vec<_> = f.iter().collect();
        assert_eq!(visited.len(), 18);
        assert_eq!(visited.iter().filter(|(_, v)| *v == 1.0).count(), 1);
        assert_eq!(visited[0].0, (0, 0, 0));
        assert_eq!(visited[1].0, (1, 0, 0));
    }

    #[test]
    fn test_sparse_data_roundtrip() {
        let res = Resolution::new(9, 9, 9);
        let mut f = SparseField::<f32>::new(FieldMeta::default(), res);
        *f.fast_lvalue(0, 0, 0) = 1.0;
        *f.fast_lvalue(8, 8, 8) = 2.0;

        let mut bytes = Vec::new();
        f.encode_data(&mut bytes);
        let g = SparseField::<f32>::decode_data(FieldMeta::default(), res, &bytes).unwrap();
        assert_eq!(g.allocated_blocks(), 2);
        assert_eq!(g.value(8, 8, 8), 2.0);
        assert_eq!(g, f);
    }

    #[test]
    fn test_sparse_rejects_bad_block_index() {
        let res = Resolution::new(2, 2, 2);
        let mut bytes = vec![DEFAULT_BLOCK_ORDER];
        bytes.extend_from_slice(&0f32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&5u32.to_le_bytes());
        assert!(SparseField::<f32>::decode_data(FieldMeta::default(), res, &bytes).is_err());
    }

    #[test]
    fn test_sparse_truncated_block_rejected() {
        let res = Resolution::new(2, 2, 2);
        let mut bytes = vec![MAX_BLOCK_ORDER];
        bytes.extend_from_slice(&0f32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            SparseField::<f32>::decode_data(FieldMeta::default(), res, &bytes),
            Err(Error::UnexpectedEof(_))
        ));
    }
}
