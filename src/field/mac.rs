//! Staggered (MAC) vector field.
//!
//! Each component lives on its own sub-grid, one cell larger along the
//! component's axis: `u` is `(x+1, y, z)`, `v` is `(x, y+1, z)`, `w` is
//! `(x, y, z+1)`.

use super::{Coord, FieldClass, FieldMeta};
use crate::util::{Error, Resolution, Result, Sample, Voxel, V3};

/// One of the three staggered components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MacComponent {
    U,
    V,
    W,
}

impl MacComponent {
    pub const ALL: [MacComponent; 3] = [Self::U, Self::V, Self::W];

    /// Axis the component is staggered along.
    #[inline]
    pub const fn axis(self) -> usize {
        match self {
            Self::U => 0,
            Self::V => 1,
            Self::W => 2,
        }
    }
}

/// A staggered 3-vector field.
#[derive(Clone, Debug, PartialEq)]
pub struct MacField<T: Sample> {
    meta: FieldMeta,
    res: Resolution,
    comps: [Vec<T>; 3],
}

impl<T: Sample> MacField<T> {
    pub fn new(meta: FieldMeta, res: Resolution) -> Self {
        let comps = MacComponent::ALL.map(|c| vec![T::default(); res.grown(c.axis()).voxel_count()]);
        Self { meta, res, comps }
    }

    /// Sub-grid size of one component.
    #[inline]
    pub fn component_res(&self, c: MacComponent) -> Resolution {
        self.res.grown(c.axis())
    }

    /// Number of stored samples per component, in `u, v, w` order.
    pub fn component_size(&self) -> [usize; 3] {
        [self.comps[0].len(), self.comps[1].len(), self.comps[2].len()]
    }

    #[inline]
    pub fn comp(&self, c: MacComponent, x: usize, y: usize, z: usize) -> T {
        self.comps[c.axis()][self.component_res(c).index(x, y, z)]
    }

    /// Mutable access to a component sample. Panics outside the sub-grid.
    #[inline]
    pub fn comp_mut(&mut self, c: MacComponent, x: usize, y: usize, z: usize) -> &mut T {
        let idx = self.component_res(c).index(x, y, z);
        &mut self.comps[c.axis()][idx]
    }

    #[inline]
    pub fn u_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        self.comp_mut(MacComponent::U, x, y, z)
    }

    #[inline]
    pub fn v_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        self.comp_mut(MacComponent::V, x, y, z)
    }

    #[inline]
    pub fn w_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        self.comp_mut(MacComponent::W, x, y, z)
    }

    /// Iterate over one component's sub-grid, x varying fastest.
    pub fn iter_comp(&self, c: MacComponent) -> impl Iterator<Item = (Coord, T)> + '_ {
        let r = self.component_res(c);
        let (nx, ny) = (r.x.max(1), r.y.max(1));
        self.comps[c.axis()]
            .iter()
            .enumerate()
            .map(move |(idx, v)| ((idx % nx, (idx / nx) % ny, idx / (nx * ny)), *v))
    }
}

impl<T: Sample> FieldClass for MacField<T>
where
    V3<T>: Voxel,
{
    const CLASS_NAME: &'static str = "MACField";
    type Value = V3<T>;

    fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    fn data_resolution(&self) -> Resolution {
        self.res
    }

    fn encode_data(&self, out: &mut Vec<u8>) {
        out.reserve(self.comps.iter().map(Vec::len).sum::<usize>() * T::SIZE);
        for comp in &self.comps {
            for v in comp {
                Sample::write_le(*v, out);
            }
        }
    }

    fn decode_data(meta: FieldMeta, res: Resolution, data: &[u8]) -> Result<Self> {
        let sizes = MacComponent::ALL.map(|c| res.grown(c.axis()).voxel_count());
        let expected = sizes.iter().sum::<usize>() * T::SIZE;
        if data.len() != expected {
            return Err(Error::invalid(format!(
                "MAC field data is {} bytes, expected {}",
                data.len(),
                expected
            )));
        }

        let mut field = Self { meta, res, comps: [Vec::new(), Vec::new(), Vec::new()] };
        let mut offset = 0;
        for (comp, size) in field.comps.iter_mut().zip(sizes) {
            let bytes = &data[offset * T::SIZE..(offset + size) * T::SIZE];
            *comp = bytes.chunks_exact(T::SIZE).map(T::read_le).collect();
            offset += size;
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_component_sizes() {
        let f = MacField::<f32>::new(FieldMeta::default(), Resolution::new(2, 3, 4));
        assert_eq!(f.component_size(), [3 * 3 * 4, 2 * 4 * 4, 2 * 3 * 5]);
        assert_eq!(f.component_res(MacComponent::V), Resolution::new(2, 4, 4));
    }

    #[test]
    fn test_mac_boundary_faces_addressable() {
        let mut f = MacField::<f32>::new(FieldMeta::default(), Resolution::new(1, 1, 1));
        *f.u_mut(1, 0, 0) = 2.0;
        *f.v_mut(0, 1, 0) = 3.0;
        *f.w_mut(0, 0, 1) = 4.0;
        assert_eq!(f.comp(MacComponent::U, 1, 0, 0), 2.0);
        assert_eq!(f.comp(MacComponent::V, 0, 1, 0), 3.0);
        assert_eq!(f.comp(MacComponent::W, 0, 0, 1), 4.0);
    }

    #[test]
    fn test_mac_iter_comp() {
        let mut f = MacField::<f32>::new(FieldMeta::default(), Resolution::new(2, 1, 1));
        *f.u_mut(2, 0, 0) = 9.0;
        let u: Vec<_> = f.iter_comp(MacComponent::U).collect();
        assert_eq!(u.len(), 3);
        assert_eq!(u[2], ((2, 0, 0), 9.0));
        assert_eq!(f.iter_comp(MacComponent::W).count(), 4);
    }

    #[test]
    fn test_mac_data_roundtrip() {
        let res = Resolution::new(2, 2, 1);
        let mut f = MacField::<half::f16>::new(FieldMeta::default(), res);
        *f.v_mut(1, 2, 0) = half::f16::from_f32(0.5);

        let mut bytes = Vec::new();
        f.encode_data(&mut bytes);
        let g = MacField::<half::f16>::decode_data(FieldMeta::default(), res, &bytes).unwrap();
        assert_eq!(g, f);
        assert!(MacField::<half::f16>::decode_data(FieldMeta::default(), res, &bytes[2..]).is_err());
    }
}
