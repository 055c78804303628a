//! Conversion between flat host arrays and typed fields.
//!
//! Host arrays index voxel `(i, j, k)` at `i + nx*j + nx*ny*k`. Vector
//! channels interleave their three components per voxel on read and come
//! as three separate arrays on write. Velocity is staggered: each
//! component has one extra cell along its own axis, and the three
//! component arrays are concatenated `u, v, w` on read.

use half::f16;
use tracing::trace;

use super::channel::ChannelShape;
use super::encoding::{BoundsCheck, FieldEncoding};
use super::typed::TypedField;
use crate::field::{Coord, DenseField, FieldMeta, MacComponent, MacField, SparseField};
use crate::util::{Error, Resolution, Result, Sample, Voxel, V3};

/// Values at or below this are left at the sparse default.
pub const SPARSE_THRESHOLD: f32 = 1e-7;

/// Flat layout of a staggered field's components in a host array.
///
/// Both directions go through this one layout: the write path reads
/// component `c` of voxel `(x, y, z)` from `index(c, x, y, z)` of the
/// component's source array, and the read path scatters it to
/// `offset(c) + index(c, x, y, z)` of the concatenated destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaggeredLayout {
    res: Resolution,
}

impl StaggeredLayout {
    pub fn new(res: Resolution) -> Self {
        Self { res }
    }

    /// Sub-grid of a component: one extra cell along its own axis.
    #[inline]
    pub fn component_res(&self, c: MacComponent) -> Resolution {
        self.res.grown(c.axis())
    }

    #[inline]
    pub fn component_len(&self, c: MacComponent) -> usize {
        self.component_res(c).voxel_count()
    }

    pub fn component_lens(&self) -> [usize; 3] {
        MacComponent::ALL.map(|c| self.component_len(c))
    }

    /// Start of a component in the concatenated array.
    pub fn offset(&self, c: MacComponent) -> usize {
        MacComponent::ALL[..c.axis()]
            .iter()
            .map(|&p| self.component_len(p))
            .sum()
    }

    pub fn total_len(&self) -> usize {
        self.component_lens().iter().sum()
    }

    /// Index of `(x, y, z)` inside its component's sub-grid.
    #[inline]
    pub fn index(&self, c: MacComponent, x: usize, y: usize, z: usize) -> usize {
        self.component_res(c).index(x, y, z)
    }
}

/// Host arrays for one channel write.
#[derive(Clone, Copy, Debug)]
pub enum Source<'a> {
    Scalar(Option<&'a [f32]>),
    /// Three component arrays: `x, y, z` for vectors, `u, v, w` for
    /// staggered channels.
    Vector([Option<&'a [f32]>; 3]),
}

/// Number of values `read` produces for a channel of `shape` at `res`.
pub fn array_size(shape: ChannelShape, res: Resolution) -> usize {
    match shape {
        ChannelShape::Pseudo => 3,
        ChannelShape::Scalar => res.voxel_count(),
        ChannelShape::Vector => res.voxel_count() * 3,
        ChannelShape::Staggered => StaggeredLayout::new(res).total_len(),
    }
}

/// Build the field for one channel write.
pub fn encode(encoding: FieldEncoding, meta: FieldMeta, res: Resolution, source: Source<'_>) -> Result<TypedField> {
    let channel = meta.attribute.clone();

    Ok(match encoding {
        FieldEncoding::DenseScalarHalf => {
            TypedField::DenseScalarHalf(dense_scalar(meta, res, scalar_source(&channel, source, res)?))
        }
        FieldEncoding::DenseScalarFloat => {
            TypedField::DenseScalarFloat(dense_scalar(meta, res, scalar_source(&channel, source, res)?))
        }
        FieldEncoding::SparseScalarHalf => {
            TypedField::SparseScalarHalf(sparse_scalar(meta, res, scalar_source(&channel, source, res)?))
        }
        FieldEncoding::SparseScalarFloat => {
            TypedField::SparseScalarFloat(sparse_scalar(meta, res, scalar_source(&channel, source, res)?))
        }
        FieldEncoding::DenseVectorHalf => TypedField::DenseVectorHalf(dense_vector::<f16>(
            meta,
            res,
            vector_source(&channel, source, [res.voxel_count(); 3])?,
        )),
        FieldEncoding::DenseVectorFloat => TypedField::DenseVectorFloat(dense_vector::<f32>(
            meta,
            res,
            vector_source(&channel, source, [res.voxel_count(); 3])?,
        )),
        FieldEncoding::SparseVectorHalf => TypedField::SparseVectorHalf(sparse_vector::<f16>(
            meta,
            res,
            vector_source(&channel, source, [res.voxel_count(); 3])?,
        )),
        FieldEncoding::SparseVectorFloat => TypedField::SparseVectorFloat(sparse_vector::<f32>(
            meta,
            res,
            vector_source(&channel, source, [res.voxel_count(); 3])?,
        )),
        FieldEncoding::MacHalf => TypedField::MacHalf(mac::<f16>(
            meta,
            res,
            vector_source(&channel, source, StaggeredLayout::new(res).component_lens())?,
        )),
        FieldEncoding::MacFloat => TypedField::MacFloat(mac::<f32>(
            meta,
            res,
            vector_source(&channel, source, StaggeredLayout::new(res).component_lens())?,
        )),
    })
}

fn check_len(channel: &str, data: &[f32], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(Error::ArrayTooShort {
            channel: channel.to_string(),
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn scalar_source<'a>(channel: &str, source: Source<'a>, res: Resolution) -> Result<&'a [f32]> {
    match source {
        Source::Scalar(Some(data)) => {
            check_len(channel, data, res.voxel_count())?;
            Ok(data)
        }
        Source::Scalar(None) => Err(Error::NullData(channel.to_string())),
        Source::Vector(_) => Err(Error::TypeUnsupported(format!(
            "{}: vector data for a scalar field",
            channel
        ))),
    }
}

fn vector_source<'a>(channel: &str, source: Source<'a>, lens: [usize; 3]) -> Result<[&'a [f32]; 3]> {
    match source {
        Source::Vector([Some(a), Some(b), Some(c)]) => {
            for (data, expected) in [a, b, c].into_iter().zip(lens) {
                check_len(channel, data, expected)?;
            }
            Ok([a, b, c])
        }
        Source::Vector(_) => Err(Error::NullData(channel.to_string())),
        Source::Scalar(_) => Err(Error::TypeUnsupported(format!(
            "{}: scalar data for a vector field",
            channel
        ))),
    }
}

fn dense_scalar<T: Sample + Voxel>(meta: FieldMeta, res: Resolution, src: &[f32]) -> DenseField<T> {
    let mut field = DenseField::new(meta, res);
    for k in 0..res.z {
        for j in 0..res.y {
            for i in 0..res.x {
                *field.fast_lvalue(i, j, k) = T::from_f32(src[res.index(i, j, k)]);
            }
        }
    }
    field
}

fn sparse_scalar<T: Sample + Voxel>(meta: FieldMeta, res: Resolution, src: &[f32]) -> SparseField<T> {
    let mut field = SparseField::new(meta, res);
    for k in 0..res.z {
        for j in 0..res.y {
            for i in 0..res.x {
                let v = src[res.index(i, j, k)];
                if v > SPARSE_THRESHOLD {
                    *field.fast_lvalue(i, j, k) = T::from_f32(v);
                }
            }
        }
    }
    field
}

#[inline]
fn gather<T: Sample>(src: [&[f32]; 3], idx: usize) -> V3<T> {
    V3::new(
        T::from_f32(src[0][idx]),
        T::from_f32(src[1][idx]),
        T::from_f32(src[2][idx]),
    )
}

fn dense_vector<T: Sample>(meta: FieldMeta, res: Resolution, src: [&[f32]; 3]) -> DenseField<V3<T>>
where
    V3<T>: Voxel,
{
    let mut field = DenseField::new(meta, res);
    for k in 0..res.z {
        for j in 0..res.y {
            for i in 0..res.x {
                *field.fast_lvalue(i, j, k) = gather(src, res.index(i, j, k));
            }
        }
    }
    field
}

/// Sparse vectors are thresholded on their squared length.
fn sparse_vector<T: Sample>(meta: FieldMeta, res: Resolution, src: [&[f32]; 3]) -> SparseField<V3<T>>
where
    V3<T>: Voxel,
{
    let mut field = SparseField::new(meta, res);
    for k in 0..res.z {
        for j in 0..res.y {
            for i in 0..res.x {
                let idx = res.index(i, j, k);
                let norm2: f32 = src.iter().map(|c| c[idx] * c[idx]).sum();
                if norm2 > SPARSE_THRESHOLD {
                    *field.fast_lvalue(i, j, k) = gather(src, idx);
                }
            }
        }
    }
    field
}

fn mac<T: Sample>(meta: FieldMeta, res: Resolution, src: [&[f32]; 3]) -> MacField<T> {
    use MacComponent::{U, V, W};

    let layout = StaggeredLayout::new(res);
    let mut field = MacField::new(meta, res);
    let [vx, vy, vz] = src;

    for x in 0..res.x {
        for y in 0..res.y {
            for z in 0..res.z {
                *field.u_mut(x, y, z) = T::from_f32(vx[layout.index(U, x, y, z)]);
                *field.v_mut(x, y, z) = T::from_f32(vy[layout.index(V, x, y, z)]);
                *field.w_mut(x, y, z) = T::from_f32(vz[layout.index(W, x, y, z)]);
            }
        }
    }

    // The interior pass stops one short of each component's own extent.
    for y in 0..res.y {
        for z in 0..res.z {
            *field.u_mut(res.x, y, z) = T::from_f32(vx[layout.index(U, res.x, y, z)]);
        }
    }
    for x in 0..res.x {
        for z in 0..res.z {
            *field.v_mut(x, res.y, z) = T::from_f32(vy[layout.index(V, x, res.y, z)]);
        }
    }
    for x in 0..res.x {
        for y in 0..res.y {
            *field.w_mut(x, y, res.z) = T::from_f32(vz[layout.index(W, x, y, res.z)]);
        }
    }
    field
}

/// Writes decoded values into the destination array.
struct Scatter<'a, D> {
    channel: &'a str,
    dst: &'a mut [D],
    bounds: BoundsCheck,
}

impl<D: Sample> Scatter<'_, D> {
    #[inline]
    fn put(&mut self, idx: usize, value: f64) -> Result<()> {
        match self.dst.get_mut(idx) {
            Some(slot) => {
                *slot = D::from_f64(value);
                Ok(())
            }
            None => match self.bounds {
                BoundsCheck::Strict => Err(Error::IndexOutOfBounds {
                    channel: self.channel.to_string(),
                    index: idx,
                    len: self.dst.len(),
                }),
                BoundsCheck::Fast => {
                    trace!(channel = self.channel, idx, len = self.dst.len(), "skipped voxel");
                    Ok(())
                }
            },
        }
    }

    fn scalars<T: Sample>(&mut self, res: Resolution, voxels: impl Iterator<Item = (Coord, T)>) -> Result<()> {
        for ((i, j, k), v) in voxels {
            self.put(res.index(i, j, k), v.to_f64())?;
        }
        Ok(())
    }

    fn vectors<T: Sample>(
        &mut self,
        res: Resolution,
        voxels: impl Iterator<Item = (Coord, V3<T>)>,
    ) -> Result<()> {
        for ((i, j, k), v) in voxels {
            let idx = 3 * res.index(i, j, k);
            self.put(idx, v.x.to_f64())?;
            self.put(idx + 1, v.y.to_f64())?;
            self.put(idx + 2, v.z.to_f64())?;
        }
        Ok(())
    }

    fn staggered<T: Sample>(&mut self, res: Resolution, field: &MacField<T>) -> Result<()> {
        let layout = StaggeredLayout::new(res);
        let expected = layout.component_lens();
        let stored = field.component_size();
        if stored != expected {
            return Err(Error::MacLayoutMismatch {
                channel: self.channel.to_string(),
                stored,
                expected,
            });
        }

        for c in MacComponent::ALL {
            let offset = layout.offset(c);
            for ((x, y, z), v) in field.iter_comp(c) {
                self.put(offset + layout.index(c, x, y, z), v.to_f64())?;
            }
        }
        Ok(())
    }
}

/// Scatter a field into a flat destination array.
///
/// Voxel indices come from the field's own data resolution. Indices past
/// the end of `dst` are an error under [`BoundsCheck::Strict`] and are
/// skipped under [`BoundsCheck::Fast`].
pub fn decode<D: Sample>(field: &TypedField, dst: &mut [D], bounds: BoundsCheck) -> Result<()> {
    let res = field.data_resolution();
    let channel = field.meta().attribute.clone();
    let mut out = Scatter {
        channel: &channel,
        dst,
        bounds,
    };

    match field {
        TypedField::DenseScalarHalf(f) => out.scalars(res, f.iter()),
        TypedField::DenseScalarFloat(f) => out.scalars(res, f.iter()),
        TypedField::SparseScalarHalf(f) => out.scalars(res, f.iter()),
        TypedField::SparseScalarFloat(f) => out.scalars(res, f.iter()),
        TypedField::DenseVectorHalf(f) => out.vectors(res, f.iter()),
        TypedField::DenseVectorFloat(f) => out.vectors(res, f.iter()),
        TypedField::SparseVectorHalf(f) => out.vectors(res, f.iter()),
        TypedField::SparseVectorFloat(f) => out.vectors(res, f.iter()),
        TypedField::MacHalf(f) => out.staggered(res, f),
        TypedField::MacFloat(f) => out.staggered(res, f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::DMat4;

    fn meta(attr: &str) -> FieldMeta {
        FieldMeta::new("fluid1", attr, DMat4::IDENTITY)
    }

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 0.25 - 1.0).collect()
    }

    #[test]
    fn test_staggered_layout() {
        let layout = StaggeredLayout::new(Resolution::new(2, 3, 4));
        assert_eq!(layout.component_lens(), [3 * 3 * 4, 2 * 4 * 4, 2 * 3 * 5]);
        assert_eq!(layout.offset(MacComponent::U), 0);
        assert_eq!(layout.offset(MacComponent::V), 36);
        assert_eq!(layout.offset(MacComponent::W), 36 + 32);
        assert_eq!(layout.total_len(), 36 + 32 + 30);
        // u: x + (nx+1)*y + (nx+1)*ny*z
        assert_eq!(layout.index(MacComponent::U, 1, 2, 3), 1 + 3 * 2 + 3 * 3 * 3);
        // v: x + nx*y + nx*(ny+1)*z
        assert_eq!(layout.index(MacComponent::V, 1, 2, 3), 1 + 2 * 2 + 2 * 4 * 3);
        // w: x + nx*y + nx*ny*z
        assert_eq!(layout.index(MacComponent::W, 1, 2, 4), 1 + 2 * 2 + 2 * 3 * 4);
    }

    #[test]
    fn test_array_sizes() {
        let res = Resolution::new(3, 4, 5);
        assert_eq!(array_size(ChannelShape::Pseudo, res), 3);
        assert_eq!(array_size(ChannelShape::Scalar, res), 60);
        assert_eq!(array_size(ChannelShape::Vector, res), 180);
        assert_eq!(
            array_size(ChannelShape::Staggered, res),
            4 * 4 * 5 + 3 * 5 * 5 + 3 * 4 * 6
        );
        assert_eq!(array_size(ChannelShape::Staggered, Resolution::new(1, 1, 1)), 6);
    }

    #[test]
    fn test_dense_scalar_exact() {
        let res = Resolution::new(3, 2, 4);
        let src = ramp(res.voxel_count());
        let field = encode(FieldEncoding::DenseScalarFloat, meta("density"), res, Source::Scalar(Some(&src))).unwrap();
        let mut out = vec![0f32; src.len()];
        decode(&field, &mut out, BoundsCheck::Strict).unwrap();
        assert_eq!(out, src);

        let mut out64 = vec![0f64; src.len()];
        decode(&field, &mut out64, BoundsCheck::Strict).unwrap();
        assert!(out64.iter().zip(&src).all(|(a, b)| *a == *b as f64));
    }

    #[test]
    fn test_half_is_stable() {
        let res = Resolution::new(4, 3, 2);
        let src: Vec<f32> = (0..res.voxel_count()).map(|i| (i as f32).sqrt() * 0.1).collect();
        let first = encode(FieldEncoding::DenseScalarHalf, meta("pressure"), res, Source::Scalar(Some(&src))).unwrap();
        let mut decoded = vec![0f32; src.len()];
        decode(&first, &mut decoded, BoundsCheck::Strict).unwrap();
        for (d, s) in decoded.iter().zip(&src) {
            assert!((d - s).abs() <= s.abs() * 1e-3 + 1e-6, "{} vs {}", d, s);
        }

        let second = encode(FieldEncoding::DenseScalarHalf, meta("pressure"), res, Source::Scalar(Some(&decoded))).unwrap();
        assert_eq!(first.to_layer().to_bytes(), second.to_layer().to_bytes());
    }

    #[test]
    fn test_sparse_threshold() {
        let res = Resolution::new(2, 2, 2);
        let src = [0.5, 1e-7, 1e-8, 0.0, -3.0, 2e-7, 1.0, 1e-6];
        for encoding in [FieldEncoding::SparseScalarFloat, FieldEncoding::SparseScalarHalf] {
            let field = encode(encoding, meta("density"), res, Source::Scalar(Some(&src))).unwrap();
            let mut out = vec![9f32; 8];
            decode(&field, &mut out, BoundsCheck::Strict).unwrap();
            for (o, s) in out.iter().zip(src) {
                if s > SPARSE_THRESHOLD {
                    assert!(*o != 0.0);
                    assert!((o - s).abs() <= s * 1e-3 + 1e-7, "{} vs {}", o, s);
                } else {
                    assert_eq!(*o, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_vector_interleaved() {
        let res = Resolution::new(2, 1, 2);
        let n = res.voxel_count();
        let (a, b, c) = (ramp(n), vec![2.0; n], vec![-1.0; n]);
        let field = encode(
            FieldEncoding::DenseVectorFloat,
            meta("color"),
            res,
            Source::Vector([Some(&a), Some(&b), Some(&c)]),
        )
        .unwrap();
        let mut out = vec![0f32; 3 * n];
        decode(&field, &mut out, BoundsCheck::Strict).unwrap();
        for i in 0..n {
            assert_eq!(out[3 * i..3 * i + 3], [a[i], 2.0, -1.0]);
        }
    }

    #[test]
    fn test_sparse_vector_uses_squared_norm() {
        let res = Resolution::new(2, 1, 1);
        let (a, b, c) = (vec![1e-4, 0.5], vec![0.0, 0.0], vec![0.0, 0.0]);
        let field = encode(
            FieldEncoding::SparseVectorFloat,
            meta("coord"),
            res,
            Source::Vector([Some(&a), Some(&b), Some(&c)]),
        )
        .unwrap();
        let mut out = vec![1f32; 6];
        decode(&field, &mut out, BoundsCheck::Strict).unwrap();
        assert_eq!(out, [0.0, 0.0, 0.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_mac_roundtrip_through_one_layout() {
        let res = Resolution::new(3, 2, 2);
        let layout = StaggeredLayout::new(res);
        let [lu, lv, lw] = layout.component_lens();
        let (u, v, w) = (ramp(lu), ramp(lv), ramp(lw));
        let field = encode(
            FieldEncoding::MacFloat,
            meta("velocity"),
            res,
            Source::Vector([Some(&u), Some(&v), Some(&w)]),
        )
        .unwrap();
        let TypedField::MacFloat(mac) = &field else {
            panic!("expected a MAC field");
        };
        // Boundary slabs come from the tail of each source array.
        assert_eq!(mac.comp(MacComponent::U, 3, 1, 1), u[layout.index(MacComponent::U, 3, 1, 1)]);
        assert_eq!(mac.comp(MacComponent::V, 2, 2, 1), v[layout.index(MacComponent::V, 2, 2, 1)]);
        assert_eq!(mac.comp(MacComponent::W, 1, 1, 2), w[layout.index(MacComponent::W, 1, 1, 2)]);

        let mut out = vec![0f32; layout.total_len()];
        decode(&field, &mut out, BoundsCheck::Strict).unwrap();
        assert_eq!(out[..lu], u[..]);
        assert_eq!(out[lu..lu + lv], v[..]);
        assert_eq!(out[lu + lv..], w[..]);
    }

    #[test]
    fn test_write_errors() {
        let res = Resolution::new(2, 2, 2);
        let short = vec![1.0; 7];
        assert!(matches!(
            encode(FieldEncoding::DenseScalarFloat, meta("density"), res, Source::Scalar(None)),
            Err(Error::NullData(_))
        ));
        assert!(matches!(
            encode(FieldEncoding::DenseScalarFloat, meta("density"), res, Source::Scalar(Some(&short))),
            Err(Error::ArrayTooShort { expected: 8, actual: 7, .. })
        ));

        let full = vec![1.0; 12];
        // Every component of a 2x2x2 MAC field needs 12 samples.
        let eight = vec![1.0; 8];
        assert!(matches!(
            encode(
                FieldEncoding::MacHalf,
                meta("velocity"),
                res,
                Source::Vector([Some(&eight), Some(&eight), Some(&full)]),
            ),
            Err(Error::ArrayTooShort { expected: 12, actual: 8, .. })
        ));
        assert!(matches!(
            encode(
                FieldEncoding::MacHalf,
                meta("velocity"),
                res,
                Source::Vector([Some(&full), None, Some(&full)]),
            ),
            Err(Error::NullData(_))
        ));
    }

    #[test]
    fn test_bounds_policy() {
        let res = Resolution::new(2, 2, 1);
        let src = vec![1.0; 4];
        let field = encode(FieldEncoding::DenseScalarFloat, meta("density"), res, Source::Scalar(Some(&src))).unwrap();

        let mut short = vec![0f32; 3];
        assert!(matches!(
            decode(&field, &mut short, BoundsCheck::Strict),
            Err(Error::IndexOutOfBounds { index: 3, len: 3, .. })
        ));

        let mut short = vec![0f32; 3];
        decode(&field, &mut short, BoundsCheck::Fast).unwrap();
        assert_eq!(short, [1.0; 3]);
    }
}
