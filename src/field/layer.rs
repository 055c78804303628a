//! Type-erased layers and the checked downcast to concrete field classes.

use std::io::Cursor;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::FieldMeta;
use crate::core::{read_str, write_str};
use crate::util::{from_row_major, to_row_major, DataType, Error, Precision, Resolution, Result, Voxel};

/// A concrete field representation that can be stored as a layer.
pub trait FieldClass: Sized {
    /// Class tag written with every layer of this representation.
    const CLASS_NAME: &'static str;

    /// Voxel element type.
    type Value: Voxel;

    fn meta(&self) -> &FieldMeta;

    /// Voxel grid size of the field.
    fn data_resolution(&self) -> Resolution;

    /// Append the class-specific voxel data.
    fn encode_data(&self, out: &mut Vec<u8>);

    /// Rebuild the field from its voxel data.
    fn decode_data(meta: FieldMeta, res: Resolution, data: &[u8]) -> Result<Self>;
}

/// Header of a stored layer: identity, class and geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerHeader {
    pub meta: FieldMeta,
    pub class_name: String,
    pub data_type: DataType,
    pub resolution: Resolution,
}

/// A layer read from (or about to be written to) a store, not yet bound
/// to a concrete field class.
#[derive(Clone, Debug)]
pub struct Layer {
    header: LayerHeader,
    data: Arc<[u8]>,
}

impl Layer {
    /// Wrap a header and its class-specific voxel data.
    pub fn from_parts(header: LayerHeader, data: impl Into<Arc<[u8]>>) -> Self {
        Self { header, data: data.into() }
    }

    /// Erase a concrete field.
    pub fn from_field<F: FieldClass>(field: &F) -> Self {
        let mut data = Vec::new();
        field.encode_data(&mut data);
        let header = LayerHeader {
            meta: field.meta().clone(),
            class_name: F::CLASS_NAME.to_string(),
            data_type: F::Value::DATA_TYPE,
            resolution: field.data_resolution(),
        };
        Self::from_parts(header, data)
    }

    #[inline]
    pub fn header(&self) -> &LayerHeader {
        &self.header
    }

    /// Partition (owner) name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.header.meta.name
    }

    /// Layer lookup name (channel).
    #[inline]
    pub fn attribute(&self) -> &str {
        &self.header.meta.attribute
    }

    #[inline]
    pub fn class_name(&self) -> &str {
        &self.header.class_name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    #[inline]
    pub fn data_resolution(&self) -> Resolution {
        self.header.resolution
    }

    /// True when this layer was written by representation `F`.
    pub fn is<F: FieldClass>(&self) -> bool {
        self.header.class_name == F::CLASS_NAME && self.header.data_type == F::Value::DATA_TYPE
    }

    /// Downcast to a concrete field class.
    ///
    /// Returns `Ok(None)` when the layer is of another class or data type,
    /// and an error when the class matches but the voxel data is corrupt.
    pub fn downcast<F: FieldClass>(&self) -> Result<Option<F>> {
        if !self.is::<F>() {
            return Ok(None);
        }
        F::decode_data(self.header.meta.clone(), self.header.resolution, &self.data).map(Some)
    }

    /// Serialize header and voxel data into one payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 256);
        // Writes into a Vec<u8> cannot fail.
        let _ = self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        self.header.write_into(out)?;
        out.write_u64::<LittleEndian>(self.data.len() as u64)?;
        out.extend_from_slice(&self.data);
        Ok(())
    }

    /// Parse a payload produced by [`Layer::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let header = LayerHeader::read_from(&mut cur)?;

        let data_len = cur
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::UnexpectedEof(cur.position()))? as usize;
        let start = cur.position() as usize;
        let end = start.checked_add(data_len).ok_or(Error::UnexpectedEof(u64::MAX))?;
        let data = bytes.get(start..end).ok_or(Error::UnexpectedEof(end as u64))?;
        Ok(Self::from_parts(header, data.to_vec()))
    }
}

impl LayerHeader {
    pub(crate) fn write_into(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        write_str(out, &self.meta.name)?;
        write_str(out, &self.meta.attribute)?;
        write_str(out, &self.class_name)?;
        out.write_u8(self.data_type.precision as u8)?;
        out.write_u8(self.data_type.extent)?;
        for axis in self.resolution.to_array() {
            out.write_u32::<LittleEndian>(axis as u32)?;
        }
        for row in to_row_major(&self.meta.mapping.local_to_world()) {
            for v in row {
                out.write_f64::<LittleEndian>(v)?;
            }
        }
        Ok(())
    }

    pub(crate) fn read_from(cur: &mut Cursor<&[u8]>) -> Result<Self> {
        let name = read_str(cur)?;
        let attribute = read_str(cur)?;
        let class_name = read_str(cur)?;

        let precision_code = cur.read_u8().map_err(|_| eof_at(cur))?;
        let precision = Precision::from_u8(precision_code)
            .ok_or_else(|| Error::invalid(format!("unknown precision code {}", precision_code)))?;
        let extent = cur.read_u8().map_err(|_| eof_at(cur))?;
        if extent != 1 && extent != 3 {
            return Err(Error::invalid(format!("unsupported extent {}", extent)));
        }

        let mut res = [0usize; 3];
        for axis in &mut res {
            *axis = cur.read_u32::<LittleEndian>().map_err(|_| eof_at(cur))? as usize;
        }

        let mut rows = [[0.0f64; 4]; 4];
        for row in &mut rows {
            for v in row.iter_mut() {
                *v = cur.read_f64::<LittleEndian>().map_err(|_| eof_at(cur))?;
            }
        }

        Ok(Self {
            meta: FieldMeta::new(name, attribute, from_row_major(rows)),
            class_name,
            data_type: DataType::new(precision, extent),
            resolution: Resolution::from(res),
        })
    }
}

fn eof_at(cur: &Cursor<&[u8]>) -> Error {
    Error::UnexpectedEof(cur.position())
}

/// Check that `data` holds exactly `count` voxels of `V`.
pub(crate) fn expect_voxels<V: Voxel>(data: &[u8], count: usize, what: &str) -> Result<()> {
    let expected = count * V::BYTES;
    if data.len() != expected {
        return Err(Error::invalid(format!(
            "{} data is {} bytes, expected {}",
            what,
            data.len(),
            expected
        )));
    }
    Ok(())
}

/// Decode `count` consecutive voxels.
pub(crate) fn read_voxels<V: Voxel>(data: &[u8], count: usize) -> Vec<V> {
    data.chunks_exact(V::BYTES).take(count).map(V::read_le).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{DenseField, SparseField};
    use crate::util::{DMat4, DVec3};

    fn sample_dense() -> DenseField<f32> {
        let meta = FieldMeta::new(
            "fluid1",
            "density",
            DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)),
        );
        let mut f = DenseField::new(meta, Resolution::new(2, 2, 2));
        *f.fast_lvalue(1, 1, 1) = 4.0;
        f
    }

    #[test]
    fn test_layer_bytes_roundtrip() {
        let layer = Layer::from_field(&sample_dense());
        let parsed = Layer::from_bytes(&layer.to_bytes()).unwrap();
        assert_eq!(parsed.header(), layer.header());
        assert_eq!(parsed.attribute(), "density");
        assert_eq!(parsed.name(), "fluid1");

        let dense = parsed.downcast::<DenseField<f32>>().unwrap().unwrap();
        assert_eq!(dense.value(1, 1, 1), 4.0);
        assert_eq!(dense.value(0, 0, 0), 0.0);
    }

    #[test]
    fn test_downcast_wrong_class_or_type() {
        let layer = Layer::from_field(&sample_dense());
        assert!(layer.downcast::<SparseField<f32>>().unwrap().is_none());
        assert!(layer.downcast::<DenseField<half::f16>>().unwrap().is_none());
        assert!(layer.is::<DenseField<f32>>());
    }

    #[test]
    fn test_downcast_corrupt_data() {
        let layer = Layer::from_field(&sample_dense());
        let broken = Layer::from_parts(layer.header().clone(), vec![0u8; 5]);
        assert!(broken.downcast::<DenseField<f32>>().is_err());
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = Layer::from_field(&sample_dense()).to_bytes();
        assert!(Layer::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_huge_data_length_rejected() {
        let mut bytes = Vec::new();
        Layer::from_field(&sample_dense()).header().write_into(&mut bytes).unwrap();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(matches!(Layer::from_bytes(&bytes), Err(Error::UnexpectedEof(_))));
    }
}
