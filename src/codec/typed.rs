//! A concrete field of one of the supported encodings.

use half::f16;

use super::encoding::FieldEncoding;
use crate::field::{DenseField, FieldClass, FieldMeta, Layer, MacField, SparseField};
use crate::util::{Resolution, Result, Sample, Voxel, V3};

/// A downcast layer, one variant per [`FieldEncoding`].
#[derive(Clone, Debug, PartialEq)]
pub enum TypedField {
    DenseScalarHalf(DenseField<f16>),
    DenseScalarFloat(DenseField<f32>),
    SparseScalarHalf(SparseField<f16>),
    SparseScalarFloat(SparseField<f32>),
    DenseVectorHalf(DenseField<V3<f16>>),
    DenseVectorFloat(DenseField<V3<f32>>),
    SparseVectorHalf(SparseField<V3<f16>>),
    SparseVectorFloat(SparseField<V3<f32>>),
    MacHalf(MacField<f16>),
    MacFloat(MacField<f32>),
}

impl TypedField {
    pub fn encoding(&self) -> FieldEncoding {
        match self {
            Self::DenseScalarHalf(_) => FieldEncoding::DenseScalarHalf,
            Self::DenseScalarFloat(_) => FieldEncoding::DenseScalarFloat,
            Self::SparseScalarHalf(_) => FieldEncoding::SparseScalarHalf,
            Self::SparseScalarFloat(_) => FieldEncoding::SparseScalarFloat,
            Self::DenseVectorHalf(_) => FieldEncoding::DenseVectorHalf,
            Self::DenseVectorFloat(_) => FieldEncoding::DenseVectorFloat,
            Self::SparseVectorHalf(_) => FieldEncoding::SparseVectorHalf,
            Self::SparseVectorFloat(_) => FieldEncoding::SparseVectorFloat,
            Self::MacHalf(_) => FieldEncoding::MacHalf,
            Self::MacFloat(_) => FieldEncoding::MacFloat,
        }
    }

    pub fn meta(&self) -> &FieldMeta {
        match self {
            Self::DenseScalarHalf(f) => f.meta(),
            Self::DenseScalarFloat(f) => f.meta(),
            Self::SparseScalarHalf(f) => f.meta(),
            Self::SparseScalarFloat(f) => f.meta(),
            Self::DenseVectorHalf(f) => f.meta(),
            Self::DenseVectorFloat(f) => f.meta(),
            Self::SparseVectorHalf(f) => f.meta(),
            Self::SparseVectorFloat(f) => f.meta(),
            Self::MacHalf(f) => f.meta(),
            Self::MacFloat(f) => f.meta(),
        }
    }

    pub fn data_resolution(&self) -> Resolution {
        match self {
            Self::DenseScalarHalf(f) => f.data_resolution(),
            Self::DenseScalarFloat(f) => f.data_resolution(),
            Self::SparseScalarHalf(f) => f.data_resolution(),
            Self::SparseScalarFloat(f) => f.data_resolution(),
            Self::DenseVectorHalf(f) => f.data_resolution(),
            Self::DenseVectorFloat(f) => f.data_resolution(),
            Self::SparseVectorHalf(f) => f.data_resolution(),
            Self::SparseVectorFloat(f) => f.data_resolution(),
            Self::MacHalf(f) => f.data_resolution(),
            Self::MacFloat(f) => f.data_resolution(),
        }
    }

    /// Erase into a storable layer.
    pub fn to_layer(&self) -> Layer {
        match self {
            Self::DenseScalarHalf(f) => Layer::from_field(f),
            Self::DenseScalarFloat(f) => Layer::from_field(f),
            Self::SparseScalarHalf(f) => Layer::from_field(f),
            Self::SparseScalarFloat(f) => Layer::from_field(f),
            Self::DenseVectorHalf(f) => Layer::from_field(f),
            Self::DenseVectorFloat(f) => Layer::from_field(f),
            Self::SparseVectorHalf(f) => Layer::from_field(f),
            Self::SparseVectorFloat(f) => Layer::from_field(f),
            Self::MacHalf(f) => Layer::from_field(f),
            Self::MacFloat(f) => Layer::from_field(f),
        }
    }

    /// Downcast a scalar layer of sample type `T`: dense first, then sparse.
    pub(crate) fn from_scalar_layer<T: Sample + Voxel>(
        layer: &Layer,
        dense: fn(DenseField<T>) -> Self,
        sparse: fn(SparseField<T>) -> Self,
    ) -> Result<Option<Self>> {
        if let Some(f) = layer.downcast::<DenseField<T>>()? {
            return Ok(Some(dense(f)));
        }
        if let Some(f) = layer.downcast::<SparseField<T>>()? {
            return Ok(Some(sparse(f)));
        }
        Ok(None)
    }

    /// Downcast a vector layer of sample type `T`: dense, sparse, then MAC.
    pub(crate) fn from_vector_layer<T: Sample>(
        layer: &Layer,
        dense: fn(DenseField<V3<T>>) -> Self,
        sparse: fn(SparseField<V3<T>>) -> Self,
        mac: fn(MacField<T>) -> Self,
    ) -> Result<Option<Self>>
    where
        V3<T>: Voxel,
    {
        if let Some(f) = layer.downcast::<DenseField<V3<T>>>()? {
            return Ok(Some(dense(f)));
        }
        if let Some(f) = layer.downcast::<SparseField<V3<T>>>()? {
            return Ok(Some(sparse(f)));
        }
        if let Some(f) = layer.downcast::<MacField<T>>()? {
            return Ok(Some(mac(f)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::DMat4;

    #[test]
    fn test_vector_downcast_order() {
        let meta = FieldMeta::new("fluid1", "velocity", DMat4::IDENTITY);
        let mac = MacField::<f32>::new(meta, Resolution::new(2, 1, 1));
        let layer = Layer::from_field(&mac);

        let typed = TypedField::from_vector_layer::<f32>(
            &layer,
            TypedField::DenseVectorFloat,
            TypedField::SparseVectorFloat,
            TypedField::MacFloat,
        )
        .unwrap()
        .unwrap();
        assert_eq!(typed.encoding(), FieldEncoding::MacFloat);
        assert_eq!(typed.data_resolution(), Resolution::new(2, 1, 1));
        assert_eq!(typed.to_layer().header(), layer.header());
    }

    #[test]
    fn test_scalar_downcast_skips_vector_layer() {
        let meta = FieldMeta::new("fluid1", "color", DMat4::IDENTITY);
        let color = DenseField::<V3<f32>>::new(meta, Resolution::new(1, 1, 1));
        let layer = Layer::from_field(&color);
        let typed = TypedField::from_scalar_layer::<f32>(
            &layer,
            TypedField::DenseScalarFloat,
            TypedField::SparseScalarFloat,
        )
        .unwrap();
        assert!(typed.is_none());
    }
}
