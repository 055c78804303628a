//! Field type resolution: which encoding a stored channel uses.

use half::f16;
use tracing::{debug, error};

use super::encoding::FieldEncoding;
use super::typed::TypedField;
use crate::store::FieldInput;
use crate::util::{DataType, Error, Precision, Resolution, Result};

/// Element types probed for a channel, in priority order.
const PROBE_ORDER: [DataType; 4] = [DataType::HALF, DataType::FLOAT, DataType::V3H, DataType::V3F];

/// Names of all scalar and vector layers in the file: per partition,
/// scalar names first, then vector names.
pub fn field_names<I: FieldInput>(input: &I) -> Vec<String> {
    let mut names = Vec::new();
    for partition in input.partition_names() {
        names.extend(input.scalar_layer_names(&partition));
        names.extend(input.vector_layer_names(&partition));
    }
    names
}

/// Component-wise maximum data resolution over every scalar and vector
/// layer of half, float or double samples. Zero when the file has none.
pub fn fields_resolution<I: FieldInput>(input: &I) -> Resolution {
    Precision::ALL
        .into_iter()
        .flat_map(|p| [DataType::scalar(p), DataType::vector(p)])
        .flat_map(|dt| input.headers(None, dt))
        .fold(Resolution::ZERO, |acc, h| acc.max(h.resolution))
}

/// Load and downcast the first layer named `name`.
///
/// Probes half scalar, float scalar, half vector, float vector and stops
/// at the first element type with a layer of that name. A layer that
/// matches the element type but none of the field classes is a
/// [`Error::DowncastFailure`], not a reason to try the next probe.
pub fn load_field<I: FieldInput>(input: &I, name: &str) -> Result<TypedField> {
    let Some(data_type) = PROBE_ORDER
        .into_iter()
        .find(|dt| !input.headers(Some(name), *dt).is_empty())
    else {
        error!(channel = name, "no half or float layer with this name");
        return Err(Error::TypeUnsupported(name.to_string()));
    };

    let layer = input
        .read_layer(name, data_type)?
        .ok_or_else(|| Error::NotFound(name.to_string()))?;

    let typed = if data_type == DataType::HALF {
        TypedField::from_scalar_layer::<f16>(
            &layer,
            TypedField::DenseScalarHalf,
            TypedField::SparseScalarHalf,
        )?
    } else if data_type == DataType::FLOAT {
        TypedField::from_scalar_layer::<f32>(
            &layer,
            TypedField::DenseScalarFloat,
            TypedField::SparseScalarFloat,
        )?
    } else if data_type == DataType::V3H {
        TypedField::from_vector_layer::<f16>(
            &layer,
            TypedField::DenseVectorHalf,
            TypedField::SparseVectorHalf,
            TypedField::MacHalf,
        )?
    } else {
        TypedField::from_vector_layer::<f32>(
            &layer,
            TypedField::DenseVectorFloat,
            TypedField::SparseVectorFloat,
            TypedField::MacFloat,
        )?
    };

    match typed {
        Some(field) => {
            debug!(channel = name, encoding = %field.encoding(), "resolved field type");
            Ok(field)
        }
        None => {
            let expected = if data_type.is_vector() {
                "a dense, sparse or MAC field"
            } else {
                "a dense or sparse field"
            };
            error!(
                channel = name,
                class = layer.class_name(),
                %data_type,
                "layer matches no known field class"
            );
            Err(Error::DowncastFailure {
                name: name.to_string(),
                class_name: layer.class_name().to_string(),
                expected: expected.to_string(),
            })
        }
    }
}

/// Encoding of the channel stored under `name`.
pub fn resolve_encoding<I: FieldInput>(input: &I, name: &str) -> Result<FieldEncoding> {
    load_field(input, name).map(|f| f.encoding())
}
