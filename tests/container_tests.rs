//! Integration tests for the field container: partitions, typed layer reads, metadata.

use field3d_cache::codec::{field_names, fields_resolution, load_field, FieldEncoding, TypedField};
use field3d_cache::field::{DenseField, FieldMeta, MacField, SparseField};
use field3d_cache::store::{Field3dInputFile, Field3dOutputFile, FieldInput, FieldOutput};
use field3d_cache::util::{DMat4, Resolution, V3};
use field3d_cache::Error;

use half::f16;
use tempfile::NamedTempFile;

fn meta(owner: &str, attr: &str) -> FieldMeta {
    FieldMeta::new(owner, attr, DMat4::IDENTITY)
}

#[test]
fn test_partitions_group_layers_by_owner() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();
    let res = Resolution::new(4, 4, 4);

    {
        let mut out = Field3dOutputFile::create_at(path, true).expect("Failed to create cache");
        out.write_scalar_layer(&DenseField::<f32>::new(meta("smoke", "density"), res)).unwrap();
        out.write_scalar_layer(&DenseField::<f32>::new(meta("fire", "temperature"), res)).unwrap();
        out.write_vector_layer(&MacField::<f32>::new(meta("smoke", "velocity"), res)).unwrap();
        out.write_scalar_layer(&SparseField::<f16>::new(meta("smoke", "fuel"), res)).unwrap();
        out.close().unwrap();
    }

    let input = Field3dInputFile::open_at(path).expect("Failed to open cache");
    assert_eq!(input.partition_names(), ["smoke", "fire"]);
    assert_eq!(input.scalar_layer_names("smoke"), ["density", "fuel"]);
    assert_eq!(input.vector_layer_names("smoke"), ["velocity"]);
    assert!(input.vector_layer_names("fire").is_empty());
    assert!(input.scalar_layer_names("water").is_empty());

    // Per partition: scalars, then vectors.
    assert_eq!(field_names(&input), ["density", "fuel", "velocity", "temperature"]);

    assert_eq!(input.read_scalar_layers::<f32>(None).unwrap().len(), 2);
    assert_eq!(input.read_scalar_layers::<f16>(Some("fuel")).unwrap().len(), 1);
    assert!(input.read_scalar_layers::<f16>(Some("density")).unwrap().is_empty());
    assert_eq!(input.read_vector_layers::<f32>(Some("velocity")).unwrap().len(), 1);
}

#[test]
fn test_typed_values_survive_the_container() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();
    let res = Resolution::new(20, 3, 2);

    {
        let mut sparse = SparseField::<f32>::new(meta("fluid1", "density"), res);
        *sparse.fast_lvalue(17, 2, 1) = 4.5;
        *sparse.fast_lvalue(0, 0, 0) = -1.25;

        let mut color = DenseField::<V3<f16>>::new(meta("fluid1", "color"), res);
        *color.fast_lvalue(1, 1, 1) = V3::new(f16::from_f32(0.5), f16::ONE, f16::ZERO);

        let mut out = Field3dOutputFile::create_at(path, true).unwrap();
        out.set_compression(6);
        out.write_scalar_layer(&sparse).unwrap();
        out.write_vector_layer(&color).unwrap();
        out.close().unwrap();
    }

    let input = Field3dInputFile::open_at(path).unwrap();
    assert_eq!(fields_resolution(&input), res);

    match load_field(&input, "density").unwrap() {
        TypedField::SparseScalarFloat(f) => {
            assert_eq!(f.value(17, 2, 1), 4.5);
            assert_eq!(f.value(0, 0, 0), -1.25);
            assert_eq!(f.value(5, 1, 0), 0.0);
            assert_eq!(f.iter().count(), res.voxel_count());
        }
        other => panic!("unexpected encoding {}", other.encoding()),
    }

    let color = load_field(&input, "color").unwrap();
    assert_eq!(color.encoding(), FieldEncoding::DenseVectorHalf);
    assert_eq!(color.meta().name, "fluid1");
    if let TypedField::DenseVectorHalf(f) = color {
        assert_eq!(f.value(1, 1, 1).to_array().map(f32::from), [0.5, 1.0, 0.0]);
    }
}

#[test]
fn test_metadata_last_flush_wins() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    {
        let mut out = Field3dOutputFile::create_at(path, true).unwrap();
        out.metadata_mut().set_str("Info", "first");
        out.metadata_mut().set_vec_float("Offset", [1.0, 2.0, 3.0]);
        out.flush_global_metadata().unwrap();
        out.metadata_mut().set_vec_float("Offset", [4.0, 5.0, 6.0]);
        out.flush_global_metadata().unwrap();
        out.close().unwrap();
    }

    let input = Field3dInputFile::open_at(path).unwrap();
    assert_eq!(input.metadata().str_or("Info", ""), "first");
    assert_eq!(input.metadata().vec_float_or("Offset", [0.0; 3]), [4.0, 5.0, 6.0]);
}

#[test]
fn test_create_respects_overwrite_flag() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    assert!(matches!(
        Field3dOutputFile::create_at(path, false),
        Err(Error::OpenFailure { .. })
    ));
    let mut out = Field3dOutputFile::create_at(path, true).unwrap();
    assert!(out.is_open());
    out.close().unwrap();
    assert!(!out.is_open());
}

#[test]
fn test_load_field_decodes_only_the_first_match() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();
    let res = Resolution::new(2, 2, 2);

    {
        let mut first = DenseField::<f32>::new(meta("smoke", "density"), res);
        *first.fast_lvalue(1, 0, 0) = 7.0;
        let mut out = Field3dOutputFile::create_at(path, true).unwrap();
        out.write_scalar_layer(&first).unwrap();
        out.write_scalar_layer(&DenseField::<f32>::new(meta("smoke", "density"), res)).unwrap();
        out.close().unwrap();
    }

    // Break the payload codec of the second layer.
    let second = Field3dInputFile::open_at(path)
        .unwrap()
        .index()
        .entries()
        .filter(|e| e.header.meta.attribute == "density")
        .nth(1)
        .map(|e| e.pos)
        .unwrap();
    let mut bytes = std::fs::read(path).unwrap();
    bytes[second as usize + 8] = 7;
    std::fs::write(path, &bytes).unwrap();

    let input = Field3dInputFile::open_at(path).unwrap();
    assert!(input.read_scalar_layers::<f32>(Some("density")).is_err());
    match load_field(&input, "density").unwrap() {
        TypedField::DenseScalarFloat(f) => assert_eq!(f.value(1, 0, 0), 7.0),
        other => panic!("unexpected encoding {}", other.encoding()),
    }
}
