//! Typed field objects stored as layers in a cache file.
//!
//! Three concrete representations exist, each generic over its voxel type:
//! - [`DenseField`] - every voxel stored explicitly
//! - [`SparseField`] - voxels stored in lazily allocated blocks
//! - [`MacField`] - staggered 3-vector field, one sub-grid per component
//!
//! A [`Layer`] is the type-erased form read back from a store. Recovering
//! a concrete field is a checked downcast on class name and data type.

mod mapping;
mod dense;
mod sparse;
mod mac;
mod layer;

pub use mapping::{FieldMeta, MatrixFieldMapping};
pub use dense::DenseField;
pub use sparse::{SparseField, DEFAULT_BLOCK_ORDER};
pub use mac::{MacComponent, MacField};
pub use layer::{FieldClass, Layer, LayerHeader};

/// Voxel coordinate `(x, y, z)` inside a field's data window.
pub type Coord = (usize, usize, usize);
