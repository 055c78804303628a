//! Utility types and functions for the fluid cache.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Precision`] / [`Sample`] - Half, float and double sample types
//! - [`DataType`] / [`Voxel`] - Scalar or 3-vector voxel element types
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus [`V3`] and [`Resolution`]

mod pod;
mod data_type;
mod error;
mod math;

pub use pod::*;
pub use data_type::*;
pub use error::*;
pub use math::*;
