//! # field3d-cache
//!
//! Volumetric fluid cache codec. Fluid channels held as flat per-voxel
//! arrays (density, pressure, velocity, ...) are written to and read from
//! a binary field container holding dense, sparse and staggered (MAC)
//! layers at half or float precision.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (samples, voxel data types, math, errors)
//! - [`core`] - File metadata and payload compression
//! - [`field`] - Dense, sparse and MAC fields and the type-erased [`field::Layer`]
//! - [`store`] - The on-disk field container
//! - [`scene`] - Access to host fluid nodes
//! - [`codec`] - Channel naming, encoding selection, array conversion
//! - [`session`] - The channel-by-channel cache protocol
//!
//! ## Example
//!
//! ```ignore
//! use field3d_cache::prelude::*;
//!
//! let scene = SceneGraph::new().with(
//!     FluidContainer::new("fluid1", Resolution::new(2, 2, 2))
//!         .with_scalar(ChannelKind::Density, vec![1.0; 8]),
//! );
//! let mut session = ChannelSession::new(&scene, SessionConfig::dense_float());
//!
//! session.open("fluid1Frame1.f3d", AccessMode::Write)?;
//! session.write_channel_name("fluid1_density");
//! session.write_header()?;
//! session.write_float_array(&[])?;
//! session.close()?;
//! ```

pub mod util;
pub mod core;
pub mod field;
pub mod store;
pub mod scene;
pub mod codec;
pub mod session;

// Re-export commonly used types
pub use util::{DataType, Precision, Error, Result};
pub use session::{AccessMode, ChannelSession, Diagnostics};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{DataType, Precision, Resolution, Error, Result, V3};
    pub use crate::codec::{BoundsCheck, ChannelKind, FieldEncoding, SessionConfig, StorageConfig};
    pub use crate::scene::{FluidContainer, FluidNode, NodeRepository, SceneGraph};
    pub use crate::store::{Field3dInputFile, Field3dOutputFile, FieldInput, FieldOutput, ReadMode};
    pub use crate::session::{AccessMode, ChannelSession, Diagnostics};
}
