//! Host scene access.
//!
//! A cache session never walks the host scene itself. It asks a
//! [`NodeRepository`] for the fluid node owning a channel and reads the
//! node's transform, attributes and channel arrays through [`FluidNode`].
//! [`SceneGraph`] is an in-memory repository.

mod graph;

pub use graph::{FluidContainer, SceneGraph};

use crate::codec::ChannelKind;
use crate::util::{DMat4, DVec3, Resolution};

/// Node attributes holding the auto-resize offset of a fluid.
pub const DYNAMIC_OFFSET_ATTRS: [&str; 3] = ["dynamicOffsetX", "dynamicOffsetY", "dynamicOffsetZ"];

/// A fluid node as seen by the cache.
pub trait FluidNode {
    fn name(&self) -> &str;

    /// Inclusive world transform of the node.
    fn world_transform(&self) -> DMat4;

    /// Numeric attribute by name, `None` when absent.
    fn float_attribute(&self, name: &str) -> Option<f64>;

    /// Voxel grid size.
    fn resolution(&self) -> Resolution;

    /// Size of the fluid box in local units.
    fn dimensions(&self) -> DVec3;

    /// Flat array of a scalar channel (`density`, `pressure`, ...).
    fn scalar_channel(&self, kind: ChannelKind) -> Option<&[f32]>;

    /// Component arrays of a vector channel. For `velocity` these are the
    /// staggered `u, v, w` arrays.
    fn vector_channel(&self, kind: ChannelKind) -> [Option<&[f32]>; 3];
}

/// Lookup of fluid nodes by name.
pub trait NodeRepository {
    type Node: FluidNode;

    fn find_node(&self, name: &str) -> Option<&Self::Node>;
}

impl<R: NodeRepository + ?Sized> NodeRepository for &R {
    type Node = R::Node;

    fn find_node(&self, name: &str) -> Option<&Self::Node> {
        (**self).find_node(name)
    }
}
