//! In-memory scene: named fluid containers with their channel data.

use std::collections::HashMap;

use super::{FluidNode, NodeRepository};
use crate::codec::{ChannelKind, ChannelShape, StaggeredLayout};
use crate::util::{DMat4, DVec3, Resolution};

/// A fluid container node.
#[derive(Clone, Debug)]
pub struct FluidContainer {
    name: String,
    transform: DMat4,
    resolution: Resolution,
    dimensions: DVec3,
    attributes: HashMap<String, f64>,
    scalars: HashMap<ChannelKind, Vec<f32>>,
    vectors: HashMap<ChannelKind, [Vec<f32>; 3]>,
}

impl FluidContainer {
    /// A container with identity transform, unit dimensions and no channels.
    pub fn new(name: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            name: name.into(),
            transform: DMat4::IDENTITY,
            resolution,
            dimensions: DVec3::ONE,
            attributes: HashMap::new(),
            scalars: HashMap::new(),
            vectors: HashMap::new(),
        }
    }

    pub fn with_transform(mut self, transform: DMat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_dimensions(mut self, dimensions: DVec3) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_scalar(mut self, kind: ChannelKind, data: Vec<f32>) -> Self {
        self.set_scalar(kind, data);
        self
    }

    pub fn with_vector(mut self, kind: ChannelKind, data: [Vec<f32>; 3]) -> Self {
        self.set_vector(kind, data);
        self
    }

    /// Fill every stored channel with `value`, each at its natural size.
    pub fn filled(name: impl Into<String>, resolution: Resolution, value: f32) -> Self {
        let mut fluid = Self::new(name, resolution);
        let n = resolution.voxel_count();
        for kind in ChannelKind::STORED {
            match kind.shape() {
                ChannelShape::Scalar => fluid.set_scalar(kind, vec![value; n]),
                ChannelShape::Vector => fluid.set_vector(kind, [vec![value; n], vec![value; n], vec![value; n]]),
                ChannelShape::Staggered => {
                    let lens = StaggeredLayout::new(resolution).component_lens();
                    fluid.set_vector(kind, lens.map(|len| vec![value; len]));
                }
                ChannelShape::Pseudo => {}
            }
        }
        fluid
    }

    pub fn set_transform(&mut self, transform: DMat4) {
        self.transform = transform;
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: f64) {
        self.attributes.insert(name.into(), value);
    }

    pub fn set_scalar(&mut self, kind: ChannelKind, data: Vec<f32>) {
        self.scalars.insert(kind, data);
    }

    pub fn set_vector(&mut self, kind: ChannelKind, data: [Vec<f32>; 3]) {
        self.vectors.insert(kind, data);
    }

    /// Drop a channel's data.
    pub fn clear_channel(&mut self, kind: ChannelKind) {
        self.scalars.remove(&kind);
        self.vectors.remove(&kind);
    }

    /// Channels that currently hold data, in export order.
    pub fn channels(&self) -> Vec<ChannelKind> {
        ChannelKind::STORED
            .into_iter()
            .filter(|k| self.scalars.contains_key(k) || self.vectors.contains_key(k))
            .collect()
    }
}

impl FluidNode for FluidContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn world_transform(&self) -> DMat4 {
        self.transform
    }

    fn float_attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn dimensions(&self) -> DVec3 {
        self.dimensions
    }

    fn scalar_channel(&self, kind: ChannelKind) -> Option<&[f32]> {
        self.scalars.get(&kind).map(Vec::as_slice)
    }

    fn vector_channel(&self, kind: ChannelKind) -> [Option<&[f32]>; 3] {
        match self.vectors.get(&kind) {
            Some([a, b, c]) => [Some(a.as_slice()), Some(b.as_slice()), Some(c.as_slice())],
            None => [None, None, None],
        }
    }
}

/// Repository of fluid containers, looked up by name.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<FluidContainer>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node of the same name.
    pub fn insert(&mut self, node: FluidContainer) {
        match self.nodes.iter_mut().find(|n| n.name == node.name) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
    }

    pub fn with(mut self, node: FluidContainer) -> Self {
        self.insert(node);
        self
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FluidContainer> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn nodes(&self) -> &[FluidContainer] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeRepository for SceneGraph {
    type Node = FluidContainer;

    fn find_node(&self, name: &str) -> Option<&FluidContainer> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
