//! Field identity and local-to-world mapping.

use crate::util::DMat4;

/// Matrix mapping from a field's local `[0,1]³` space to world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixFieldMapping {
    local_to_world: DMat4,
}

impl MatrixFieldMapping {
    pub fn new(local_to_world: DMat4) -> Self {
        Self { local_to_world }
    }

    #[inline]
    pub fn local_to_world(&self) -> DMat4 {
        self.local_to_world
    }

    pub fn set_local_to_world(&mut self, m: DMat4) {
        self.local_to_world = m;
    }

    #[inline]
    pub fn world_to_local(&self) -> DMat4 {
        self.local_to_world.inverse()
    }
}

impl Default for MatrixFieldMapping {
    fn default() -> Self {
        Self::new(DMat4::IDENTITY)
    }
}

/// Properties shared by every field class.
///
/// `name` is the owning group (the partition the layer lands in) and
/// `attribute` the channel; layers are looked up by attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMeta {
    pub name: String,
    pub attribute: String,
    pub mapping: MatrixFieldMapping,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, attribute: impl Into<String>, local_to_world: DMat4) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
            mapping: MatrixFieldMapping::new(local_to_world),
        }
    }
}
