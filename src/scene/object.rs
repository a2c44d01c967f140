use super::bounds::{local_bounds, world_bounds, Aabb};
use super::pool::EntityId;
use super::style::{NodeKind, ParsedStyle};
use crate::util::Mat4;

/// A snapshot of one scene node as the renderer sees it.
///
/// The scene graph that owns the real node keeps this snapshot current and reports each
/// change through [`Renderer::update_object`](crate::Renderer::update_object).
#[derive(Debug, Clone)]
pub struct DisplayObject {
    pub style: ParsedStyle,
    pub world_transform: Mat4,
    pub visible: bool,
    /// Whether the object takes part in picking.
    pub capture: bool,
    pub parent: Option<EntityId>,
    pub z_index: i32,
    pub(crate) sequence: u64,
}

impl DisplayObject {
    pub fn new(style: ParsedStyle) -> Self {
        Self {
            style,
            world_transform: Mat4::identity(),
            visible: true,
            capture: true,
            parent: None,
            z_index: 0,
            sequence: 0,
        }
    }

    pub fn with_transform(mut self, world_transform: Mat4) -> Self {
        self.world_transform = world_transform;
        self
    }

    /// Shorthand for a pure translation.
    pub fn at(self, x: f32, y: f32) -> Self {
        self.with_transform(Mat4::translation(x, y, 0.0))
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.style.kind()
    }

    /// Insertion order in the pool; ties between equal z-indices resolve by it.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn local_bounds(&self) -> Option<Aabb> {
        local_bounds(&self.style)
    }

    pub fn world_bounds(&self) -> Option<Aabb> {
        world_bounds(&self.style, &self.world_transform)
    }

    pub fn is_pickable(&self) -> bool {
        self.visible && self.capture
    }
}
