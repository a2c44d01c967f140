//! Display-object snapshots the renderer draws and picks.

mod bounds;
mod object;
mod order;
mod pool;
mod style;

pub use bounds::{local_bounds, world_bounds, Aabb};
pub use object::DisplayObject;
pub use order::DrawOrder;
pub use pool::{DisplayObjectPool, EntityId};
pub use style::{ImageSource, NodeKind, ParsedStyle, ShapeGeometry, StyleAttribute};

/// A change to the scene, queued and consumed once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    Mounted(EntityId),
    Unmounted(EntityId),
    AttributeChanged(EntityId, StyleAttribute),
}
