//! Decides which objects reach the batches in a frame.
//!
//! An object is drawn when its own `visible` flag is set and, with viewport culling on,
//! its world bounds touch the part of the world the camera shows. Everything else is left
//! out of the instance buffers entirely.

use ahash::{HashSet, HashSetExt};
use tracing::trace;

use crate::picking::SpatialIndex;
use crate::scene::{Aabb, DisplayObjectPool, EntityId};

#[derive(Debug)]
pub struct Culling {
    viewport_culling: bool,
    visible: HashSet<EntityId>,
    /// World area the visible set was computed for.
    area: Option<Aabb>,
    /// Set when the scene changed since the visible set was computed.
    stale: bool,
}

impl Culling {
    pub fn new(viewport_culling: bool) -> Self {
        Self {
            viewport_culling,
            visible: HashSet::new(),
            area: None,
            stale: true,
        }
    }

    pub fn is_visible(&self, entity: EntityId) -> bool {
        self.visible.contains(&entity)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Marks the visible set out of date after a scene edit.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Recomputes the visible set for `area`. Skipped when the scene is unchanged since
    /// [`invalidate`](Self::invalidate) was last called and the area did not move.
    /// Returns whether the set changed.
    pub fn update(
        &mut self,
        pool: &DisplayObjectPool,
        index: &SpatialIndex,
        area: Option<Aabb>,
    ) -> bool {
        if !self.stale && area == self.area {
            return false;
        }
        self.stale = false;
        self.area = area;

        let visible: HashSet<EntityId> = match (self.viewport_culling, area) {
            (true, Some(area)) => index
                .query_rect(area)
                .into_iter()
                .filter(|entity| pool.get(*entity).is_some_and(|object| object.visible))
                .collect(),
            // A view that cannot be inverted shows nothing.
            (true, None) => HashSet::new(),
            (false, _) => pool
                .iter()
                .filter(|(_, object)| object.visible)
                .map(|(entity, _)| entity)
                .collect(),
        };
        if visible == self.visible {
            return false;
        }
        trace!(
            before = self.visible.len(),
            after = visible.len(),
            "visible set changed"
        );
        self.visible = visible;
        true
    }

    /// Forgets the visible set so the next update recomputes it.
    pub fn reset(&mut self) {
        self.visible.clear();
        self.area = None;
        self.stale = true;
    }
}
