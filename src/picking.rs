//! Spatial picking: an R-tree over world bounds narrows the candidates, an exact test in
//! each candidate's local space confirms them, and draw order picks the topmost.

mod path_generator;
mod spatial_index;

use euclid::default::Point2D;
use tracing::trace;

pub use hit_test::{hit_test_for, HitTest, UnsupportedShapeError};
pub use path_generator::{distance_to_outline, generate_path, is_point_in_path};
pub use spatial_index::SpatialIndex;

use crate::scene::{DisplayObject, DisplayObjectPool, DrawOrder, EntityId};
use crate::util::{project_point, Mat4};

/// Flattening tolerance used when curved outlines are tested through their path.
pub const DEFAULT_PICKING_TOLERANCE: f32 = 0.1;

#[derive(Debug)]
pub struct Picker {
    index: SpatialIndex,
    tolerance: f32,
}

impl Default for Picker {
    fn default() -> Self {
        Self::new(DEFAULT_PICKING_TOLERANCE)
    }
}

impl Picker {
    pub fn new(tolerance: f32) -> Self {
        Self {
            index: SpatialIndex::new(),
            tolerance,
        }
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut SpatialIndex {
        &mut self.index
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Every object under `point`, back to front.
    ///
    /// `point` is in canvas coordinates. `ortho` is the camera's orthographic matrix: the
    /// index is queried at the point mapped back through it, and each candidate is tested
    /// at the point mapped through the inverse of `world_transform * ortho`.
    pub fn pick_all(
        &self,
        pool: &DisplayObjectPool,
        order: &DrawOrder,
        point: [f32; 2],
        ortho: &Mat4,
    ) -> Vec<EntityId> {
        let Some(world_point) = ortho
            .inverse()
            .and_then(|inverse| project_point(&inverse, Point2D::new(point[0], point[1])))
        else {
            return Vec::new();
        };

        let mut hits: Vec<EntityId> = self
            .index
            .query_point([world_point.x, world_point.y])
            .into_iter()
            .filter(|entity| {
                pool.get(*entity)
                    .is_some_and(|object| object.is_pickable() && self.hit(object, point, ortho))
            })
            .collect();
        order.sort(&mut hits);
        hits
    }

    /// The topmost object under `point`.
    pub fn pick(
        &self,
        pool: &DisplayObjectPool,
        order: &DrawOrder,
        point: [f32; 2],
        ortho: &Mat4,
    ) -> Option<EntityId> {
        self.pick_all(pool, order, point, ortho).pop()
    }

    fn hit(&self, object: &DisplayObject, point: [f32; 2], ortho: &Mat4) -> bool {
        let test = match hit_test_for(object.kind()) {
            Ok(test) => test,
            Err(unsupported) => {
                trace!(%unsupported, "accepting bounding box match");
                return true;
            }
        };
        let Some(inverse) = object.world_transform.then(ortho).inverse() else {
            return false;
        };
        match project_point(&inverse, Point2D::new(point[0], point[1])) {
            Some(local) => test(&object.style, [local.x, local.y], self.tolerance),
            None => false,
        }
    }
}
