use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Envelope, RTree, RTreeObject, SelectionFunction, AABB};
use slotmap::SecondaryMap;

use crate::scene::{Aabb, DisplayObjectPool, EntityId};

type IndexedBounds = GeomWithData<Rectangle<[f32; 2]>, EntityId>;

fn indexed(entity: EntityId, bounds: Aabb) -> IndexedBounds {
    GeomWithData::new(Rectangle::from_corners(bounds.min, bounds.max), entity)
}

/// Selects the entries whose box touches `envelope`.
struct IntersectingEnvelope {
    envelope: AABB<[f32; 2]>,
}

impl SelectionFunction<IndexedBounds> for IntersectingEnvelope {
    fn should_unpack_parent(&self, envelope: &AABB<[f32; 2]>) -> bool {
        self.envelope.intersects(envelope)
    }

    fn should_unpack_leaf(&self, leaf: &IndexedBounds) -> bool {
        self.envelope.intersects(&leaf.envelope())
    }
}

/// R-tree over world-space bounding boxes.
///
/// Every entity is stored at most once; the box it was inserted with is remembered so it
/// can be found again for removal.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedBounds>,
    bounds: SecondaryMap<EntityId, Aabb>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-loads every object of `pool` that has bounds.
    pub fn rebuild(&mut self, pool: &DisplayObjectPool) {
        self.bounds.clear();
        let mut entries = Vec::with_capacity(pool.len());
        for (entity, object) in pool.iter() {
            if let Some(bounds) = object.world_bounds() {
                self.bounds.insert(entity, bounds);
                entries.push(indexed(entity, bounds));
            }
        }
        self.tree = RTree::bulk_load(entries);
    }

    pub fn insert(&mut self, entity: EntityId, bounds: Aabb) {
        self.remove(entity);
        self.tree.insert(indexed(entity, bounds));
        self.bounds.insert(entity, bounds);
    }

    /// Re-keys `entity`. `None` drops it from the index.
    pub fn update(&mut self, entity: EntityId, bounds: Option<Aabb>) {
        match bounds {
            Some(bounds) if self.bounds.get(entity) == Some(&bounds) => {}
            Some(bounds) => self.insert(entity, bounds),
            None => {
                self.remove(entity);
            }
        }
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<Aabb> {
        let bounds = self.bounds.remove(entity)?;
        self.tree.remove(&indexed(entity, bounds));
        Some(bounds)
    }

    pub fn bounds(&self, entity: EntityId) -> Option<Aabb> {
        self.bounds.get(entity).copied()
    }

    /// Entities whose box contains `point`, in no particular order.
    pub fn query_point(&self, point: [f32; 2]) -> Vec<EntityId> {
        self.tree
            .locate_all_at_point(&point)
            .map(|entry| entry.data)
            .collect()
    }

    /// Entities whose box touches `area`, in no particular order.
    pub fn query_rect(&self, area: Aabb) -> Vec<EntityId> {
        let selection = IntersectingEnvelope {
            envelope: AABB::from_corners(area.min, area.max),
        };
        self.tree
            .locate_with_selection_function(selection)
            .map(|entry| entry.data)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.bounds.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DisplayObject, ParsedStyle};

    #[test]
    fn degenerate_query_returns_every_containing_box() {
        let mut pool = DisplayObjectPool::new();
        let a = pool.insert(DisplayObject::new(ParsedStyle::rect(10.0, 10.0)));
        let b = pool.insert(DisplayObject::new(ParsedStyle::rect(10.0, 10.0)).at(5.0, 5.0));
        let mut index = SpatialIndex::new();
        index.rebuild(&pool);

        let mut hits = index.query_point([7.0, 7.0]);
        hits.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(hits, expected);
        assert_eq!(index.query_point([1.0, 1.0]), vec![a]);
        assert!(index.query_point([50.0, 50.0]).is_empty());
    }

    #[test]
    fn update_moves_the_entry() {
        let mut pool = DisplayObjectPool::new();
        let entity = pool.insert(DisplayObject::new(ParsedStyle::rect(4.0, 4.0)));
        let mut index = SpatialIndex::new();
        index.insert(entity, Aabb::new([0.0, 0.0], [4.0, 4.0]));
        index.update(entity, Some(Aabb::new([100.0, 100.0], [104.0, 104.0])));

        assert_eq!(index.len(), 1);
        assert!(index.query_point([2.0, 2.0]).is_empty());
        assert_eq!(index.query_point([102.0, 102.0]), vec![entity]);

        index.update(entity, None);
        assert!(index.is_empty());
        assert_eq!(index.bounds(entity), None);
    }

    #[test]
    fn rect_query_includes_touching_boxes() {
        let mut pool = DisplayObjectPool::new();
        let inside = pool.insert(DisplayObject::new(ParsedStyle::rect(10.0, 10.0)).at(5.0, 5.0));
        let touching = pool.insert(DisplayObject::new(ParsedStyle::rect(10.0, 10.0)).at(50.0, 0.0));
        pool.insert(DisplayObject::new(ParsedStyle::rect(10.0, 10.0)).at(200.0, 200.0));
        let mut index = SpatialIndex::new();
        index.rebuild(&pool);

        let mut hits = index.query_rect(Aabb::new([0.0, 0.0], [50.0, 50.0]));
        hits.sort();
        let mut expected = vec![inside, touching];
        expected.sort();
        assert_eq!(hits, expected);
    }

    #[test]
    fn groups_are_not_indexed() {
        let mut pool = DisplayObjectPool::new();
        pool.insert(DisplayObject::new(ParsedStyle::group()));
        let mut index = SpatialIndex::new();
        index.rebuild(&pool);
        assert!(index.is_empty());
    }
}
