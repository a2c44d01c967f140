use std::cmp::Ordering;

use ahash::{HashMap, HashMapExt};
use slotmap::SecondaryMap;

use super::pool::{DisplayObjectPool, EntityId};

/// Painter's order of every object in a pool.
///
/// Ranks come from a pre-order walk of the parent hierarchy in which siblings are visited
/// by `(z_index, insertion order)`. A parent therefore draws before its children, and a
/// higher rank draws later (on top).
#[derive(Debug, Default, Clone)]
pub struct DrawOrder {
    ranks: SecondaryMap<EntityId, u32>,
}

impl DrawOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes every rank from the pool.
    pub fn rebuild(&mut self, pool: &DisplayObjectPool) {
        let mut children: HashMap<Option<EntityId>, Vec<EntityId>> = HashMap::new();
        for (entity, object) in pool.iter() {
            let parent = object.parent.filter(|parent| pool.contains(*parent));
            children.entry(parent).or_default().push(entity);
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|entity| {
                pool.get(*entity)
                    .map(|object| (object.z_index, object.sequence()))
                    .unwrap_or_default()
            });
        }

        let mut tree: easy_tree::Tree<Option<EntityId>> = easy_tree::Tree::new();
        let root = tree.add_node(None);
        let mut pending = vec![(root, None)];
        while let Some((node, entity)) = pending.pop() {
            for &child in children.get(&entity).map(Vec::as_slice).unwrap_or_default() {
                let child_node = tree.add_child(node, Some(child));
                pending.push((child_node, Some(child)));
            }
        }

        self.ranks.clear();
        let mut next_rank = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Some(Some(entity)) = tree.get(node) {
                self.ranks.insert(*entity, next_rank);
                next_rank += 1;
            }
            stack.extend(tree.children(node).iter().rev().copied());
        }

        // Objects caught in a parent cycle are unreachable from the root; draw them last.
        let mut orphans: Vec<_> = pool
            .iter()
            .filter(|(entity, _)| !self.ranks.contains_key(*entity))
            .map(|(entity, object)| (object.z_index, object.sequence(), entity))
            .collect();
        orphans.sort_by_key(|(z_index, sequence, _)| (*z_index, *sequence));
        for (_, _, entity) in orphans {
            self.ranks.insert(entity, next_rank);
            next_rank += 1;
        }
    }

    pub fn rank(&self, entity: EntityId) -> Option<u32> {
        self.ranks.get(entity).copied()
    }

    /// Unranked entities sort before ranked ones.
    pub fn compare(&self, a: EntityId, b: EntityId) -> Ordering {
        self.rank(a).cmp(&self.rank(b))
    }

    /// Sorts back to front.
    pub fn sort(&self, entities: &mut [EntityId]) {
        entities.sort_by(|a, b| self.compare(*a, *b));
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DisplayObject, ParsedStyle};

    fn object() -> DisplayObject {
        DisplayObject::new(ParsedStyle::rect(1.0, 1.0))
    }

    #[test]
    fn siblings_follow_insertion_order() {
        let mut pool = DisplayObjectPool::new();
        let a = pool.insert(object());
        let b = pool.insert(object());
        let mut order = DrawOrder::new();
        order.rebuild(&pool);
        assert_eq!(order.compare(a, b), Ordering::Less);
    }

    #[test]
    fn z_index_beats_insertion_order() {
        let mut pool = DisplayObjectPool::new();
        let a = pool.insert(object().with_z_index(1));
        let b = pool.insert(object());
        let mut order = DrawOrder::new();
        order.rebuild(&pool);
        assert_eq!(order.compare(a, b), Ordering::Greater);
    }

    #[test]
    fn children_draw_after_their_parent_and_before_its_next_sibling() {
        let mut pool = DisplayObjectPool::new();
        let group = pool.insert(DisplayObject::new(ParsedStyle::group()));
        let sibling = pool.insert(object());
        let child = pool.insert(object().with_parent(group));

        let mut order = DrawOrder::new();
        order.rebuild(&pool);
        let mut entities = vec![sibling, child, group];
        order.sort(&mut entities);
        assert_eq!(entities, vec![group, child, sibling]);
    }

    #[test]
    fn parent_cycles_still_get_ranks() {
        let mut pool = DisplayObjectPool::new();
        let a = pool.insert(object());
        let b = pool.insert(object().with_parent(a));
        pool.replace(a, object().with_parent(b));

        let mut order = DrawOrder::new();
        order.rebuild(&pool);
        assert!(order.rank(a).is_some());
        assert!(order.rank(b).is_some());
        assert_eq!(order.len(), 2);
    }
}
