use slotmap::{new_key_type, SlotMap};

use super::object::DisplayObject;

new_key_type! {
    /// Identifies a display object for as long as it stays in the pool.
    pub struct EntityId;
}

/// Generational arena of display-object snapshots.
#[derive(Debug, Default)]
pub struct DisplayObjectPool {
    objects: SlotMap<EntityId, DisplayObject>,
    next_sequence: u64,
}

impl DisplayObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut object: DisplayObject) -> EntityId {
        object.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.objects.insert(object)
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<DisplayObject> {
        self.objects.remove(entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&DisplayObject> {
        self.objects.get(entity)
    }

    /// Replaces the snapshot, keeping its insertion order. Returns the old snapshot.
    pub fn replace(&mut self, entity: EntityId, mut object: DisplayObject) -> Option<DisplayObject> {
        let slot = self.objects.get_mut(entity)?;
        object.sequence = slot.sequence;
        Some(std::mem::replace(slot, object))
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.objects.contains_key(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &DisplayObject)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ParsedStyle;

    #[test]
    fn replacing_keeps_insertion_order() {
        let mut pool = DisplayObjectPool::new();
        let first = pool.insert(DisplayObject::new(ParsedStyle::circle(1.0)));
        let second = pool.insert(DisplayObject::new(ParsedStyle::circle(1.0)));

        pool.replace(first, DisplayObject::new(ParsedStyle::rect(2.0, 2.0)));
        assert!(pool.get(first).unwrap().sequence() < pool.get(second).unwrap().sequence());
    }

    #[test]
    fn removed_ids_do_not_resolve_again() {
        let mut pool = DisplayObjectPool::new();
        let entity = pool.insert(DisplayObject::new(ParsedStyle::circle(1.0)));
        assert!(pool.remove(entity).is_some());
        let reused = pool.insert(DisplayObject::new(ParsedStyle::circle(1.0)));
        assert_ne!(entity, reused);
        assert!(pool.get(entity).is_none());
    }
}
