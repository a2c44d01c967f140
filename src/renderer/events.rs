use super::*;

impl<D: Device> Renderer<D> {
    /// Adds `object` to the scene. It is drawn and pickable from the next frame on.
    pub fn add_object(&mut self, object: DisplayObject) -> EntityId {
        let entity = self.objects.insert(object);
        self.events.push_back(SceneEvent::Mounted(entity));
        entity
    }

    /// Edits `entity` through `update` and records that `attribute` changed.
    ///
    /// The batch holding the object is patched, regrouped or rebuilt at the next flush,
    /// depending on what `attribute` touches.
    pub fn update_object(
        &mut self,
        entity: EntityId,
        attribute: StyleAttribute,
        update: impl FnOnce(&mut DisplayObject),
    ) -> Result<(), RenderError> {
        let mut object = self
            .objects
            .get(entity)
            .cloned()
            .ok_or(RenderError::UnknownEntity(entity))?;
        update(&mut object);
        self.objects.replace(entity, object);
        self.events
            .push_back(SceneEvent::AttributeChanged(entity, attribute));
        Ok(())
    }

    pub fn remove_object(&mut self, entity: EntityId) -> Option<DisplayObject> {
        let removed = self.objects.remove(entity)?;
        self.events.push_back(SceneEvent::Unmounted(entity));
        Some(removed)
    }

    pub fn object(&self, entity: EntityId) -> Option<&DisplayObject> {
        self.objects.get(entity)
    }

    pub fn objects(&self) -> &DisplayObjectPool {
        &self.objects
    }

    /// Events recorded since the last flush.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Applies queued events to the spatial index and the batches, and refreshes the draw
    /// order. Returns the number of events consumed.
    pub(super) fn flush_events(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.events.pop_front() {
            processed += 1;
            match event {
                SceneEvent::Mounted(entity) => {
                    // Removed again before the flush.
                    let Some(object) = self.objects.get(entity) else {
                        continue;
                    };
                    if let Some(bounds) = object.world_bounds() {
                        self.picker.index_mut().insert(entity, bounds);
                    }
                    self.batches.insert(entity, &self.objects);
                    self.order_dirty = true;
                }
                SceneEvent::Unmounted(entity) => {
                    self.picker.index_mut().remove(entity);
                    self.batches.remove(entity);
                    self.order_dirty = true;
                }
                SceneEvent::AttributeChanged(entity, attribute) => {
                    let Some(object) = self.objects.get(entity) else {
                        continue;
                    };
                    if attribute.affects_bounds() {
                        self.picker
                            .index_mut()
                            .update(entity, object.world_bounds());
                    }
                    if attribute.affects_order() {
                        self.order_dirty = true;
                    }
                    let outcome = self.batches.attribute_changed(entity, attribute, &self.objects);
                    trace!(?entity, ?attribute, ?outcome, "attribute changed");
                }
            }
        }
        if processed > 0 {
            self.culling.invalidate();
        }
        processed
    }

    /// Rebuilds the draw order when the last flush changed it. Returns whether it did.
    pub(super) fn refresh_order(&mut self) -> bool {
        if !std::mem::take(&mut self.order_dirty) {
            return false;
        }
        self.order.rebuild(&self.objects);
        self.resort_batches = true;
        true
    }
}
