//! Groups display objects into instanced batches and keeps their geometry current.
//!
//! Batches are contiguous runs of the draw order: consecutive drawn objects that merge
//! share a batch, and drawing the batches back to front paints every object in draw
//! order. A batch owns its geometry and material exclusively. Objects point back at their
//! batch through [`BatchManager::batch_of`], an index lookup rather than a reference.

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::culling::Culling;
use crate::error::RenderError;
use crate::geometry::{Geometry, GeometryError};
use crate::material::Material;
use crate::mesh::{
    build_geometry, patch_instance, should_merge, FillTessellation, MeshKind, StaleIndexError,
    UpdateOutcome, MAP_UNIFORM,
};
use crate::platform::{
    BufferHandle, Device, DeviceError, DrawCall, RenderPipelineHandle, SamplerBinding,
    SamplerHandle,
};
use crate::scene::{
    DisplayObject, DisplayObjectPool, DrawOrder, EntityId, ImageSource, StyleAttribute,
};
use crate::texture_pool::TexturePool;

new_key_type! {
    pub struct BatchId;
}

/// Lifecycle of a batch's geometry.
///
/// `Empty` has never been built, `Building` is only observable while a rebuild runs,
/// `Ready` matches its members, `Dirty` waits for a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchState {
    Empty,
    Building,
    Ready,
    Dirty,
}

/// One draw call's worth of mergeable objects.
#[derive(Debug)]
pub struct BatchMesh {
    kind: MeshKind,
    members: Vec<EntityId>,
    geometry: Geometry,
    material: Material,
    state: BatchState,
    image: Option<ImageSource>,
    bound_image: Option<u64>,
}

impl BatchMesh {
    fn new(kind: MeshKind, image: Option<ImageSource>) -> Self {
        Self {
            kind,
            members: Vec::new(),
            geometry: Geometry::new(),
            material: kind.material(),
            state: BatchState::Empty,
            image,
            bound_image: None,
        }
    }

    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    /// Members in record order once the batch is `Ready`.
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// The image source an image batch samples.
    pub fn image(&self) -> Option<&ImageSource> {
        self.image.as_ref()
    }

    /// Position of `entity`'s records in the per-instance buffers.
    pub fn instance_index(&self, entity: EntityId) -> Result<usize, StaleIndexError> {
        self.members
            .iter()
            .position(|member| *member == entity)
            .ok_or(StaleIndexError {
                entity,
                members: self.members.len(),
            })
    }

    fn mark_dirty(&mut self) {
        if self.state == BatchState::Ready {
            self.state = BatchState::Dirty;
        }
    }

    /// Whether `entity`, already a member, still merges with the others.
    fn still_accepts(&self, pool: &DisplayObjectPool, entity: EntityId, object: &DisplayObject) -> bool {
        if MeshKind::for_node(object.kind()) != Some(self.kind) {
            return false;
        }
        let other = self
            .members
            .iter()
            .filter(|member| **member != entity)
            .find_map(|member| pool.get(*member));
        match other {
            Some(other) => should_merge(&other.style, &object.style),
            None => true,
        }
    }

    /// Replaces the members. A batch whose membership changed waits for a rebuild.
    fn assign(&mut self, members: Vec<EntityId>) {
        if self.members != members {
            self.members = members;
            self.mark_dirty();
        }
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != entity);
        let removed = self.members.len() != before;
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Applies a change of `attribute` on member `entity`.
    ///
    /// Instanced fields are patched in place while the geometry is `Ready`; a batch that
    /// waits for a rebuild picks the new value up then.
    pub fn update_attribute(
        &mut self,
        entity: EntityId,
        attribute: StyleAttribute,
        object: &DisplayObject,
    ) -> Result<UpdateOutcome, StaleIndexError> {
        let instance = self.instance_index(entity)?;
        let outcome = self.kind.classify(attribute);
        match outcome {
            UpdateOutcome::Patched if self.state == BatchState::Ready => {
                match patch_instance(self.kind, &mut self.geometry, instance, attribute, object) {
                    Ok(_) => {}
                    Err(GeometryError::RecordOutOfRange { .. }) => {
                        return Err(StaleIndexError {
                            entity,
                            members: self.members.len(),
                        });
                    }
                    Err(error) => {
                        debug!(%error, "instance patch failed, rebuilding batch");
                        self.mark_dirty();
                        return Ok(UpdateOutcome::Rebuild);
                    }
                }
            }
            UpdateOutcome::MaterialChanged => {
                self.image = object.style.image_source().cloned();
            }
            UpdateOutcome::Rebuild => self.mark_dirty(),
            _ => {}
        }
        Ok(outcome)
    }

    /// Rebuilds the geometry from scratch. Members missing from the pool are dropped and
    /// returned.
    fn rebuild<D: Device>(
        &mut self,
        device: &mut D,
        pool: &DisplayObjectPool,
        order: &DrawOrder,
        fill: &mut FillTessellation,
    ) -> Result<Vec<EntityId>, GeometryError> {
        self.state = BatchState::Building;
        let mut dropped = Vec::new();
        self.members.retain(|member| {
            let alive = pool.contains(*member);
            if !alive {
                dropped.push(*member);
            }
            alive
        });
        order.sort(&mut self.members);
        let objects: Vec<&DisplayObject> = self
            .members
            .iter()
            .filter_map(|member| pool.get(*member))
            .collect();

        let geometry = match build_geometry(self.kind, &objects, fill) {
            Ok(geometry) => geometry,
            Err(error) => {
                self.state = BatchState::Dirty;
                return Err(error);
            }
        };
        self.geometry.destroy(device);
        self.geometry = geometry;
        if self.kind == MeshKind::Image {
            self.image = objects
                .first()
                .and_then(|object| object.style.image_source().cloned());
        }
        self.state = BatchState::Ready;
        trace!(kind = self.kind.label(), members = self.members.len(), "batch rebuilt");
        Ok(dropped)
    }

    /// Points the material at the texture of the batch's image. Returns whether the
    /// binding changed.
    fn bind_image<D: Device>(
        &mut self,
        device: &mut D,
        textures: &mut TexturePool,
    ) -> Result<bool, DeviceError> {
        let wanted = self.image.as_ref().map(ImageSource::id);
        if self.kind != MeshKind::Image || wanted == self.bound_image {
            return Ok(false);
        }
        if let Some(previous) = self.bound_image.take() {
            textures.release(device, previous);
        }
        match &self.image {
            Some(image) => {
                let texture = textures.acquire(device, image)?;
                self.material.set_texture(MAP_UNIFORM, texture);
                self.bound_image = Some(image.id());
            }
            None => {
                self.material.clear_texture(MAP_UNIFORM);
            }
        }
        Ok(true)
    }

    /// The draw for this batch, or `None` when there is nothing on the device to draw.
    pub fn draw_call(
        &self,
        pipeline: RenderPipelineHandle,
        scene_uniforms: BufferHandle,
        sampler: Option<SamplerHandle>,
    ) -> Option<DrawCall> {
        if self.state != BatchState::Ready
            || self.geometry.index_count() == 0
            || self.geometry.instance_count() == 0
        {
            return None;
        }
        let samplers: SmallVec<[SamplerBinding; 2]> = match sampler {
            Some(sampler) => self
                .material
                .textures()
                .map(|texture| SamplerBinding { texture, sampler })
                .collect(),
            None => SmallVec::new(),
        };
        if samplers.len() as u32 != self.kind.bindings().num_samplers {
            return None;
        }
        Some(DrawCall {
            pipeline,
            vertex_buffers: self.geometry.gpu_vertex_buffers()?,
            index_buffer: self.geometry.gpu_index_buffer()?,
            index_count: self.geometry.index_count(),
            instance_count: self.geometry.instance_count(),
            uniform_buffers: SmallVec::from_slice(&[scene_uniforms]),
            samplers,
        })
    }

    fn destroy<D: Device>(&mut self, device: &mut D, textures: &mut TexturePool) {
        self.geometry.destroy(device);
        if let Some(image) = self.bound_image.take() {
            textures.release(device, image);
        }
    }
}

/// Counters from one [`BatchManager::prepare`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareStats {
    pub rebuilt: usize,
    pub uploaded: usize,
    pub destroyed: usize,
    pub rebound: usize,
}

/// A run of consecutive drawn objects that merge into one batch.
struct Run {
    kind: MeshKind,
    members: Vec<EntityId>,
}

/// Every batch of a renderer plus the object-to-batch back references.
#[derive(Debug, Default)]
pub struct BatchManager {
    batches: SlotMap<BatchId, BatchMesh>,
    /// Batch of every object drawn in the last prepared frame.
    owners: SecondaryMap<EntityId, BatchId>,
    /// Drawable objects handed to the manager, culled or not.
    mounted: SecondaryMap<EntityId, ()>,
    /// Membership no longer matches the mounted objects.
    layout_dirty: bool,
    stale_recoveries: usize,
}

impl BatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn batch(&self, id: BatchId) -> Option<&BatchMesh> {
        self.batches.get(id)
    }

    /// The batch `entity` was drawn with. `None` before its first prepare and while it is
    /// culled.
    pub fn batch_of(&self, entity: EntityId) -> Option<BatchId> {
        self.owners.get(entity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BatchId, &BatchMesh)> {
        self.batches.iter()
    }

    /// Incremental updates that found a stale index and fell back to a rebuild.
    pub fn stale_recoveries(&self) -> usize {
        self.stale_recoveries
    }

    /// Starts tracking `entity`. It joins a batch at the next prepare. Returns `false` when
    /// the object is not drawn by any mesh kind.
    pub fn insert(&mut self, entity: EntityId, pool: &DisplayObjectPool) -> bool {
        let drawable = pool
            .get(entity)
            .is_some_and(|object| MeshKind::for_node(object.kind()).is_some());
        if drawable && self.mounted.insert(entity, ()).is_none() {
            self.layout_dirty = true;
        }
        drawable
    }

    /// Stops tracking `entity` and takes it out of its batch. Returns the batch it left.
    pub fn remove(&mut self, entity: EntityId) -> Option<BatchId> {
        if self.mounted.remove(entity).is_some() {
            self.layout_dirty = true;
        }
        let id = self.owners.remove(entity)?;
        if let Some(batch) = self.batches.get_mut(id) {
            batch.remove(entity);
        }
        Some(id)
    }

    /// Routes a change of `attribute` on `entity` to its batch.
    ///
    /// A change that breaks the merge with the rest of the batch regroups the object; a
    /// stale instance index falls back to a full rebuild of the batch.
    pub fn attribute_changed(
        &mut self,
        entity: EntityId,
        attribute: StyleAttribute,
        pool: &DisplayObjectPool,
    ) -> UpdateOutcome {
        let Some(object) = pool.get(entity) else {
            return match self.remove(entity) {
                Some(_) => UpdateOutcome::Rebuild,
                None => UpdateOutcome::Unchanged,
            };
        };
        if MeshKind::for_node(object.kind()).is_none() {
            self.remove(entity);
            return UpdateOutcome::Regroup;
        }
        if !self.mounted.contains_key(entity) {
            self.insert(entity, pool);
            return UpdateOutcome::Regroup;
        }
        let culling_may_change =
            attribute.affects_bounds() || attribute == StyleAttribute::Visibility;
        if culling_may_change {
            self.layout_dirty = true;
        }

        let Some(id) = self.batch_of(entity) else {
            // Culled. Its records are written when it joins a batch again.
            return if culling_may_change {
                UpdateOutcome::Regroup
            } else {
                UpdateOutcome::Unchanged
            };
        };
        let Some(batch) = self.batches.get_mut(id) else {
            self.owners.remove(entity);
            self.layout_dirty = true;
            return UpdateOutcome::Regroup;
        };

        if !batch.still_accepts(pool, entity, object) {
            batch.remove(entity);
            self.owners.remove(entity);
            self.layout_dirty = true;
            return UpdateOutcome::Regroup;
        }

        match batch.update_attribute(entity, attribute, object) {
            Ok(outcome) => outcome,
            Err(stale) => {
                debug!(%stale, "falling back to a full batch rebuild");
                batch.state = BatchState::Dirty;
                // Membership is suspect too; derive it again from the draw order.
                self.layout_dirty = true;
                self.stale_recoveries += 1;
                UpdateOutcome::Rebuild
            }
        }
    }

    /// Splits the drawn objects into runs of consecutive mergeable objects, back to front.
    fn runs(&self, pool: &DisplayObjectPool, order: &DrawOrder, culling: &Culling) -> Vec<Run> {
        let mut drawn: Vec<EntityId> = self
            .mounted
            .keys()
            .filter(|entity| culling.is_visible(*entity))
            .collect();
        order.sort(&mut drawn);

        let mut runs: Vec<Run> = Vec::new();
        for entity in drawn {
            let Some(object) = pool.get(entity) else {
                continue;
            };
            let Some(kind) = MeshKind::for_node(object.kind()) else {
                continue;
            };
            let extends = runs.last().is_some_and(|run| {
                kind.is_instanced()
                    && run.kind == kind
                    && run
                        .members
                        .first()
                        .and_then(|first| pool.get(*first))
                        .is_some_and(|first| should_merge(&first.style, &object.style))
            });
            match runs.last_mut() {
                Some(run) if extends => run.members.push(entity),
                _ => runs.push(Run {
                    kind,
                    members: vec![entity],
                }),
            }
        }
        runs
    }

    /// Assigns every run to a batch. A run keeps the batch that drew its first member
    /// whenever that batch is still free, so an unchanged layout rebuilds nothing.
    fn regroup(&mut self, pool: &DisplayObjectPool, order: &DrawOrder, culling: &Culling) {
        self.layout_dirty = false;
        let runs = self.runs(pool, order, culling);

        let mut claimed: SecondaryMap<BatchId, ()> = SecondaryMap::new();
        let mut owners: SecondaryMap<EntityId, BatchId> = SecondaryMap::new();
        for run in runs {
            let reusable = run
                .members
                .iter()
                .filter_map(|member| self.owners.get(*member).copied())
                .find(|id| {
                    !claimed.contains_key(*id)
                        && self.batches.get(*id).is_some_and(|batch| batch.kind == run.kind)
                });
            let id = match reusable {
                Some(id) => id,
                None => {
                    let image = run
                        .members
                        .first()
                        .and_then(|first| pool.get(*first))
                        .and_then(|first| first.style.image_source().cloned());
                    debug!(kind = run.kind.label(), "opened batch");
                    self.batches.insert(BatchMesh::new(run.kind, image))
                }
            };
            claimed.insert(id, ());
            for member in &run.members {
                owners.insert(*member, id);
            }
            self.batches[id].assign(run.members);
        }

        for (id, batch) in self.batches.iter_mut() {
            if !claimed.contains_key(id) {
                batch.assign(Vec::new());
            }
        }
        self.owners = owners;
    }

    /// Brings every batch up to date: membership is derived again when the layout
    /// changed, empty batches are destroyed, dirty ones rebuilt, image textures bound and
    /// changed bytes uploaded.
    ///
    /// `layout_changed` reports a new draw order or a new visible set since the last call.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare<D: Device>(
        &mut self,
        device: &mut D,
        pool: &DisplayObjectPool,
        order: &DrawOrder,
        culling: &Culling,
        layout_changed: bool,
        textures: &mut TexturePool,
        fill: &mut FillTessellation,
    ) -> Result<PrepareStats, RenderError> {
        let mut stats = PrepareStats::default();
        if layout_changed || self.layout_dirty {
            self.regroup(pool, order, culling);
        }

        let empty: Vec<BatchId> = self
            .batches
            .iter()
            .filter(|(_, batch)| batch.is_empty())
            .map(|(id, _)| id)
            .collect();
        for id in empty {
            if let Some(mut batch) = self.batches.remove(id) {
                batch.destroy(device, textures);
                stats.destroyed += 1;
            }
        }

        for (_, batch) in self.batches.iter_mut() {
            if matches!(batch.state, BatchState::Empty | BatchState::Dirty) {
                for dropped in batch.rebuild(device, pool, order, fill)? {
                    self.owners.remove(dropped);
                }
                stats.rebuilt += 1;
            }
            if batch.bind_image(device, textures)? {
                stats.rebound += 1;
            }
            if batch.geometry.is_dirty() {
                batch.geometry.upload(device, batch.kind.label())?;
                stats.uploaded += 1;
            }
        }
        Ok(stats)
    }

    /// Batches back to front, by the lowest draw rank among their members.
    pub fn ordered(&self, order: &DrawOrder) -> Vec<BatchId> {
        let mut ranked: Vec<(Option<u32>, BatchId)> = self
            .batches
            .iter()
            .map(|(id, batch)| {
                let rank = batch.members.iter().filter_map(|m| order.rank(*m)).min();
                (rank, id)
            })
            .collect();
        ranked.sort();
        ranked.into_iter().map(|(_, id)| id).collect()
    }

    /// Destroys every batch. Tracked objects are forgotten too.
    pub fn destroy_all<D: Device>(&mut self, device: &mut D, textures: &mut TexturePool) {
        for (_, mut batch) in self.batches.drain() {
            batch.destroy(device, textures);
        }
        self.owners.clear();
        self.mounted.clear();
        self.layout_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::mesh::instance_records;
    use crate::picking::{Picker, SpatialIndex};
    use crate::platform::SoftwareDevice;
    use crate::scene::ParsedStyle;
    use crate::util::Mat4;
    use std::num::NonZeroUsize;

    struct Harness {
        device: SoftwareDevice,
        pool: DisplayObjectPool,
        order: DrawOrder,
        index: SpatialIndex,
        culling: Culling,
        textures: TexturePool,
        fill: FillTessellation,
        batches: BatchManager,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                device: SoftwareDevice::default(),
                pool: DisplayObjectPool::new(),
                order: DrawOrder::new(),
                index: SpatialIndex::new(),
                culling: Culling::new(false),
                textures: TexturePool::new(4),
                fill: FillTessellation::new(NonZeroUsize::new(8).unwrap(), 0.1),
                batches: BatchManager::new(),
            }
        }

        fn add(&mut self, object: DisplayObject) -> EntityId {
            let entity = self.pool.insert(object);
            self.batches.insert(entity, &self.pool);
            entity
        }

        fn prepare(&mut self) -> PrepareStats {
            self.order.rebuild(&self.pool);
            self.index.rebuild(&self.pool);
            self.culling.invalidate();
            self.culling.update(&self.pool, &self.index, None);
            self.batches
                .prepare(
                    &mut self.device,
                    &self.pool,
                    &self.order,
                    &self.culling,
                    true,
                    &mut self.textures,
                    &mut self.fill,
                )
                .unwrap()
        }

        fn batch_of(&self, entity: EntityId) -> &BatchMesh {
            let id = self.batches.batch_of(entity).unwrap();
            self.batches.batch(id).unwrap()
        }

        fn common_bytes(&self, entity: EntityId) -> Vec<u8> {
            let geometry = self.batch_of(entity).geometry();
            geometry.vertex_buffer(0).unwrap().data.clone()
        }
    }

    fn image(id: u64) -> ParsedStyle {
        ParsedStyle::image(4.0, 4.0, ImageSource::new(id, 1, 1, vec![255u8; 4]))
    }

    #[test]
    fn batch_goes_from_empty_to_ready() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        assert_eq!(harness.batches.batch_of(a), None);

        let stats = harness.prepare();
        assert_eq!(stats.rebuilt, 1);
        assert_eq!(harness.batch_of(a).state(), BatchState::Ready);

        let b = harness.add(DisplayObject::new(ParsedStyle::rect(2.0, 2.0)));
        harness.order.rebuild(&harness.pool);
        harness.culling.invalidate();
        harness.culling.update(&harness.pool, &harness.index, None);
        harness
            .batches
            .regroup(&harness.pool, &harness.order, &harness.culling);
        assert_eq!(harness.batch_of(a).state(), BatchState::Dirty);
        assert_eq!(harness.batch_of(a).members(), &[a, b]);
        assert_eq!(harness.batches.len(), 1);
    }

    #[test]
    fn runs_split_on_kind_and_image_source() {
        let mut harness = Harness::new();
        let circle = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        let line = harness.add(DisplayObject::new(ParsedStyle::line(0.0, 0.0, 1.0, 1.0)));
        let first = harness.add(DisplayObject::new(image(1)));
        let second = harness.add(DisplayObject::new(image(2)));
        let third = harness.add(DisplayObject::new(image(1)));
        let fourth = harness.add(DisplayObject::new(image(1)));
        harness.prepare();

        let batch = |entity| harness.batches.batch_of(entity);
        assert_ne!(batch(circle), batch(line));
        assert_ne!(batch(first), batch(second));
        // Same source, but `second` is painted between them.
        assert_ne!(batch(first), batch(third));
        assert_eq!(batch(third), batch(fourth));
        assert_eq!(harness.batches.len(), 5);
    }

    #[test]
    fn interleaved_kinds_paint_in_pick_order() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::rect(20.0, 20.0)));
        let b = harness.add(DisplayObject::new(ParsedStyle::image(
            20.0,
            20.0,
            ImageSource::new(1, 1, 1, vec![255u8; 4]),
        )));
        let c = harness.add(DisplayObject::new(ParsedStyle::rect(20.0, 20.0)));
        harness.prepare();

        let painted: Vec<EntityId> = harness
            .batches
            .ordered(&harness.order)
            .into_iter()
            .filter_map(|id| harness.batches.batch(id))
            .flat_map(|batch| batch.members().to_vec())
            .collect();
        assert_eq!(painted, vec![a, b, c]);

        let mut picker = Picker::default();
        picker.index_mut().rebuild(&harness.pool);
        let picked = picker.pick(&harness.pool, &harness.order, [10.0, 10.0], &Mat4::identity());
        assert_eq!(picked, painted.last().copied());
        assert_eq!(harness.batches.len(), 3);
    }

    #[test]
    fn hidden_objects_leave_their_batch() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        let b = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        harness.prepare();
        assert_eq!(harness.batch_of(a).geometry().instance_count(), 2);

        let hidden = harness.pool.get(b).unwrap().clone().with_visible(false);
        harness.pool.replace(b, hidden);
        harness
            .batches
            .attribute_changed(b, StyleAttribute::Visibility, &harness.pool);
        harness.prepare();

        assert_eq!(harness.batches.batch_of(b), None);
        assert_eq!(harness.batch_of(a).members(), &[a]);
        assert_eq!(harness.batch_of(a).geometry().instance_count(), 1);
    }

    #[test]
    fn members_are_recorded_in_insertion_order() {
        let mut harness = Harness::new();
        let objects = [
            DisplayObject::new(ParsedStyle::circle(1.0)).at(1.0, 0.0),
            DisplayObject::new(ParsedStyle::circle(2.0)).at(2.0, 0.0),
            DisplayObject::new(ParsedStyle::circle(3.0)).at(3.0, 0.0),
        ];
        let mut expected = Vec::new();
        let mut last = None;
        for object in objects {
            expected.extend(instance_records(&object).unwrap().common);
            last = Some(harness.add(object));
        }
        harness.prepare();
        assert_eq!(harness.common_bytes(last.unwrap()), expected);
    }

    #[test]
    fn fill_change_is_patched_in_place() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        let b = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        harness.prepare();

        let mut object = harness.pool.get(b).unwrap().clone();
        object.style.fill = Color::WHITE;
        harness.pool.replace(b, object);
        let outcome = harness
            .batches
            .attribute_changed(b, StyleAttribute::Fill, &harness.pool);
        assert_eq!(outcome, UpdateOutcome::Patched);

        assert_eq!(harness.batch_of(a).state(), BatchState::Ready);
        let stats = harness.prepare();
        assert_eq!(stats.rebuilt, 0);
        assert_eq!(stats.uploaded, 1);
    }

    #[test]
    fn swapping_the_image_of_a_shared_batch_regroups() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(image(1)));
        let b = harness.add(DisplayObject::new(image(1)));
        harness.prepare();

        harness.pool.replace(b, DisplayObject::new(image(2)));
        let outcome = harness
            .batches
            .attribute_changed(b, StyleAttribute::Img, &harness.pool);
        assert_eq!(outcome, UpdateOutcome::Regroup);

        harness.prepare();
        assert_ne!(harness.batches.batch_of(a), harness.batches.batch_of(b));
        assert_eq!(harness.batch_of(b).image().map(ImageSource::id), Some(2));
    }

    #[test]
    fn swapping_the_image_of_a_lone_member_changes_the_material() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(image(1)));
        harness.prepare();
        let id = harness.batches.batch_of(a).unwrap();
        let version = harness.batches.batch(id).unwrap().material().version();

        harness.pool.replace(a, DisplayObject::new(image(2)));
        let outcome = harness
            .batches
            .attribute_changed(a, StyleAttribute::Img, &harness.pool);
        assert_eq!(outcome, UpdateOutcome::MaterialChanged);

        let stats = harness.prepare();
        assert_eq!(stats.rebuilt, 0);
        assert_eq!(stats.rebound, 1);
        let batch = harness.batches.batch(id).unwrap();
        assert!(batch.material().version() > version);
        assert_eq!(batch.image().map(ImageSource::id), Some(2));
        assert_eq!(harness.textures.active_count(), 1);
    }

    #[test]
    fn stale_index_falls_back_to_a_rebuild() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        let b = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        harness.prepare();
        let id = harness.batches.batch_of(b).unwrap();
        let records_before = harness.common_bytes(a);

        // The batch loses track of `b` while the back reference still points at it.
        harness.batches.batches[id].members.retain(|member| *member != b);

        let mut object = harness.pool.get(b).unwrap().clone();
        object.style.fill = Color::WHITE;
        harness.pool.replace(b, object);
        let outcome = harness
            .batches
            .attribute_changed(b, StyleAttribute::Fill, &harness.pool);

        assert_eq!(outcome, UpdateOutcome::Rebuild);
        assert_eq!(harness.batches.stale_recoveries(), 1);
        assert_eq!(harness.batches.batch(id).unwrap().state(), BatchState::Dirty);
        assert_eq!(harness.common_bytes(a), records_before);

        let stats = harness.prepare();
        assert_eq!(stats.rebuilt, 1);
        let batch = harness.batch_of(b);
        assert_eq!(batch.state(), BatchState::Ready);
        assert_eq!(batch.members(), &[a, b]);
        assert_eq!(batch.geometry().instance_count(), 2);
        let expected = instance_records(harness.pool.get(b).unwrap()).unwrap().common;
        assert!(harness.common_bytes(b).ends_with(&expected));
    }

    #[test]
    fn emptied_batches_are_destroyed() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        harness.prepare();
        harness.pool.remove(a);
        harness.batches.remove(a);

        let stats = harness.prepare();
        assert_eq!(stats.destroyed, 1);
        assert!(harness.batches.is_empty());
        assert_eq!(harness.device.live_resource_count(), 0);
    }

    #[test]
    fn z_index_change_resorts_members() {
        let mut harness = Harness::new();
        let a = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        let b = harness.add(DisplayObject::new(ParsedStyle::circle(1.0)));
        harness.prepare();

        let raised = harness.pool.get(a).unwrap().clone().with_z_index(5);
        harness.pool.replace(a, raised);
        let outcome = harness
            .batches
            .attribute_changed(a, StyleAttribute::ZIndex, &harness.pool);
        assert_eq!(outcome, UpdateOutcome::Reorder);

        assert_eq!(harness.prepare().rebuilt, 1);
        assert_eq!(harness.batch_of(a).members(), &[b, a]);
    }
}
