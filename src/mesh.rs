//! Mesh kinds and the instanced vertex layout batches are built from.
//!
//! Every kind binds the same three vertex buffers:
//!
//! * buffer 0: the common per-instance record (model matrix, fill, stroke, params) at
//!   locations 0 to 6,
//! * buffer 1: per-vertex data at location 7 (unit quad corners, or tessellated vertices
//!   for [`MeshKind::Fill`]),
//! * buffer 2: the kind-specific per-instance record from location 10 on. Fill meshes do
//!   not have one.

mod fill;
mod image;
mod instanced;
mod line;
mod sdf;
mod shaders;

use thiserror::Error;

pub use instanced::CommonInstance;

pub use fill::FillTessellation;
pub(crate) use fill::FillMeshVertex;
pub(crate) use image::MAP_UNIFORM;
pub(crate) use shaders::build_mesh_wgsl;

use crate::geometry::{Geometry, GeometryError};
use crate::material::{DefineValue, Material};
use crate::platform::BindingLayout;
use crate::scene::{DisplayObject, EntityId, NodeKind, ParsedStyle, StyleAttribute};
use image::ImageMesh;
use instanced::{build_instanced, common_field, InstancedMesh};
use line::LineMesh;
use sdf::SdfMesh;

pub(crate) const COMMON_BUFFER_INDEX: u32 = 0;
pub(crate) const VERTEX_BUFFER_INDEX: u32 = 1;
pub(crate) const KIND_BUFFER_INDEX: u32 = 2;
pub(crate) const VERTEX_LOCATION: u32 = 7;
pub(crate) const KIND_LOCATION_START: u32 = 10;

/// How a node kind is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshKind {
    /// Circles, ellipses and rects as signed distance fields on instanced quads.
    Sdf,
    /// Textured instanced quads.
    Image,
    /// Straight segments on instanced quads.
    Line,
    /// Tessellated polygons, polylines and paths, one object per batch.
    Fill,
}

impl MeshKind {
    /// `None` for kinds this renderer does not draw.
    pub fn for_node(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Circle | NodeKind::Ellipse | NodeKind::Rect => Some(MeshKind::Sdf),
            NodeKind::Image => Some(MeshKind::Image),
            NodeKind::Line => Some(MeshKind::Line),
            NodeKind::Polyline | NodeKind::Polygon | NodeKind::Path => Some(MeshKind::Fill),
            NodeKind::Text | NodeKind::Group => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MeshKind::Sdf => "sdf mesh",
            MeshKind::Image => "image mesh",
            MeshKind::Line => "line mesh",
            MeshKind::Fill => "fill mesh",
        }
    }

    pub fn bindings(self) -> BindingLayout {
        BindingLayout {
            num_uniform_buffers: 1,
            num_samplers: u32::from(self == MeshKind::Image),
        }
    }

    /// Whether several objects can share one batch of this kind.
    pub fn is_instanced(self) -> bool {
        self != MeshKind::Fill
    }

    /// The material a fresh batch of this kind starts with.
    pub fn material(self) -> Material {
        match self {
            MeshKind::Sdf | MeshKind::Line => {
                Material::new().with_define("USE_ANTIALIAS", DefineValue::Bool(true))
            }
            MeshKind::Image | MeshKind::Fill => Material::new(),
        }
    }

    /// How a change of `attribute` reaches a batch of this kind, before membership is
    /// taken into account.
    pub fn classify(self, attribute: StyleAttribute) -> UpdateOutcome {
        use StyleAttribute as A;
        match (self, attribute) {
            (_, A::ZIndex | A::Parent) => UpdateOutcome::Reorder,
            (MeshKind::Fill, A::LineWidth | A::Points | A::Path) => UpdateOutcome::Rebuild,
            (_, A::Transform | A::Fill | A::Stroke | A::Opacity | A::Visibility | A::LineWidth) => {
                UpdateOutcome::Patched
            }
            (
                MeshKind::Sdf,
                A::R | A::Rx | A::Ry | A::Width | A::Height | A::Anchor | A::Radius,
            ) => UpdateOutcome::Patched,
            (MeshKind::Image, A::Width | A::Height | A::Anchor) => UpdateOutcome::Patched,
            (MeshKind::Image, A::Img) => UpdateOutcome::MaterialChanged,
            (MeshKind::Line, A::Endpoints) => UpdateOutcome::Patched,
            _ => UpdateOutcome::Unchanged,
        }
    }
}

/// Whether `candidate` can join the batch `representative` stands for.
///
/// Same mesh kind and the same structural inputs: images must sample the same source.
/// Fill meshes carry their own vertices and never share a batch.
pub fn should_merge(representative: &ParsedStyle, candidate: &ParsedStyle) -> bool {
    let Some(kind) = MeshKind::for_node(representative.kind()) else {
        return false;
    };
    if MeshKind::for_node(candidate.kind()) != Some(kind) || !kind.is_instanced() {
        return false;
    }
    match kind {
        MeshKind::Image => representative.image_source() == candidate.image_source(),
        _ => true,
    }
}

/// What an attribute change did to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOutcome {
    /// Nothing drawn depends on the attribute.
    Unchanged,
    /// Bytes of one instance record were overwritten in place.
    Patched,
    /// A shared uniform changed; the whole batch is redrawn but its geometry is kept.
    MaterialChanged,
    /// Draw order changed; the batch re-sorts its members on the next rebuild.
    Reorder,
    /// The object no longer merges with its batch and moved to another one.
    Regroup,
    /// The batch geometry has to be rebuilt from scratch.
    Rebuild,
}

/// An incremental update addressed an object that has no valid record in its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{entity:?} has no instance record in a batch of {members} members")]
pub struct StaleIndexError {
    pub entity: EntityId,
    pub members: usize,
}

/// The per-instance bytes one object contributes to an instanced batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecords {
    pub common: Vec<u8>,
    pub specific: Vec<u8>,
}

/// Records of `object` as a batch of its kind would hold them. `None` for fill meshes and
/// kinds that are not drawn.
pub fn instance_records(object: &DisplayObject) -> Option<InstanceRecords> {
    match MeshKind::for_node(object.kind())? {
        MeshKind::Sdf => Some(instanced::instance_records::<SdfMesh>(object)),
        MeshKind::Image => Some(instanced::instance_records::<ImageMesh>(object)),
        MeshKind::Line => Some(instanced::instance_records::<LineMesh>(object)),
        MeshKind::Fill => None,
    }
}

/// Full geometry of a batch whose members are `objects`, in draw order.
pub(crate) fn build_geometry(
    kind: MeshKind,
    objects: &[&DisplayObject],
    fill: &mut FillTessellation,
) -> Result<Geometry, GeometryError> {
    match kind {
        MeshKind::Sdf => build_instanced::<SdfMesh>(objects),
        MeshKind::Image => build_instanced::<ImageMesh>(objects),
        MeshKind::Line => build_instanced::<LineMesh>(objects),
        MeshKind::Fill => match objects {
            [object] => fill.build_geometry(object),
            _ => Ok(Geometry::new()),
        },
    }
}

/// Overwrites the bytes `attribute` maps to in the record at `instance`. Returns whether
/// the attribute has an instanced field at all.
pub(crate) fn patch_instance(
    kind: MeshKind,
    geometry: &mut Geometry,
    instance: usize,
    attribute: StyleAttribute,
    object: &DisplayObject,
) -> Result<bool, GeometryError> {
    if let Some((location, bytes)) = common_field(attribute, object) {
        geometry.update_vertex_buffer(COMMON_BUFFER_INDEX, location, instance, &bytes)?;
        return Ok(true);
    }
    let specific = match kind {
        MeshKind::Sdf => SdfMesh::field(attribute, &object.style),
        MeshKind::Image => ImageMesh::field(attribute, &object.style),
        MeshKind::Line => LineMesh::field(attribute, &object.style),
        MeshKind::Fill => None,
    };
    match specific {
        Some((location, bytes)) => {
            geometry.update_vertex_buffer(KIND_BUFFER_INDEX, location, instance, &bytes)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
