use super::{
    InstanceRecords, COMMON_BUFFER_INDEX, KIND_BUFFER_INDEX, VERTEX_BUFFER_INDEX, VERTEX_LOCATION,
};
use crate::geometry::{Geometry, GeometryError, VertexBufferData};
use crate::platform::{Format, VertexAttribute, VertexBufferFrequency};
use crate::scene::{DisplayObject, ParsedStyle, StyleAttribute};
use crate::util::mat4_to_columns;

/// Unit quad corners in `[0, 1]^2`. Each kind maps them onto its own local extent.
const QUAD_CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

pub(crate) const MODEL_MATRIX_LOCATION: u32 = 0;
pub(crate) const FILL_LOCATION: u32 = 4;
pub(crate) const STROKE_LOCATION: u32 = 5;
pub(crate) const PARAMS_LOCATION: u32 = 6;

/// The instance record every mesh kind shares.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CommonInstance {
    pub model_matrix: [[f32; 4]; 4],
    pub fill: [f32; 4],
    pub stroke: [f32; 4],
    /// Opacity, line width, visibility (0 or 1), unused.
    pub params: [f32; 4],
}

impl CommonInstance {
    pub const STRIDE: u32 = std::mem::size_of::<CommonInstance>() as u32;

    pub fn from_object(object: &DisplayObject) -> Self {
        Self {
            model_matrix: mat4_to_columns(&object.world_transform),
            fill: object.style.fill.normalize(),
            stroke: object.style.stroke.normalize(),
            params: params(object),
        }
    }

    pub(crate) fn attributes() -> Vec<VertexAttribute> {
        (0..7)
            .map(|location| VertexAttribute {
                format: Format::F32_RGBA,
                byte_offset: location * 16,
                shader_location: location,
            })
            .collect()
    }
}

fn params(object: &DisplayObject) -> [f32; 4] {
    [
        object.style.opacity,
        object.style.line_width,
        if object.visible { 1.0 } else { 0.0 },
        0.0,
    ]
}

/// Location and bytes of the shared record field `attribute` maps to.
pub(crate) fn common_field(
    attribute: StyleAttribute,
    object: &DisplayObject,
) -> Option<(u32, Vec<u8>)> {
    let field = match attribute {
        StyleAttribute::Transform => (
            MODEL_MATRIX_LOCATION,
            bytemuck::bytes_of(&mat4_to_columns(&object.world_transform)).to_vec(),
        ),
        StyleAttribute::Fill => (
            FILL_LOCATION,
            bytemuck::bytes_of(&object.style.fill.normalize()).to_vec(),
        ),
        StyleAttribute::Stroke => (
            STROKE_LOCATION,
            bytemuck::bytes_of(&object.style.stroke.normalize()).to_vec(),
        ),
        StyleAttribute::LineWidth | StyleAttribute::Opacity | StyleAttribute::Visibility => {
            (PARAMS_LOCATION, bytemuck::bytes_of(&params(object)).to_vec())
        }
        _ => return None,
    };
    Some(field)
}

/// A mesh kind drawn as one instanced unit quad per object.
pub(crate) trait InstancedMesh {
    type Instance: bytemuck::Pod;

    /// Attributes of the kind-specific per-instance buffer.
    fn attributes() -> Vec<VertexAttribute>;

    fn instance(style: &ParsedStyle) -> Self::Instance;

    /// Location and bytes of the kind-specific field `attribute` maps to, if any.
    fn field(attribute: StyleAttribute, style: &ParsedStyle) -> Option<(u32, Vec<u8>)>;
}

pub(crate) fn instance_records<M: InstancedMesh>(object: &DisplayObject) -> InstanceRecords {
    InstanceRecords {
        common: bytemuck::bytes_of(&CommonInstance::from_object(object)).to_vec(),
        specific: bytemuck::bytes_of(&M::instance(&object.style)).to_vec(),
    }
}

/// Shared quad plus one common and one kind-specific record per object, in order.
pub(crate) fn build_instanced<M: InstancedMesh>(
    objects: &[&DisplayObject],
) -> Result<Geometry, GeometryError> {
    let mut common = Vec::with_capacity(objects.len() * CommonInstance::STRIDE as usize);
    let mut specific =
        Vec::with_capacity(objects.len() * std::mem::size_of::<M::Instance>());
    for object in objects {
        let records = instance_records::<M>(object);
        common.extend_from_slice(&records.common);
        specific.extend_from_slice(&records.specific);
    }

    let mut geometry = Geometry::new();
    geometry.set_index_buffer(QUAD_INDICES.to_vec());
    geometry.set_vertex_buffer(VertexBufferData {
        buffer_index: COMMON_BUFFER_INDEX,
        byte_stride: CommonInstance::STRIDE,
        frequency: VertexBufferFrequency::PerInstance,
        attributes: CommonInstance::attributes(),
        data: common,
    })?;
    geometry.set_vertex_buffer(VertexBufferData {
        buffer_index: VERTEX_BUFFER_INDEX,
        byte_stride: 8,
        frequency: VertexBufferFrequency::PerVertex,
        attributes: vec![VertexAttribute {
            format: Format::F32_RG,
            byte_offset: 0,
            shader_location: VERTEX_LOCATION,
        }],
        data: bytemuck::cast_slice(&QUAD_CORNERS).to_vec(),
    })?;
    geometry.set_vertex_buffer(VertexBufferData {
        buffer_index: KIND_BUFFER_INDEX,
        byte_stride: std::mem::size_of::<M::Instance>() as u32,
        frequency: VertexBufferFrequency::PerInstance,
        attributes: M::attributes(),
        data: specific,
    })?;
    geometry.set_instance_count(objects.len() as u32);
    Ok(geometry)
}
