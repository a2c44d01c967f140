use super::instanced::InstancedMesh;
use super::KIND_LOCATION_START;
use crate::platform::{Format, VertexAttribute};
use crate::scene::{ParsedStyle, ShapeGeometry, StyleAttribute};

const ENDPOINTS_LOCATION: u32 = KIND_LOCATION_START;

/// Straight stroked segments. The quad is stretched along the segment and widened by the
/// line width.
pub(crate) struct LineMesh;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LineInstance {
    endpoints: [f32; 4],
}

fn endpoints(style: &ParsedStyle) -> [f32; 4] {
    match style.geometry {
        ShapeGeometry::Line { x1, y1, x2, y2 } => [x1, y1, x2, y2],
        _ => [0.0; 4],
    }
}

impl InstancedMesh for LineMesh {
    type Instance = LineInstance;

    fn attributes() -> Vec<VertexAttribute> {
        vec![VertexAttribute {
            format: Format::F32_RGBA,
            byte_offset: 0,
            shader_location: ENDPOINTS_LOCATION,
        }]
    }

    fn instance(style: &ParsedStyle) -> LineInstance {
        LineInstance {
            endpoints: endpoints(style),
        }
    }

    fn field(attribute: StyleAttribute, style: &ParsedStyle) -> Option<(u32, Vec<u8>)> {
        match attribute {
            StyleAttribute::Endpoints => Some((
                ENDPOINTS_LOCATION,
                bytemuck::bytes_of(&endpoints(style)).to_vec(),
            )),
            _ => None,
        }
    }
}
