use super::instanced::InstancedMesh;
use super::KIND_LOCATION_START;
use crate::platform::{Format, VertexAttribute};
use crate::scene::{ParsedStyle, ShapeGeometry, StyleAttribute};

const SIZE_LOCATION: u32 = KIND_LOCATION_START;
const ANCHOR_LOCATION: u32 = KIND_LOCATION_START + 1;
const SHAPE_LOCATION: u32 = KIND_LOCATION_START + 2;

const SHAPE_CIRCLE: f32 = 0.0;
const SHAPE_ELLIPSE: f32 = 1.0;
const SHAPE_RECT: f32 = 2.0;

/// Circles, ellipses and rects, shaded from a signed distance field.
pub(crate) struct SdfMesh;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct SdfInstance {
    size: [f32; 2],
    anchor: [f32; 2],
    /// Shape id, corner radius, unused, unused.
    shape: [f32; 4],
}

fn shape(style: &ParsedStyle) -> [f32; 4] {
    match style.geometry {
        ShapeGeometry::Ellipse { .. } => [SHAPE_ELLIPSE, 0.0, 0.0, 0.0],
        ShapeGeometry::Rect { radius, .. } => [SHAPE_RECT, radius, 0.0, 0.0],
        _ => [SHAPE_CIRCLE, 0.0, 0.0, 0.0],
    }
}

fn size(style: &ParsedStyle) -> [f32; 2] {
    style.geometry.anchored_size().unwrap_or_default()
}

impl InstancedMesh for SdfMesh {
    type Instance = SdfInstance;

    fn attributes() -> Vec<VertexAttribute> {
        vec![
            VertexAttribute {
                format: Format::F32_RG,
                byte_offset: 0,
                shader_location: SIZE_LOCATION,
            },
            VertexAttribute {
                format: Format::F32_RG,
                byte_offset: 8,
                shader_location: ANCHOR_LOCATION,
            },
            VertexAttribute {
                format: Format::F32_RGBA,
                byte_offset: 16,
                shader_location: SHAPE_LOCATION,
            },
        ]
    }

    fn instance(style: &ParsedStyle) -> SdfInstance {
        SdfInstance {
            size: size(style),
            anchor: style.anchor,
            shape: shape(style),
        }
    }

    fn field(attribute: StyleAttribute, style: &ParsedStyle) -> Option<(u32, Vec<u8>)> {
        match attribute {
            StyleAttribute::R
            | StyleAttribute::Rx
            | StyleAttribute::Ry
            | StyleAttribute::Width
            | StyleAttribute::Height => {
                Some((SIZE_LOCATION, bytemuck::bytes_of(&size(style)).to_vec()))
            }
            StyleAttribute::Anchor => {
                Some((ANCHOR_LOCATION, bytemuck::bytes_of(&style.anchor).to_vec()))
            }
            StyleAttribute::Radius => {
                Some((SHAPE_LOCATION, bytemuck::bytes_of(&shape(style)).to_vec()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circles_use_their_diameter() {
        let instance = SdfMesh::instance(&ParsedStyle::circle(3.0));
        assert_eq!(instance.size, [6.0, 6.0]);
        assert_eq!(instance.anchor, [0.5, 0.5]);
        assert_eq!(instance.shape[0], SHAPE_CIRCLE);
    }

    #[test]
    fn corner_radius_travels_with_the_shape_id() {
        let style = ParsedStyle::rounded_rect(10.0, 4.0, 2.0);
        let (location, bytes) = SdfMesh::field(StyleAttribute::Radius, &style).unwrap();
        assert_eq!(location, SHAPE_LOCATION);
        assert_eq!(bytes, bytemuck::bytes_of(&[SHAPE_RECT, 2.0, 0.0, 0.0]));
    }
}
