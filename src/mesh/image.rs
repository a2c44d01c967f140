use super::instanced::InstancedMesh;
use super::KIND_LOCATION_START;
use crate::platform::{Format, VertexAttribute};
use crate::scene::{ParsedStyle, StyleAttribute};

const SIZE_LOCATION: u32 = KIND_LOCATION_START;
const ANCHOR_LOCATION: u32 = KIND_LOCATION_START + 1;

/// Name of the texture uniform images sample.
pub(crate) const MAP_UNIFORM: &str = "u_Map";

/// Textured quads sharing one image source per batch.
pub(crate) struct ImageMesh;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ImageInstance {
    size: [f32; 2],
    anchor: [f32; 2],
}

fn size(style: &ParsedStyle) -> [f32; 2] {
    style.geometry.anchored_size().unwrap_or_default()
}

impl InstancedMesh for ImageMesh {
    type Instance = ImageInstance;

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
        ]
    }

    fn instance(style: &ParsedStyle) -> ImageInstance {
        ImageInstance {
            size: size(style),
            anchor: style.anchor,
        }
    }

    fn field(attribute: StyleAttribute, style: &ParsedStyle) -> Option<(u32, Vec<u8>)> {
        match attribute {
            StyleAttribute::Width | StyleAttribute::Height => {
                Some((SIZE_LOCATION, bytemuck::bytes_of(&size(style)).to_vec()))
            }
            StyleAttribute::Anchor => {
                Some((ANCHOR_LOCATION, bytemuck::bytes_of(&style.anchor).to_vec()))
            }
            _ => None,
        }
    }
}
