//! CPU-side geometry: vertex/index buffers mirrored to the device and procedurally
//! generated meshes.

mod buffer;
mod cube;
mod plane;
mod procedural;
mod sphere;
mod torus;

use thiserror::Error;

pub use buffer::{Geometry, VertexBufferData};
pub use cube::CubeGeometry;
pub use plane::PlaneGeometry;
pub use procedural::{
    apply_mat4_normal, apply_mat4_position, flip_y, ProceduralGeometry, Topology,
    TopologySource, NORMAL_BUFFER_INDEX, NORMAL_LOCATION, POSITION_BUFFER_INDEX,
    POSITION_LOCATION, UV_BUFFER_INDEX, UV_LOCATION,
};
pub use sphere::SphereGeometry;
pub use torus::TorusGeometry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("matrix is not invertible")]
    SingularMatrix,
    #[error("vertex buffer {buffer_index} holds {len} bytes, not a multiple of its stride {stride}")]
    MisalignedData {
        buffer_index: u32,
        len: usize,
        stride: u32,
    },
    #[error("attribute at location {shader_location} does not fit a stride of {stride} bytes")]
    AttributeOutsideStride { shader_location: u32, stride: u32 },
    #[error("no vertex buffer at index {0}")]
    MissingBuffer(u32),
    #[error("vertex buffer {buffer_index} has no attribute at location {shader_location}")]
    MissingAttribute {
        buffer_index: u32,
        shader_location: u32,
    },
    #[error("record {record_index} is out of range for vertex buffer {buffer_index} with {records} records")]
    RecordOutOfRange {
        buffer_index: u32,
        record_index: usize,
        records: usize,
    },
    #[error("shape cannot be tessellated: {0}")]
    Tessellation(String),
}
