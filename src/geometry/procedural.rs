use super::{Geometry, GeometryError, VertexBufferData};
use crate::platform::{Format, VertexAttribute, VertexBufferFrequency};
use crate::util::{transform_affine_point, transpose, Mat4};

pub const POSITION_BUFFER_INDEX: u32 = 0;
pub const NORMAL_BUFFER_INDEX: u32 = 1;
pub const UV_BUFFER_INDEX: u32 = 2;

pub const POSITION_LOCATION: u32 = 0;
pub const NORMAL_LOCATION: u32 = 1;
pub const UV_LOCATION: u32 = 2;

/// Raw output of a shape generator. Every attribute array holds one entry per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Topology {
    pub indices: Vec<u32>,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub uv1s: Vec<f32>,
}

impl Topology {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Appends a `(grid_x + 1) x (grid_y + 1)` vertex grid and its two triangles per cell.
    ///
    /// `vertex(ix, iy)` returns the position and normal of one grid vertex; the UV is derived
    /// from the grid coordinates.
    pub(crate) fn push_grid(
        &mut self,
        grid_x: u32,
        grid_y: u32,
        mut vertex: impl FnMut(u32, u32) -> ([f32; 3], [f32; 3]),
    ) {
        let offset = self.vertex_count() as u32;
        for iy in 0..=grid_y {
            for ix in 0..=grid_x {
                let (position, normal) = vertex(ix, iy);
                self.positions.extend_from_slice(&position);
                self.normals.extend_from_slice(&normal);
                let uv = [ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32];
                self.uvs.extend_from_slice(&uv);
                self.uv1s.extend_from_slice(&uv);
            }
        }

        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = offset + ix + (grid_x + 1) * iy;
                let b = offset + ix + (grid_x + 1) * (iy + 1);
                let c = offset + (ix + 1) + (grid_x + 1) * (iy + 1);
                let d = offset + (ix + 1) + (grid_x + 1) * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }
}

/// A shape that can describe its own topology.
///
/// `create_topology` must be deterministic: equal parameters give equal output.
pub trait TopologySource {
    fn create_topology(&self) -> Topology;
}

/// Scale `(1, -1, 1)`, baked into every built geometry.
pub fn flip_y() -> Mat4 {
    Mat4::scale(1.0, -1.0, 1.0)
}

/// Transforms xyz triplets in place with `w = 1`.
pub fn apply_mat4_position(matrix: &Mat4, positions: &mut [f32]) {
    for position in positions.chunks_exact_mut(3) {
        let transformed = transform_affine_point(matrix, position[0], position[1], position[2]);
        position.copy_from_slice(&[transformed.x, transformed.y, transformed.z]);
    }
}

/// Transforms normals in place by the inverse-transpose of `matrix`.
///
/// Normals are not renormalized, so applying a matrix and then its inverse restores them.
pub fn apply_mat4_normal(matrix: &Mat4, normals: &mut [f32]) -> Result<(), GeometryError> {
    let inverse = matrix.inverse().ok_or(GeometryError::SingularMatrix)?;
    let normal_matrix = transpose(&inverse);
    for normal in normals.chunks_exact_mut(3) {
        let transformed = transform_affine_point(&normal_matrix, normal[0], normal[1], normal[2]);
        normal.copy_from_slice(&[transformed.x, transformed.y, transformed.z]);
    }
    Ok(())
}

/// A generated mesh with positions, normals and UVs in separate vertex buffers.
#[derive(Debug)]
pub struct ProceduralGeometry<S> {
    source: S,
    geometry: Geometry,
    positions: Vec<f32>,
    normals: Vec<f32>,
}

impl<S: TopologySource> ProceduralGeometry<S> {
    /// Creates and builds the geometry.
    pub fn new(source: S) -> Result<Self, GeometryError> {
        let mut procedural = Self {
            source,
            geometry: Geometry::new(),
            positions: Vec::new(),
            normals: Vec::new(),
        };
        procedural.build()?;
        Ok(procedural)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Swaps the shape parameters and rebuilds.
    pub fn set_source(&mut self, source: S) -> Result<(), GeometryError> {
        self.source = source;
        self.build()
    }

    /// Regenerates the topology, fills the index, position, normal and UV buffers and bakes
    /// the Y-flip into positions and normals.
    pub fn build(&mut self) -> Result<(), GeometryError> {
        let Topology {
            indices,
            positions,
            normals,
            uvs,
            ..
        } = self.source.create_topology();

        self.positions = positions;
        self.normals = normals;
        self.geometry.set_index_buffer(indices);
        self.geometry.set_instance_count(1);
        self.geometry.set_vertex_buffer(VertexBufferData {
            buffer_index: UV_BUFFER_INDEX,
            byte_stride: 8,
            frequency: VertexBufferFrequency::PerVertex,
            attributes: vec![VertexAttribute {
                format: Format::F32_RG,
                byte_offset: 0,
                shader_location: UV_LOCATION,
            }],
            data: bytemuck::cast_slice(&uvs).to_vec(),
        })?;

        self.apply_mat4(&flip_y())
    }

    /// Composes `matrix` with whatever transform the geometry already carries.
    pub fn apply_mat4(&mut self, matrix: &Mat4) -> Result<(), GeometryError> {
        apply_mat4_normal(matrix, &mut self.normals)?;
        apply_mat4_position(matrix, &mut self.positions);
        self.write_position_and_normal()
    }

    fn write_position_and_normal(&mut self) -> Result<(), GeometryError> {
        self.geometry.set_vertex_buffer(VertexBufferData {
            buffer_index: POSITION_BUFFER_INDEX,
            byte_stride: 12,
            frequency: VertexBufferFrequency::PerVertex,
            attributes: vec![VertexAttribute {
                format: Format::F32_RGB,
                byte_offset: 0,
                shader_location: POSITION_LOCATION,
            }],
            data: bytemuck::cast_slice(&self.positions).to_vec(),
        })?;
        self.geometry.set_vertex_buffer(VertexBufferData {
            buffer_index: NORMAL_BUFFER_INDEX,
            byte_stride: 12,
            frequency: VertexBufferFrequency::PerVertex,
            attributes: vec![VertexAttribute {
                format: Format::F32_RGB,
                byte_offset: 0,
                shader_location: NORMAL_LOCATION,
            }],
            data: bytemuck::cast_slice(&self.normals).to_vec(),
        })
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    /// Axis-aligned bounds of the transformed positions as `(min, max)`.
    pub fn bounding_box(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut chunks = self.positions.chunks_exact(3);
        let first = chunks.next()?;
        let mut min = [first[0], first[1], first[2]];
        let mut max = min;
        for position in chunks {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }
        Some((min, max))
    }
}
