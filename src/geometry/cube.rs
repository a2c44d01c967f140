use super::{Topology, TopologySource};

/// An axis-aligned box centered at the origin, each face subdivided into a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeGeometry {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub depth_segments: u32,
}

impl Default for CubeGeometry {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// One face: which axes the grid runs along, their directions, and where the face sits.
struct Face {
    u: usize,
    v: usize,
    w: usize,
    u_dir: f32,
    v_dir: f32,
    normal: [f32; 3],
}

impl CubeGeometry {
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
            width_segments: 1,
            height_segments: 1,
            depth_segments: 1,
        }
    }

    pub fn with_segments(mut self, width: u32, height: u32, depth: u32) -> Self {
        self.width_segments = width.max(1);
        self.height_segments = height.max(1);
        self.depth_segments = depth.max(1);
        self
    }

    fn extent(&self, axis: usize) -> f32 {
        [self.width, self.height, self.depth][axis]
    }

    fn segments(&self, axis: usize) -> u32 {
        [self.width_segments, self.height_segments, self.depth_segments][axis]
    }

    fn push_face(&self, topology: &mut Topology, face: &Face) {
        let (grid_x, grid_y) = (self.segments(face.u), self.segments(face.v));
        let (width, height) = (self.extent(face.u), self.extent(face.v));
        let offset = self.extent(face.w) / 2.0 * face.normal[face.w];

        topology.push_grid(grid_x, grid_y, |ix, iy| {
            let mut position = [0.0; 3];
            position[face.u] = (ix as f32 * width / grid_x as f32 - width / 2.0) * face.u_dir;
            position[face.v] = (iy as f32 * height / grid_y as f32 - height / 2.0) * face.v_dir;
            position[face.w] = offset;
            (position, face.normal)
        });
    }
}

impl TopologySource for CubeGeometry {
    fn create_topology(&self) -> Topology {
        const FACES: [Face; 6] = [
            Face { u: 2, v: 1, w: 0, u_dir: -1.0, v_dir: -1.0, normal: [1.0, 0.0, 0.0] },
            Face { u: 2, v: 1, w: 0, u_dir: 1.0, v_dir: -1.0, normal: [-1.0, 0.0, 0.0] },
            Face { u: 0, v: 2, w: 1, u_dir: 1.0, v_dir: 1.0, normal: [0.0, 1.0, 0.0] },
            Face { u: 0, v: 2, w: 1, u_dir: 1.0, v_dir: -1.0, normal: [0.0, -1.0, 0.0] },
            Face { u: 0, v: 1, w: 2, u_dir: 1.0, v_dir: -1.0, normal: [0.0, 0.0, 1.0] },
            Face { u: 0, v: 1, w: 2, u_dir: -1.0, v_dir: -1.0, normal: [0.0, 0.0, -1.0] },
        ];

        let mut topology = Topology::default();
        for face in &FACES {
            self.push_face(&mut topology, face);
        }
        topology
    }
}
