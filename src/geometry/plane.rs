use super::{Topology, TopologySource};

/// A flat grid in the XZ plane facing +Y, centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    pub width: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub depth_segments: u32,
}

impl Default for PlaneGeometry {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1, 1)
    }
}

impl PlaneGeometry {
    pub fn new(width: f32, depth: f32, width_segments: u32, depth_segments: u32) -> Self {
        Self {
            width,
            depth,
            width_segments: width_segments.max(1),
            depth_segments: depth_segments.max(1),
        }
    }
}

impl TopologySource for PlaneGeometry {
    fn create_topology(&self) -> Topology {
        let mut topology = Topology::default();
        let segment_width = self.width / self.width_segments as f32;
        let segment_depth = self.depth / self.depth_segments as f32;
        let half_width = self.width / 2.0;
        let half_depth = self.depth / 2.0;

        topology.push_grid(self.width_segments, self.depth_segments, |ix, iz| {
            let x = ix as f32 * segment_width - half_width;
            let z = iz as f32 * segment_depth - half_depth;
            ([x, 0.0, z], [0.0, 1.0, 0.0])
        });
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_one_vertex_more_than_segments_per_axis() {
        let topology = PlaneGeometry::new(2.0, 4.0, 2, 3).create_topology();
        assert_eq!(topology.vertex_count(), 3 * 4);
        assert_eq!(topology.indices.len(), 2 * 3 * 6);
        assert_eq!(topology.uvs.len(), 2 * topology.vertex_count());
        assert!(topology
            .indices
            .iter()
            .all(|&index| (index as usize) < topology.vertex_count()));
    }

    #[test]
    fn corners_span_the_requested_size() {
        let topology = PlaneGeometry::new(2.0, 4.0, 1, 1).create_topology();
        assert_eq!(&topology.positions[..3], &[-1.0, 0.0, -2.0]);
        assert_eq!(&topology.positions[9..], &[1.0, 0.0, 2.0]);
    }
}
