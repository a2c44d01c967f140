use std::f32::consts::PI;

use super::{Topology, TopologySource};

/// A UV sphere centered at the origin. `phi` sweeps around Y, `theta` from the top pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereGeometry {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub phi_start: f32,
    pub phi_length: f32,
    pub theta_start: f32,
    pub theta_length: f32,
}

impl Default for SphereGeometry {
    fn default() -> Self {
        Self::new(1.0, 32, 16)
    }
}

impl SphereGeometry {
    pub fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Self {
            radius,
            width_segments: width_segments.max(3),
            height_segments: height_segments.max(2),
            phi_start: 0.0,
            phi_length: PI * 2.0,
            theta_start: 0.0,
            theta_length: PI,
        }
    }
}

impl TopologySource for SphereGeometry {
    fn create_topology(&self) -> Topology {
        let mut topology = Topology::default();
        let columns = self.width_segments + 1;

        for iy in 0..=self.height_segments {
            let v = iy as f32 / self.height_segments as f32;
            let theta = self.theta_start + v * self.theta_length;

            for ix in 0..=self.width_segments {
                let u = ix as f32 / self.width_segments as f32;
                let phi = self.phi_start + u * self.phi_length;

                let normal = [-theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
                topology.positions.extend(normal.iter().map(|n| n * self.radius));
                topology.normals.extend_from_slice(&normal);
                topology.uvs.extend_from_slice(&[u, 1.0 - v]);
                topology.uv1s.extend_from_slice(&[u, 1.0 - v]);
            }
        }

        let theta_end = self.theta_start + self.theta_length;
        for iy in 0..self.height_segments {
            for ix in 0..self.width_segments {
                let a = iy * columns + ix + 1;
                let b = iy * columns + ix;
                let c = (iy + 1) * columns + ix;
                let d = (iy + 1) * columns + ix + 1;

                // Triangles touching a pole collapse to a point; skip them.
                if iy != 0 || self.theta_start > 0.0 {
                    topology.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != self.height_segments - 1 || theta_end < PI {
                    topology.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vertex_lies_on_the_sphere() {
        let topology = SphereGeometry::new(2.5, 8, 6).create_topology();
        for position in topology.positions.chunks_exact(3) {
            let length = (position[0].powi(2) + position[1].powi(2) + position[2].powi(2)).sqrt();
            assert!((length - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn pole_rows_emit_one_triangle_per_cell() {
        let sphere = SphereGeometry::new(1.0, 8, 4);
        let topology = sphere.create_topology();
        assert_eq!(topology.vertex_count(), 9 * 5);
        // Two triangles per cell minus one for each cell on the two pole rows.
        assert_eq!(topology.indices.len(), (8 * 4 * 2 - 8 * 2) * 3);
    }

    #[test]
    fn topology_is_deterministic() {
        let sphere = SphereGeometry::default();
        assert_eq!(sphere.create_topology(), sphere.create_topology());
    }
}
