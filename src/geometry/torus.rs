use std::f32::consts::PI;

use super::{Topology, TopologySource};

/// A torus around the Y axis. `radius` reaches the tube center, `tube` is the tube radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusGeometry {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    pub arc: f32,
}

impl Default for TorusGeometry {
    fn default() -> Self {
        Self::new(1.0, 0.4, 16, 48)
    }
}

impl TorusGeometry {
    pub fn new(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        Self {
            radius,
            tube,
            radial_segments: radial_segments.max(3),
            tubular_segments: tubular_segments.max(3),
            arc: PI * 2.0,
        }
    }

    pub fn with_arc(mut self, arc: f32) -> Self {
        self.arc = arc;
        self
    }
}

impl TopologySource for TorusGeometry {
    fn create_topology(&self) -> Topology {
        let mut topology = Topology::default();

        for j in 0..=self.radial_segments {
            for i in 0..=self.tubular_segments {
                let u = i as f32 / self.tubular_segments as f32 * self.arc;
                let v = j as f32 / self.radial_segments as f32 * PI * 2.0;

                let x = (self.radius + self.tube * v.cos()) * u.cos();
                let y = self.tube * v.sin();
                let z = (self.radius + self.tube * v.cos()) * u.sin();
                topology.positions.extend_from_slice(&[x, y, z]);

                // From the tube center towards the vertex.
                topology
                    .normals
                    .extend_from_slice(&[v.cos() * u.cos(), v.sin(), v.cos() * u.sin()]);

                let uv = [
                    i as f32 / self.tubular_segments as f32,
                    j as f32 / self.radial_segments as f32,
                ];
                topology.uvs.extend_from_slice(&uv);
                topology.uv1s.extend_from_slice(&uv);
            }
        }

        let row = self.tubular_segments + 1;
        for j in 1..=self.radial_segments {
            for i in 1..=self.tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                topology.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        topology
    }
}
