use euclid::default::Point2D;

use super::style::{ParsedStyle, ShapeGeometry};
use crate::util::{project_point, Mat4};

/// Axis-aligned box, `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Aabb {
    pub fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self {
            min: [min[0].min(max[0]), min[1].min(max[1])],
            max: [min[0].max(max[0]), min[1].max(max[1])],
        }
    }

    /// Smallest box holding every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 2]>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, point| {
            aabb.union(&Self::new(point, point))
        }))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn expand(&self, by: f32) -> Aabb {
        Aabb::new(
            [self.min[0] - by, self.min[1] - by],
            [self.max[0] + by, self.max[1] + by],
        )
    }

    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.min[0]
            && point[0] <= self.max[0]
            && point[1] >= self.min[1]
            && point[1] <= self.max[1]
    }

    /// Whether the boxes share at least one point. Touching edges count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min[0] <= other.max[0]
            && other.min[0] <= self.max[0]
            && self.min[1] <= other.max[1]
            && other.min[1] <= self.max[1]
    }

    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            self.min,
            [self.max[0], self.min[1]],
            self.max,
            [self.min[0], self.max[1]],
        ]
    }

    /// Bounds of this box after `matrix`. `None` if a corner cannot be projected.
    pub fn transformed(&self, matrix: &Mat4) -> Option<Aabb> {
        let corners = self.corners();
        let mut projected = [[0.0; 2]; 4];
        for (out, corner) in projected.iter_mut().zip(corners) {
            let point = project_point(matrix, Point2D::new(corner[0], corner[1]))?;
            *out = [point.x, point.y];
        }
        Aabb::from_points(projected)
    }
}

/// Local-space bounds of a shape, including its stroke and picking margin.
///
/// Anchored shapes span `[-anchor * size, (1 - anchor) * size]`. The box is then grown by
/// `line_width + line_append_width` on every side. Groups have no bounds of their own.
pub fn local_bounds(style: &ParsedStyle) -> Option<Aabb> {
    let geometry_bounds = match &style.geometry {
        ShapeGeometry::Group => return None,
        ShapeGeometry::Line { x1, y1, x2, y2 } => Aabb::new([*x1, *y1], [*x2, *y2]),
        ShapeGeometry::Polyline { points } | ShapeGeometry::Polygon { points } => {
            Aabb::from_points(points.iter().copied())?
        }
        ShapeGeometry::Path { path } => {
            if path.iter().next().is_none() {
                return None;
            }
            let rect = lyon::algorithms::aabb::bounding_box(path.iter());
            Aabb::new([rect.min.x, rect.min.y], [rect.max.x, rect.max.y])
        }
        anchored => {
            let size = anchored.anchored_size()?;
            let half = [size[0] / 2.0, size[1] / 2.0];
            let center = [
                (1.0 - style.anchor[0] * 2.0) * half[0],
                (1.0 - style.anchor[1] * 2.0) * half[1],
            ];
            Aabb::new(
                [center[0] - half[0], center[1] - half[1]],
                [center[0] + half[0], center[1] + half[1]],
            )
        }
    };
    Some(geometry_bounds.expand(style.line_width + style.line_append_width))
}

/// World-space bounds: the local bounds pushed through `world_transform`.
pub fn world_bounds(style: &ParsedStyle, world_transform: &Mat4) -> Option<Aabb> {
    local_bounds(style)?.transformed(world_transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn centered_circle_spans_its_radius() {
        let bounds = local_bounds(&ParsedStyle::circle(5.0)).unwrap();
        assert_eq!(bounds, Aabb::new([-5.0, -5.0], [5.0, 5.0]));
    }

    #[test]
    fn top_left_anchored_rect_starts_at_origin() {
        let bounds = local_bounds(&ParsedStyle::rect(10.0, 4.0)).unwrap();
        assert_eq!(bounds, Aabb::new([0.0, 0.0], [10.0, 4.0]));
    }

    #[test]
    fn stroke_and_append_width_grow_the_box() {
        let style = ParsedStyle::rect(10.0, 4.0)
            .with_stroke(Color::BLACK, 2.0)
            .with_line_append_width(1.0);
        let bounds = local_bounds(&style).unwrap();
        assert_eq!(bounds, Aabb::new([-3.0, -3.0], [13.0, 7.0]));
    }

    #[test]
    fn groups_have_no_bounds() {
        assert!(local_bounds(&ParsedStyle::group()).is_none());
    }

    #[test]
    fn world_bounds_follow_translation_and_scale() {
        let matrix = Mat4::scale(2.0, 2.0, 1.0).then_translate(euclid::vec3(100.0, 50.0, 0.0));
        let bounds = world_bounds(&ParsedStyle::rect(10.0, 4.0), &matrix).unwrap();
        assert_eq!(bounds, Aabb::new([100.0, 50.0], [120.0, 58.0]));
    }

    #[test]
    fn rotation_takes_the_box_around_every_corner() {
        let matrix = Mat4::rotation(0.0, 0.0, 1.0, euclid::Angle::degrees(90.0));
        let bounds = world_bounds(&ParsedStyle::rect(10.0, 4.0), &matrix).unwrap();
        assert!((bounds.max[0] - bounds.min[0] - 4.0).abs() < 1e-4);
        assert!((bounds.max[1] - bounds.min[1] - 10.0).abs() < 1e-4);
    }
}
