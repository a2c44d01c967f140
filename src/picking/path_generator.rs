use lyon::algorithms::hit_test::hit_test_path;
use lyon::math::{point, vector, Angle, Box2D, Point};
use lyon::path::builder::BorderRadii;
use lyon::path::iterator::PathIterator;
use lyon::path::{FillRule, Path, PathEvent, Winding};

use super::hit_test::distance_to_segment;
use crate::scene::{ParsedStyle, ShapeGeometry};

/// Builds the outline of a shape in local space.
///
/// Polylines and lines come out open, everything else closed. Groups have no outline.
pub fn generate_path(style: &ParsedStyle) -> Option<Path> {
    let mut builder = Path::builder();
    let anchored_origin = |size: [f32; 2]| {
        point(-style.anchor[0] * size[0], -style.anchor[1] * size[1])
    };

    match &style.geometry {
        ShapeGeometry::Group => return None,
        ShapeGeometry::Circle { r } => {
            let size = [r * 2.0, r * 2.0];
            let center = anchored_origin(size) + vector(*r, *r);
            builder.add_circle(center, *r, Winding::Positive);
        }
        ShapeGeometry::Ellipse { rx, ry } => {
            let size = [rx * 2.0, ry * 2.0];
            let center = anchored_origin(size) + vector(*rx, *ry);
            builder.add_ellipse(center, vector(*rx, *ry), Angle::zero(), Winding::Positive);
        }
        ShapeGeometry::Rect {
            width,
            height,
            radius,
        } => {
            let min = anchored_origin([*width, *height]);
            let rect = Box2D::new(min, min + vector(*width, *height));
            if *radius > 0.0 {
                let radii = BorderRadii {
                    top_left: *radius,
                    top_right: *radius,
                    bottom_left: *radius,
                    bottom_right: *radius,
                };
                builder.add_rounded_rectangle(&rect, &radii, Winding::Positive);
            } else {
                builder.add_rectangle(&rect, Winding::Positive);
            }
        }
        ShapeGeometry::Image { width, height, .. } | ShapeGeometry::Text { width, height, .. } => {
            let min = anchored_origin([*width, *height]);
            builder.add_rectangle(&Box2D::new(min, min + vector(*width, *height)), Winding::Positive);
        }
        ShapeGeometry::Line { x1, y1, x2, y2 } => {
            builder.begin(point(*x1, *y1));
            builder.line_to(point(*x2, *y2));
            builder.end(false);
        }
        ShapeGeometry::Polyline { points } | ShapeGeometry::Polygon { points } => {
            let (first, rest) = points.split_first()?;
            builder.begin(point(first[0], first[1]));
            for p in rest {
                builder.line_to(point(p[0], p[1]));
            }
            builder.end(matches!(style.geometry, ShapeGeometry::Polygon { .. }));
        }
        ShapeGeometry::Path { path } => return Some(path.clone()),
    }
    Some(builder.build())
}

/// Whether the non-zero fill of `path` contains `position`.
pub fn is_point_in_path(path: &Path, position: Point, tolerance: f32) -> bool {
    hit_test_path(&position, path.iter(), FillRule::NonZero, tolerance)
}

/// Shortest distance from `position` to the flattened outline of `path`.
pub fn distance_to_outline(path: &Path, position: Point, tolerance: f32) -> f32 {
    let mut nearest = f32::INFINITY;
    for event in path.iter().flattened(tolerance) {
        let segment = match event {
            PathEvent::Line { from, to } => Some((from, to)),
            PathEvent::End {
                last,
                first,
                close: true,
            } => Some((last, first)),
            _ => None,
        };
        if let Some((from, to)) = segment {
            nearest = nearest.min(distance_to_segment(
                [position.x, position.y],
                [from.x, from.y],
                [to.x, to.y],
            ));
        }
    }
    nearest
}

/// Picking through the generated outline, for shapes without an analytic test.
pub(crate) fn hit_test_outline(style: &ParsedStyle, position: [f32; 2], tolerance: f32) -> bool {
    let Some(path) = generate_path(style) else {
        return false;
    };
    let position = point(position[0], position[1]);
    let closed_fill = style.has_fill() && !matches!(style.geometry, ShapeGeometry::Polyline { .. });
    if closed_fill && is_point_in_path(&path, position, tolerance) {
        return true;
    }
    let reach = style.stroke_reach();
    reach > 0.0 && distance_to_outline(&path, position, tolerance) <= reach
}
