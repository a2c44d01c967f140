use std::fmt;
use std::sync::Arc;

use lyon::path::Path;

use crate::color::Color;

/// What a display object is. Closed: the batching and picking tables match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Group,
    Circle,
    Ellipse,
    Rect,
    Image,
    Line,
    Polyline,
    Polygon,
    Path,
    Text,
}

/// Decoded RGBA8 pixels shared by every image that shows them.
///
/// Two sources are the same image when their ids are equal; the pixels are not compared.
#[derive(Clone)]
pub struct ImageSource {
    id: u64,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ImageSource {
    pub fn new(id: u64, width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id,
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl PartialEq for ImageSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageSource {}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Shape parameters in the object's local space.
#[derive(Debug, Clone)]
pub enum ShapeGeometry {
    Group,
    Circle {
        r: f32,
    },
    Ellipse {
        rx: f32,
        ry: f32,
    },
    Rect {
        width: f32,
        height: f32,
        radius: f32,
    },
    Image {
        width: f32,
        height: f32,
        source: ImageSource,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Polyline {
        points: Vec<[f32; 2]>,
    },
    Polygon {
        points: Vec<[f32; 2]>,
    },
    Path {
        path: Path,
    },
    Text {
        content: String,
        width: f32,
        height: f32,
    },
}

impl ShapeGeometry {
    pub fn kind(&self) -> NodeKind {
        match self {
            ShapeGeometry::Group => NodeKind::Group,
            ShapeGeometry::Circle { .. } => NodeKind::Circle,
            ShapeGeometry::Ellipse { .. } => NodeKind::Ellipse,
            ShapeGeometry::Rect { .. } => NodeKind::Rect,
            ShapeGeometry::Image { .. } => NodeKind::Image,
            ShapeGeometry::Line { .. } => NodeKind::Line,
            ShapeGeometry::Polyline { .. } => NodeKind::Polyline,
            ShapeGeometry::Polygon { .. } => NodeKind::Polygon,
            ShapeGeometry::Path { .. } => NodeKind::Path,
            ShapeGeometry::Text { .. } => NodeKind::Text,
        }
    }

    /// Width and height of the box the anchor is relative to, for shapes that have one.
    pub fn anchored_size(&self) -> Option<[f32; 2]> {
        match *self {
            ShapeGeometry::Circle { r } => Some([r * 2.0, r * 2.0]),
            ShapeGeometry::Ellipse { rx, ry } => Some([rx * 2.0, ry * 2.0]),
            ShapeGeometry::Rect { width, height, .. }
            | ShapeGeometry::Image { width, height, .. }
            | ShapeGeometry::Text { width, height, .. } => Some([width, height]),
            _ => None,
        }
    }
}

/// The resolved style of one display object.
///
/// `anchor` places the shape's box relative to the local origin: `[0, 0]` puts the top-left
/// corner there, `[0.5, 0.5]` the center.
#[derive(Debug, Clone)]
pub struct ParsedStyle {
    pub geometry: ShapeGeometry,
    pub fill: Color,
    pub stroke: Color,
    pub line_width: f32,
    /// Extra width around the stroke that counts for picking only.
    pub line_append_width: f32,
    pub opacity: f32,
    pub anchor: [f32; 2],
}

impl ParsedStyle {
    pub fn new(geometry: ShapeGeometry) -> Self {
        let anchor = match geometry {
            ShapeGeometry::Circle { .. } | ShapeGeometry::Ellipse { .. } => [0.5, 0.5],
            _ => [0.0, 0.0],
        };
        Self {
            geometry,
            fill: Color::BLACK,
            stroke: Color::TRANSPARENT,
            line_width: 0.0,
            line_append_width: 0.0,
            opacity: 1.0,
            anchor,
        }
    }

    pub fn group() -> Self {
        Self::new(ShapeGeometry::Group)
    }

    pub fn circle(r: f32) -> Self {
        Self::new(ShapeGeometry::Circle { r })
    }

    pub fn ellipse(rx: f32, ry: f32) -> Self {
        Self::new(ShapeGeometry::Ellipse { rx, ry })
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Self::rounded_rect(width, height, 0.0)
    }

    pub fn rounded_rect(width: f32, height: f32, radius: f32) -> Self {
        Self::new(ShapeGeometry::Rect {
            width,
            height,
            radius,
        })
    }

    pub fn image(width: f32, height: f32, source: ImageSource) -> Self {
        Self::new(ShapeGeometry::Image {
            width,
            height,
            source,
        })
        .with_fill(Color::WHITE)
    }

    /// Lines have no fill; they are drawn with a 1px black stroke until told otherwise.
    pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(ShapeGeometry::Line { x1, y1, x2, y2 })
            .with_fill(Color::TRANSPARENT)
            .with_stroke(Color::BLACK, 1.0)
    }

    pub fn polyline(points: Vec<[f32; 2]>) -> Self {
        Self::new(ShapeGeometry::Polyline { points })
            .with_fill(Color::TRANSPARENT)
            .with_stroke(Color::BLACK, 1.0)
    }

    pub fn polygon(points: Vec<[f32; 2]>) -> Self {
        Self::new(ShapeGeometry::Polygon { points })
    }

    pub fn path(path: Path) -> Self {
        Self::new(ShapeGeometry::Path { path })
    }

    pub fn text(content: impl Into<String>, width: f32, height: f32) -> Self {
        Self::new(ShapeGeometry::Text {
            content: content.into(),
            width,
            height,
        })
    }

    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_stroke(mut self, stroke: Color, line_width: f32) -> Self {
        self.stroke = stroke;
        self.line_width = line_width;
        self
    }

    pub fn with_line_append_width(mut self, line_append_width: f32) -> Self {
        self.line_append_width = line_append_width;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_anchor(mut self, anchor: [f32; 2]) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.geometry.kind()
    }

    pub fn has_fill(&self) -> bool {
        self.fill.is_visible()
    }

    pub fn has_stroke(&self) -> bool {
        self.stroke.is_visible() && self.line_width > 0.0
    }

    /// Distance past the shape edge that still counts as a hit.
    pub fn stroke_reach(&self) -> f32 {
        if self.has_stroke() {
            self.line_width / 2.0 + self.line_append_width
        } else {
            self.line_append_width
        }
    }

    pub fn image_source(&self) -> Option<&ImageSource> {
        match &self.geometry {
            ShapeGeometry::Image { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Which part of a display object changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleAttribute {
    Fill,
    Stroke,
    LineWidth,
    LineAppendWidth,
    Opacity,
    Anchor,
    Transform,
    Visibility,
    Capture,
    ZIndex,
    Parent,
    R,
    Rx,
    Ry,
    Width,
    Height,
    Radius,
    Img,
    Endpoints,
    Points,
    Path,
    Text,
}

impl StyleAttribute {
    /// Whether the change can move or resize the world-space bounds.
    pub fn affects_bounds(self) -> bool {
        !matches!(
            self,
            StyleAttribute::Fill
                | StyleAttribute::Stroke
                | StyleAttribute::Opacity
                | StyleAttribute::Visibility
                | StyleAttribute::Capture
                | StyleAttribute::ZIndex
                | StyleAttribute::Img
        )
    }

    /// Whether the change reorders the draw order.
    pub fn affects_order(self) -> bool {
        matches!(self, StyleAttribute::ZIndex | StyleAttribute::Parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_shapes_are_anchored_at_their_center() {
        assert_eq!(ParsedStyle::circle(4.0).anchor, [0.5, 0.5]);
        assert_eq!(ParsedStyle::ellipse(4.0, 2.0).anchor, [0.5, 0.5]);
        assert_eq!(ParsedStyle::rect(4.0, 2.0).anchor, [0.0, 0.0]);
    }

    #[test]
    fn image_sources_compare_by_id() {
        let a = ImageSource::new(7, 1, 1, vec![0u8, 0, 0, 255]);
        let b = ImageSource::new(7, 1, 1, vec![255u8, 255, 255, 255]);
        let c = ImageSource::new(8, 1, 1, vec![0u8, 0, 0, 255]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invisible_stroke_only_reaches_by_append_width() {
        let style = ParsedStyle::rect(10.0, 10.0)
            .with_stroke(Color::TRANSPARENT, 4.0)
            .with_line_append_width(1.0);
        assert_eq!(style.stroke_reach(), 1.0);

        let style = style.with_stroke(Color::BLACK, 4.0);
        assert_eq!(style.stroke_reach(), 3.0);
    }
}
