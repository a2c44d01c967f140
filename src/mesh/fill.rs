use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lyon::path::{FillRule, Path, PathEvent};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor,
    StrokeOptions, StrokeTessellator, StrokeVertex, StrokeVertexConstructor, VertexBuffers,
};
use tracing::trace;

use super::instanced::CommonInstance;
use super::{COMMON_BUFFER_INDEX, VERTEX_BUFFER_INDEX, VERTEX_LOCATION};
use crate::cache::{OutlineBuffers, OutlineCache};
use crate::geometry::{Geometry, GeometryError, VertexBufferData};
use crate::picking::generate_path;
use crate::platform::{Format, VertexAttribute, VertexBufferFrequency};
use crate::scene::{DisplayObject, ParsedStyle, ShapeGeometry};

/// Tessellated vertex of a polygon, polyline or path. `is_stroke` is 1 for vertices of the
/// stroke outline so the shader picks the stroke color for them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FillMeshVertex {
    pub(crate) position: [f32; 2],
    pub(crate) is_stroke: f32,
}

struct VertexConverter {
    is_stroke: f32,
}

impl VertexConverter {
    fn new(is_stroke: bool) -> Self {
        Self {
            is_stroke: if is_stroke { 1.0 } else { 0.0 },
        }
    }
}

impl FillVertexConstructor<FillMeshVertex> for VertexConverter {
    fn new_vertex(&mut self, vertex: FillVertex) -> FillMeshVertex {
        FillMeshVertex {
            position: vertex.position().to_array(),
            is_stroke: self.is_stroke,
        }
    }
}

impl StrokeVertexConstructor<FillMeshVertex> for VertexConverter {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> FillMeshVertex {
        FillMeshVertex {
            position: vertex.position().to_array(),
            is_stroke: self.is_stroke,
        }
    }
}

fn hash_point(point: lyon::math::Point, hasher: &mut impl Hasher) {
    point.x.to_bits().hash(hasher);
    point.y.to_bits().hash(hasher);
}

fn hash_path(path: &Path, hasher: &mut impl Hasher) {
    for event in path.iter() {
        match event {
            PathEvent::Begin { at } => hash_point(at, hasher),
            PathEvent::Line { to, .. } => hash_point(to, hasher),
            PathEvent::Quadratic { ctrl, to, .. } => {
                hash_point(ctrl, hasher);
                hash_point(to, hasher);
            }
            PathEvent::Cubic {
                ctrl1, ctrl2, to, ..
            } => {
                hash_point(ctrl1, hasher);
                hash_point(ctrl2, hasher);
                hash_point(to, hasher);
            }
            PathEvent::End { close, .. } => {
                hasher.write_u8(if close { 2 } else { 1 });
            }
        }
    }
}

/// Polygons and paths are filled; polylines only get their stroke.
fn is_filled(style: &ParsedStyle) -> bool {
    matches!(
        style.geometry,
        ShapeGeometry::Polygon { .. } | ShapeGeometry::Path { .. }
    )
}

/// Turns outline shapes into triangles, remembering recent results.
///
/// The triangles do not depend on any color: polygons and paths are always filled and the
/// stroke is tessellated whenever the line width is positive, so color changes never
/// require a new tessellation.
pub struct FillTessellation {
    fill: FillTessellator,
    stroke: StrokeTessellator,
    cache: OutlineCache,
    tolerance: f32,
}

impl FillTessellation {
    pub fn new(cache_size: NonZeroUsize, tolerance: f32) -> Self {
        Self {
            fill: FillTessellator::new(),
            stroke: StrokeTessellator::new(),
            cache: OutlineCache::new(cache_size),
            tolerance,
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Cache hits and misses since creation.
    pub fn cache_hit_rate(&self) -> (u64, u64) {
        self.cache.hit_rate()
    }

    fn cache_key(&self, style: &ParsedStyle, path: &Path) -> u64 {
        let mut hasher = ahash::AHasher::default();
        is_filled(style).hash(&mut hasher);
        hash_path(path, &mut hasher);
        style.line_width.to_bits().hash(&mut hasher);
        self.tolerance.to_bits().hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn tessellate(
        &mut self,
        style: &ParsedStyle,
    ) -> Result<OutlineBuffers, GeometryError> {
        let Some(path) = generate_path(style) else {
            return Ok(Arc::new(VertexBuffers::new()));
        };
        let cache_key = self.cache_key(style, &path);
        let Self {
            fill,
            stroke,
            cache,
            tolerance,
        } = self;
        cache.get_or_tessellate(cache_key, || {
            tessellate_outline(fill, stroke, *tolerance, style, &path)
        })
    }

    /// One common record plus the tessellated vertices of `object`.
    pub fn build_geometry(&mut self, object: &DisplayObject) -> Result<Geometry, GeometryError> {
        let buffers = self.tessellate(&object.style)?;

        let mut geometry = Geometry::new();
        geometry.set_index_buffer(buffers.indices.clone());
        geometry.set_vertex_buffer(VertexBufferData {
            buffer_index: COMMON_BUFFER_INDEX,
            byte_stride: CommonInstance::STRIDE,
            frequency: VertexBufferFrequency::PerInstance,
            attributes: CommonInstance::attributes(),
            data: bytemuck::bytes_of(&CommonInstance::from_object(object)).to_vec(),
        })?;
        geometry.set_vertex_buffer(VertexBufferData {
            buffer_index: VERTEX_BUFFER_INDEX,
            byte_stride: std::mem::size_of::<FillMeshVertex>() as u32,
            frequency: VertexBufferFrequency::PerVertex,
            attributes: vec![VertexAttribute {
                format: Format::F32_RGB,
                byte_offset: 0,
                shader_location: VERTEX_LOCATION,
            }],
            data: bytemuck::cast_slice(&buffers.vertices).to_vec(),
        })?;
        geometry.set_instance_count(1);
        Ok(geometry)
    }
}

fn tessellate_outline(
    fill: &mut FillTessellator,
    stroke: &mut StrokeTessellator,
    tolerance: f32,
    style: &ParsedStyle,
    path: &Path,
) -> Result<VertexBuffers<FillMeshVertex, u32>, GeometryError> {
    let mut buffers: VertexBuffers<FillMeshVertex, u32> = VertexBuffers::new();
    if is_filled(style) {
        let options = FillOptions::tolerance(tolerance).with_fill_rule(FillRule::NonZero);
        fill.tessellate_path(
            path,
            &options,
            &mut BuffersBuilder::new(&mut buffers, VertexConverter::new(false)),
        )
        .map_err(|error| GeometryError::Tessellation(error.to_string()))?;
    }

    if style.line_width > 0.0 {
        let mut outline: VertexBuffers<FillMeshVertex, u32> = VertexBuffers::new();
        let options = StrokeOptions::tolerance(tolerance).with_line_width(style.line_width);
        stroke
            .tessellate_path(
                path,
                &options,
                &mut BuffersBuilder::new(&mut outline, VertexConverter::new(true)),
            )
            .map_err(|error| GeometryError::Tessellation(error.to_string()))?;
        let offset = buffers.vertices.len() as u32;
        buffers.vertices.extend_from_slice(&outline.vertices);
        buffers
            .indices
            .extend(outline.indices.iter().map(|index| index + offset));
    }

    trace!(
        vertices = buffers.vertices.len(),
        indices = buffers.indices.len(),
        "tessellated outline"
    );
    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn tessellation() -> FillTessellation {
        FillTessellation::new(NonZeroUsize::new(8).unwrap(), 0.1)
    }

    fn square() -> ParsedStyle {
        ParsedStyle::polygon(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]])
    }

    #[test]
    fn polygon_without_stroke_is_two_triangles() {
        let buffers = tessellation().tessellate(&square()).unwrap();
        assert_eq!(buffers.vertices.len(), 4);
        assert_eq!(buffers.indices.len(), 6);
        assert!(buffers.vertices.iter().all(|vertex| vertex.is_stroke == 0.0));
    }

    #[test]
    fn stroke_vertices_follow_fill_vertices() {
        let style = square().with_stroke(Color::BLACK, 2.0);
        let buffers = tessellation().tessellate(&style).unwrap();
        let first_stroke = buffers
            .vertices
            .iter()
            .position(|vertex| vertex.is_stroke == 1.0)
            .unwrap();
        assert_eq!(first_stroke, 4);
        assert!(buffers
            .indices
            .iter()
            .all(|index| (*index as usize) < buffers.vertices.len()));
    }

    #[test]
    fn polylines_are_never_filled() {
        let style = ParsedStyle::polyline(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        let buffers = tessellation().tessellate(&style).unwrap();
        assert!(!buffers.vertices.is_empty());
        assert!(buffers.vertices.iter().all(|vertex| vertex.is_stroke == 1.0));
    }

    #[test]
    fn color_changes_hit_the_cache() {
        let mut tessellation = tessellation();
        tessellation.tessellate(&square()).unwrap();
        tessellation
            .tessellate(&square().with_fill(Color::WHITE))
            .unwrap();
        assert_eq!(tessellation.cached_len(), 1);
        tessellation
            .tessellate(&square().with_stroke(Color::BLACK, 1.0))
            .unwrap();
        assert_eq!(tessellation.cached_len(), 2);
        assert_eq!(tessellation.cache_hit_rate(), (1, 2));
    }

    #[test]
    fn geometry_carries_one_common_record() {
        let object = DisplayObject::new(square());
        let geometry = tessellation().build_geometry(&object).unwrap();
        assert_eq!(geometry.record_count(COMMON_BUFFER_INDEX), 1);
        assert_eq!(geometry.record_count(VERTEX_BUFFER_INDEX), 4);
        assert_eq!(geometry.index_count(), 6);
    }
}
