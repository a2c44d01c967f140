use tessera::lyon::math::point;
use tessera::lyon::path::Path;
use tessera::platform::Device;
use tessera::scene::ImageSource;
use tessera::{Color, DisplayObject, EntityId, Mat4, ParsedStyle, Renderer};

use crate::expectations::PickExpectation;

// ── Grid layout constants ────────────────────────────────────────────────────

const TILE_SIZE: u32 = 80;
const COLUMNS: u32 = 6;
const ROWS: u32 = 3;

pub const CANVAS_WIDTH: u32 = TILE_SIZE * COLUMNS;
pub const CANVAS_HEIGHT: u32 = TILE_SIZE * ROWS;

const CHECKERBOARD_IMAGE_ID: u64 = 100;

/// Returns the pixel origin (top-left corner) of tile number `n` (1-based).
fn tile_origin(tile_number: u32) -> (f32, f32) {
    let index = tile_number - 1;
    let column = index % COLUMNS;
    let row = index / COLUMNS;
    ((column * TILE_SIZE) as f32, (row * TILE_SIZE) as f32)
}

/// Rotation about the z axis, as a row-vector matrix.
fn rotation_z(radians: f32) -> Mat4 {
    let (sin, cos) = radians.sin_cos();
    Mat4::new(
        cos, sin, 0.0, 0.0, //
        -sin, cos, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

fn checkerboard() -> ImageSource {
    let mut pixels = Vec::with_capacity(4 * 4 * 4);
    for index in 0..16 {
        let value: u8 = if (index + index / 4) % 2 == 0 { 255 } else { 0 };
        pixels.extend_from_slice(&[value, value, value, 255]);
    }
    ImageSource::new(CHECKERBOARD_IMAGE_ID, 4, 4, pixels)
}

/// A built scene: the named objects and the picks expected against them.
#[derive(Default)]
pub struct TestScene {
    pub entities: Vec<(&'static str, EntityId)>,
    pub expectations: Vec<PickExpectation>,
}

impl TestScene {
    pub fn entity(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, entity)| *entity)
    }

    pub fn name_of(&self, entity: EntityId) -> Option<&'static str> {
        self.entities
            .iter()
            .find(|(_, entry)| *entry == entity)
            .map(|(name, _)| *name)
    }

    fn add<D: Device>(
        &mut self,
        renderer: &mut Renderer<D>,
        name: &'static str,
        object: DisplayObject,
    ) -> EntityId {
        let entity = renderer.add_object(object);
        self.entities.push((name, entity));
        entity
    }

    /// Expects `name` on top at tile-relative `(x, y)`.
    fn expect_hit(&mut self, tile: u32, x: f32, y: f32, name: &'static str, label: &'static str) {
        let (ox, oy) = tile_origin(tile);
        self.expectations
            .push(PickExpectation::hit(ox + x, oy + y, name, label));
    }

    fn expect_miss(&mut self, tile: u32, x: f32, y: f32, label: &'static str) {
        let (ox, oy) = tile_origin(tile);
        self.expectations
            .push(PickExpectation::miss(ox + x, oy + y, label));
    }
}

/// Builds the entire main test scene on the given renderer and returns the named objects
/// with the picks expected against them.
pub fn build_main_scene<D: Device>(renderer: &mut Renderer<D>) -> TestScene {
    let mut scene = TestScene::default();

    tile_01_circle(renderer, &mut scene);
    tile_02_ellipse(renderer, &mut scene);
    tile_03_rect(renderer, &mut scene);
    tile_04_rounded_rect(renderer, &mut scene);
    tile_05_line(renderer, &mut scene);
    tile_06_polyline(renderer, &mut scene);
    tile_07_polygon(renderer, &mut scene);
    tile_08_path(renderer, &mut scene);
    tile_09_image(renderer, &mut scene);
    tile_10_siblings_overlap(renderer, &mut scene);
    tile_11_z_index(renderer, &mut scene);
    tile_12_hidden(renderer, &mut scene);
    tile_13_non_capturing_cover(renderer, &mut scene);
    tile_14_rotated_rect(renderer, &mut scene);
    tile_15_stroked_ring(renderer, &mut scene);
    tile_16_text(renderer, &mut scene);
    tile_17_scaled_circle(renderer, &mut scene);
    tile_18_shape_at_tile_edge(renderer, &mut scene);

    scene
}

fn at_tile(tile: u32, style: ParsedStyle, x: f32, y: f32) -> DisplayObject {
    let (ox, oy) = tile_origin(tile);
    DisplayObject::new(style).at(ox + x, oy + y)
}

fn tile_01_circle<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::circle(25.0).with_fill(Color::rgb(220, 40, 40));
    scene.add(renderer, "circle", at_tile(1, style, 40.0, 40.0));
    scene.expect_hit(1, 40.0, 40.0, "circle", "circle center");
    scene.expect_miss(1, 12.0, 12.0, "circle bounding box corner");
}

fn tile_02_ellipse<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::ellipse(30.0, 15.0).with_fill(Color::rgb(40, 160, 40));
    scene.add(renderer, "ellipse", at_tile(2, style, 40.0, 40.0));
    scene.expect_hit(2, 65.0, 40.0, "ellipse", "ellipse along major axis");
    scene.expect_miss(2, 40.0, 20.0, "ellipse above minor axis");
}

fn tile_03_rect<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::rect(50.0, 50.0).with_fill(Color::rgb(40, 40, 220));
    scene.add(renderer, "rect", at_tile(3, style, 15.0, 15.0));
    scene.expect_hit(3, 20.0, 20.0, "rect", "rect near top-left");
    scene.expect_miss(3, 70.0, 70.0, "rect outside");
}

fn tile_04_rounded_rect<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::rounded_rect(50.0, 50.0, 20.0).with_fill(Color::rgb(200, 120, 0));
    scene.add(renderer, "rounded_rect", at_tile(4, style, 15.0, 15.0));
    scene.expect_hit(4, 40.0, 40.0, "rounded_rect", "rounded rect center");
    scene.expect_miss(4, 17.0, 17.0, "rounded rect cut corner");
}

fn tile_05_line<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::line(10.0, 40.0, 70.0, 40.0).with_stroke(Color::BLACK, 4.0);
    scene.add(renderer, "line", at_tile(5, style, 0.0, 0.0));
    scene.expect_hit(5, 40.0, 41.0, "line", "line within stroke");
    scene.expect_miss(5, 40.0, 50.0, "line beyond stroke");
}

fn tile_06_polyline<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::polyline(vec![[10.0, 70.0], [40.0, 10.0], [70.0, 70.0]])
        .with_stroke(Color::BLACK, 4.0);
    scene.add(renderer, "polyline", at_tile(6, style, 0.0, 0.0));
    scene.expect_hit(6, 25.0, 40.0, "polyline", "polyline on first segment");
    scene.expect_miss(6, 40.0, 60.0, "polyline is not filled");
}

fn tile_07_polygon<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::polygon(vec![[10.0, 70.0], [40.0, 10.0], [70.0, 70.0]])
        .with_fill(Color::rgb(120, 0, 160));
    scene.add(renderer, "polygon", at_tile(7, style, 0.0, 0.0));
    scene.expect_hit(7, 40.0, 50.0, "polygon", "polygon inside");
    scene.expect_miss(7, 12.0, 12.0, "polygon outside");
}

fn tile_08_path<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let mut builder = Path::builder();
    builder.begin(point(10.0, 10.0));
    builder.quadratic_bezier_to(point(40.0, -10.0), point(70.0, 10.0));
    builder.line_to(point(70.0, 70.0));
    builder.line_to(point(10.0, 70.0));
    builder.end(true);
    let style = ParsedStyle::path(builder.build()).with_fill(Color::rgb(0, 140, 140));
    scene.add(renderer, "path", at_tile(8, style, 0.0, 0.0));
    scene.expect_hit(8, 40.0, 40.0, "path", "path inside");
    scene.expect_miss(8, 75.0, 40.0, "path right of outline");
}

fn tile_09_image<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::image(60.0, 60.0, checkerboard());
    scene.add(renderer, "image", at_tile(9, style, 10.0, 10.0));
    scene.expect_hit(9, 40.0, 40.0, "image", "image center");
    scene.expect_miss(9, 75.0, 75.0, "image outside");
}

fn tile_10_siblings_overlap<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let back = ParsedStyle::rect(50.0, 50.0).with_fill(Color::rgb(255, 0, 0));
    let front = ParsedStyle::rect(50.0, 50.0).with_fill(Color::rgb(0, 0, 255));
    scene.add(renderer, "overlap_back", at_tile(10, back, 5.0, 5.0));
    scene.add(renderer, "overlap_front", at_tile(10, front, 25.0, 25.0));
    scene.expect_hit(10, 40.0, 40.0, "overlap_front", "later sibling wins the overlap");
    scene.expect_hit(10, 10.0, 10.0, "overlap_back", "earlier sibling outside the overlap");
}

fn tile_11_z_index<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let raised = ParsedStyle::rect(50.0, 50.0).with_fill(Color::rgb(255, 0, 0));
    let flat = ParsedStyle::rect(50.0, 50.0).with_fill(Color::rgb(0, 0, 255));
    scene.add(
        renderer,
        "z_raised",
        at_tile(11, raised, 5.0, 5.0).with_z_index(1),
    );
    scene.add(renderer, "z_flat", at_tile(11, flat, 25.0, 25.0));
    scene.expect_hit(11, 40.0, 40.0, "z_raised", "higher z-index wins over later sibling");
}

fn tile_12_hidden<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::rect(60.0, 60.0);
    scene.add(renderer, "hidden", at_tile(12, style, 10.0, 10.0).with_visible(false));
    scene.expect_miss(12, 40.0, 40.0, "hidden objects are not pickable");
}

fn tile_13_non_capturing_cover<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let target = ParsedStyle::circle(25.0).with_fill(Color::rgb(0, 200, 0));
    let cover = ParsedStyle::rect(70.0, 70.0).with_fill(Color::rgba(255, 255, 255, 128));
    scene.add(renderer, "covered_circle", at_tile(13, target, 40.0, 40.0));
    scene.add(
        renderer,
        "cover",
        at_tile(13, cover, 5.0, 5.0).with_capture(false),
    );
    scene.expect_hit(13, 40.0, 40.0, "covered_circle", "non-capturing cover is skipped");
}

fn tile_14_rotated_rect<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let (ox, oy) = tile_origin(14);
    let style = ParsedStyle::rect(60.0, 10.0).with_fill(Color::rgb(90, 90, 90));
    let transform = rotation_z(std::f32::consts::FRAC_PI_4)
        .then(&Mat4::translation(ox + 10.0, oy + 10.0, 0.0));
    scene.add(
        renderer,
        "rotated_rect",
        DisplayObject::new(style).with_transform(transform),
    );
    scene.expect_hit(14, 27.7, 34.7, "rotated_rect", "rotated rect along its diagonal");
    scene.expect_miss(14, 50.0, 15.0, "rotated rect bounding box only");
}

fn tile_15_stroked_ring<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::circle(20.0)
        .with_fill(Color::TRANSPARENT)
        .with_stroke(Color::BLACK, 6.0);
    scene.add(renderer, "ring", at_tile(15, style, 40.0, 40.0));
    scene.expect_hit(15, 62.0, 40.0, "ring", "ring stroke outside the radius");
    scene.expect_miss(15, 40.0, 40.0, "ring has no fill");
}

fn tile_16_text<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::text("tessera", 50.0, 20.0);
    scene.add(renderer, "text", at_tile(16, style, 15.0, 30.0));
    scene.expect_hit(16, 20.0, 35.0, "text", "text picks by its box");
    scene.expect_miss(16, 20.0, 60.0, "text below its box");
}

fn tile_17_scaled_circle<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let (ox, oy) = tile_origin(17);
    let style = ParsedStyle::circle(10.0).with_fill(Color::rgb(250, 200, 0));
    let transform =
        Mat4::scale(3.0, 3.0, 1.0).then(&Mat4::translation(ox + 40.0, oy + 40.0, 0.0));
    scene.add(
        renderer,
        "scaled_circle",
        DisplayObject::new(style).with_transform(transform),
    );
    scene.expect_hit(17, 65.0, 40.0, "scaled_circle", "scaled circle beyond its local radius");
    scene.expect_miss(17, 75.0, 75.0, "scaled circle corner");
}

fn tile_18_shape_at_tile_edge<D: Device>(renderer: &mut Renderer<D>, scene: &mut TestScene) {
    let style = ParsedStyle::rect(20.0, 20.0);
    scene.add(renderer, "edge_rect", at_tile(18, style, 0.0, 0.0));
    scene.expect_hit(18, 0.0, 0.0, "edge_rect", "rect corner is inclusive");
    scene.expect_hit(18, 20.0, 20.0, "edge_rect", "far rect corner is inclusive");
    scene.expect_miss(18, 21.0, 21.0, "just outside the rect");
}

/// Adds `columns * rows` circles of identical style, all mergeable into one batch.
pub fn build_instanced_grid<D: Device>(
    renderer: &mut Renderer<D>,
    columns: u32,
    rows: u32,
) -> Vec<EntityId> {
    let mut entities = Vec::with_capacity((columns * rows) as usize);
    for row in 0..rows {
        for column in 0..columns {
            let style = ParsedStyle::circle(4.0).with_fill(Color::rgb(30, 30, 30));
            let object = DisplayObject::new(style).at(column as f32 * 10.0, row as f32 * 10.0);
            entities.push(renderer.add_object(object));
        }
    }
    entities
}
