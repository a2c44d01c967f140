//! Incremental batch maintenance, observed through frame stats.
use tessera::scene::ImageSource;
use tessera::{Color, DisplayObject, Mat4, ParsedStyle, Renderer, RendererConfig, StyleAttribute};
use tessera_test_scenes::build_instanced_grid;

fn renderer() -> Renderer<tessera::platform::SoftwareDevice> {
    Renderer::headless(320, 240, RendererConfig::default())
}

fn image(id: u64) -> ParsedStyle {
    ParsedStyle::image(16.0, 16.0, ImageSource::new(id, 2, 2, vec![255u8; 16]))
}

#[test]
fn thousand_circles_are_one_draw_call() {
    let mut renderer = Renderer::headless(400, 250, RendererConfig::default());
    build_instanced_grid(&mut renderer, 40, 25);
    let stats = renderer.render().unwrap();

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.instances, 1000);
}

#[test]
fn color_change_is_a_patch_not_a_rebuild() {
    let mut renderer = renderer();
    let entities = build_instanced_grid(&mut renderer, 10, 10);
    renderer.render().unwrap();

    renderer
        .update_object(entities[42], StyleAttribute::Fill, |object| {
            object.style.fill = Color::rgb(255, 0, 0);
        })
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.rebuilt_batches, 0);
    assert_eq!(stats.patched_batches(), 1);
    assert_eq!(stats.instances, 100);
}

#[test]
fn geometry_change_of_a_fill_mesh_rebuilds_it() {
    let mut renderer = renderer();
    let polygon = renderer.add_object(DisplayObject::new(ParsedStyle::polygon(vec![
        [0.0, 0.0],
        [20.0, 0.0],
        [20.0, 20.0],
    ])));
    renderer.render().unwrap();

    renderer
        .update_object(polygon, StyleAttribute::Points, |object| {
            object.style = ParsedStyle::polygon(vec![[0.0, 0.0], [40.0, 0.0], [40.0, 40.0], [0.0, 40.0]]);
        })
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.rebuilt_batches, 1);
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn fill_meshes_never_share_a_batch() {
    let mut renderer = renderer();
    for offset in 0..3 {
        let x = offset as f32 * 30.0;
        renderer.add_object(DisplayObject::new(ParsedStyle::polygon(vec![
            [x, 0.0],
            [x + 20.0, 0.0],
            [x + 20.0, 20.0],
        ])));
    }
    let stats = renderer.render().unwrap();
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.draw_calls, 3);
}

#[test]
fn swapping_the_image_of_a_shared_batch_splits_it() {
    let mut renderer = renderer();
    let first = renderer.add_object(DisplayObject::new(image(1)));
    let second = renderer.add_object(DisplayObject::new(image(1)).at(20.0, 0.0));
    assert_eq!(renderer.render().unwrap().batches, 1);

    renderer
        .update_object(second, StyleAttribute::Img, |object| object.style = image(2))
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.draw_calls, 2);
    assert_ne!(
        renderer.batches().batch_of(first),
        renderer.batches().batch_of(second)
    );
    assert_eq!(renderer.textures().active_count(), 2);
}

#[test]
fn swapping_the_image_of_a_lone_object_rebinds_the_texture() {
    let mut renderer = renderer();
    let entity = renderer.add_object(DisplayObject::new(image(1)));
    renderer.render().unwrap();

    renderer
        .update_object(entity, StyleAttribute::Img, |object| object.style = image(2))
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.rebuilt_batches, 0);
    assert_eq!(stats.batches, 1);

    let batch = renderer
        .batches()
        .batch(renderer.batches().batch_of(entity).unwrap())
        .unwrap();
    assert_eq!(batch.image().map(ImageSource::id), Some(2));
    assert_eq!(renderer.textures().active_count(), 1);
    assert_eq!(renderer.textures().idle_count(), 1);
}

#[test]
fn z_index_change_reorders_the_batch() {
    let mut renderer = renderer();
    let entities = build_instanced_grid(&mut renderer, 4, 1);
    renderer.render().unwrap();

    renderer
        .update_object(entities[0], StyleAttribute::ZIndex, |object| object.z_index = 10)
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.rebuilt_batches, 1);

    let batch = renderer
        .batches()
        .batch(renderer.batches().batch_of(entities[0]).unwrap())
        .unwrap();
    assert_eq!(batch.members().last(), Some(&entities[0]));
}

#[test]
fn emptied_batch_is_destroyed_on_the_next_frame() {
    let mut renderer = renderer();
    let circle = renderer.add_object(DisplayObject::new(ParsedStyle::circle(5.0)));
    renderer.add_object(DisplayObject::new(ParsedStyle::line(0.0, 0.0, 10.0, 10.0)));
    assert_eq!(renderer.render().unwrap().batches, 2);

    renderer.remove_object(circle);
    let stats = renderer.render().unwrap();
    assert_eq!(stats.destroyed_batches, 1);
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn changing_kind_moves_the_object_to_another_batch() {
    let mut renderer = renderer();
    let entities = build_instanced_grid(&mut renderer, 2, 1);
    renderer.render().unwrap();

    renderer
        .update_object(entities[1], StyleAttribute::Img, |object| object.style = image(7))
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.batches, 2);
    assert_ne!(
        renderer.batches().batch_of(entities[0]),
        renderer.batches().batch_of(entities[1])
    );
}

#[test]
fn interleaved_kinds_split_into_runs() {
    let mut renderer = renderer();
    let square = || DisplayObject::new(ParsedStyle::rect(40.0, 40.0));
    let first = renderer.add_object(square().at(10.0, 10.0));
    let middle = renderer.add_object(DisplayObject::new(image(1)).at(20.0, 20.0));
    let last = renderer.add_object(square().at(30.0, 30.0));

    // The two rects cannot share a batch without painting one of them over the image.
    let stats = renderer.render().unwrap();
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.draw_calls, 3);
    assert_ne!(
        renderer.batches().batch_of(first),
        renderer.batches().batch_of(last)
    );
    assert!(renderer.batches().batch_of(middle).is_some());
    assert_eq!(renderer.pick([45.0, 45.0]), Some(last));

    // Moving the image to the back lets the rects merge again.
    renderer
        .update_object(middle, StyleAttribute::ZIndex, |object| object.z_index = -1)
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.batches, 2);
    assert_eq!(
        renderer.batches().batch_of(first),
        renderer.batches().batch_of(last)
    );
    assert_eq!(renderer.pick([45.0, 45.0]), Some(last));
}

#[test]
fn offscreen_objects_produce_no_instances() {
    let mut renderer = renderer();
    let shown = renderer.add_object(DisplayObject::new(ParsedStyle::circle(5.0)).at(20.0, 20.0));
    let offscreen =
        renderer.add_object(DisplayObject::new(ParsedStyle::circle(5.0)).at(1000.0, 1000.0));

    let stats = renderer.render().unwrap();
    assert_eq!(stats.instances, 1);
    assert_eq!(stats.culled, 1);
    assert!(renderer.batches().batch_of(shown).is_some());
    assert!(renderer.batches().batch_of(offscreen).is_none());

    // Panning the view over the far circle swaps which one is drawn.
    renderer.set_view(Mat4::translation(-900.0, -900.0, 0.0));
    let stats = renderer.render().unwrap();
    assert_eq!(stats.instances, 1);
    assert!(renderer.batches().batch_of(offscreen).is_some());
    assert!(renderer.batches().batch_of(shown).is_none());
}

#[test]
fn hidden_objects_are_culled_and_restored() {
    let mut renderer = renderer();
    let entities = build_instanced_grid(&mut renderer, 3, 1);
    renderer.render().unwrap();

    renderer
        .update_object(entities[1], StyleAttribute::Visibility, |object| object.visible = false)
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.instances, 2);
    assert_eq!(stats.culled, 1);

    renderer
        .update_object(entities[1], StyleAttribute::Visibility, |object| object.visible = true)
        .unwrap();
    let stats = renderer.render().unwrap();
    assert_eq!(stats.instances, 3);
    assert_eq!(stats.culled, 0);
}

#[test]
fn viewport_culling_can_be_turned_off() {
    let config = RendererConfig::default().with_viewport_culling(false);
    let mut renderer = Renderer::headless(320, 240, config);
    renderer.add_object(DisplayObject::new(ParsedStyle::circle(5.0)).at(1000.0, 1000.0));

    let stats = renderer.render().unwrap();
    assert_eq!(stats.instances, 1);
    assert_eq!(stats.culled, 0);
}
