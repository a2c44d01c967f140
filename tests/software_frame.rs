//! Whole frames on the in-memory backend.
use tessera::platform::{Format, SoftwareDevice};
use tessera::{Color, DisplayObject, ParsedStyle, RenderError, Renderer, RendererConfig};
use tessera_test_scenes::{build_main_scene, CANVAS_HEIGHT, CANVAS_WIDTH};

fn headless(config: RendererConfig) -> Renderer<SoftwareDevice> {
    Renderer::headless(CANVAS_WIDTH, CANVAS_HEIGHT, config)
}

#[test]
fn empty_scene_still_clears_the_target() {
    let mut renderer = headless(RendererConfig::default());
    let stats = renderer.render().unwrap();

    assert_eq!(stats.frame, 1);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(renderer.device().stats().passes, 1);
    assert!(renderer.output_texture().is_some());
}

#[test]
fn main_scene_draws_one_call_per_batch() {
    let mut renderer = headless(RendererConfig::default());
    build_main_scene(&mut renderer);
    let stats = renderer.render().unwrap();

    // Batches follow the draw order: the first four sdf shapes, the line, one batch per
    // polyline, polygon and path, the image, then the remaining sdf shapes. Text is not
    // drawn and the hidden rect is culled.
    assert_eq!(stats.batches, 7);
    assert_eq!(stats.draw_calls, 7);
    assert_eq!(stats.instances, 19);
    assert_eq!(stats.rebuilt_batches, 7);
    assert_eq!(renderer.device().stats().draw_calls, 7);
}

#[test]
fn unchanged_scene_uploads_nothing() {
    let mut renderer = headless(RendererConfig::default());
    build_main_scene(&mut renderer);
    renderer.render().unwrap();

    let stats = renderer.render().unwrap();
    assert_eq!(stats.events, 0);
    assert_eq!(stats.rebuilt_batches, 0);
    assert_eq!(stats.uploaded_batches, 0);
    assert_eq!(stats.draw_calls, 7);
}

#[test]
fn clear_color_reaches_the_pass() {
    let mut renderer = headless(RendererConfig::default().with_clear_color(Color::WHITE));
    renderer.render().unwrap();

    let target = renderer.render_targets().iter().next().unwrap().attachment();
    assert_eq!(
        renderer.device().last_clear_color(target),
        Some([1.0, 1.0, 1.0, 1.0])
    );
}

#[test]
fn msaa_frame_resolves_into_a_single_sample_texture() {
    let mut renderer = headless(RendererConfig::default().with_msaa_samples(2));
    assert_eq!(renderer.msaa_sample_count(), 4);
    build_main_scene(&mut renderer);
    renderer.render().unwrap();

    let mut sample_counts: Vec<u32> = renderer
        .render_targets()
        .iter()
        .map(|target| target.description().sample_count)
        .collect();
    sample_counts.sort();
    assert_eq!(sample_counts, vec![1, 4]);

    let output = renderer.output_texture().unwrap();
    let resolve = renderer
        .render_targets()
        .iter()
        .find(|target| target.description().sample_count == 1)
        .unwrap();
    assert_eq!(resolve.texture(), Some(output));
}

#[test]
fn depth_attachment_is_pooled_with_the_color_target() {
    let config = RendererConfig::default().with_depth_format(Format::D24_S8);
    let mut renderer = headless(config);
    build_main_scene(&mut renderer);
    renderer.render().unwrap();
    renderer.render().unwrap();

    assert_eq!(renderer.render_targets().len(), 2);
    assert!(renderer
        .render_targets()
        .iter()
        .any(|target| target.description().pixel_format == Format::D24_S8));
}

#[test]
fn targets_are_reused_across_frames() {
    let mut renderer = headless(RendererConfig::default());
    renderer.render().unwrap();
    let first = renderer.output_texture();
    let resources = renderer.device().live_resource_count();

    renderer.render().unwrap();
    assert_eq!(renderer.output_texture(), first);
    assert_eq!(renderer.device().live_resource_count(), resources);
    assert_eq!(renderer.render_targets().len(), 1);
}

#[test]
fn resize_evicts_stale_targets_after_retention() {
    let config = RendererConfig::default().with_target_retention_frames(2);
    let mut renderer = Renderer::headless(100, 100, config);
    renderer.render().unwrap();

    renderer.resize(50, 50);
    assert_eq!(renderer.render().unwrap().evicted_targets, 0);
    assert_eq!(renderer.render_targets().len(), 2);

    assert_eq!(renderer.render().unwrap().evicted_targets, 1);
    assert_eq!(renderer.render_targets().len(), 1);
    let remaining = renderer.render_targets().iter().next().unwrap();
    assert_eq!(remaining.description().width, 50);
}

#[test]
fn empty_viewport_is_an_error() {
    let mut renderer = Renderer::headless(0, 100, RendererConfig::default());
    assert_eq!(
        renderer.render(),
        Err(RenderError::EmptyViewport {
            width: 0,
            height: 100
        })
    );
}

#[test]
fn destroy_releases_every_device_resource() {
    let mut renderer = headless(RendererConfig::default());
    build_main_scene(&mut renderer);
    renderer.render().unwrap();
    assert!(renderer.device().live_resource_count() > 0);

    renderer.destroy();
    assert_eq!(renderer.device().live_resource_count(), 0);
    assert_eq!(renderer.device().allocated_bytes(), 0);

    let stats = renderer.render().unwrap();
    assert_eq!(stats.draw_calls, 7);
}

#[test]
fn switching_msaa_rebuilds_pipelines() {
    let mut renderer = headless(RendererConfig::default());
    renderer.add_object(DisplayObject::new(ParsedStyle::circle(10.0)).at(20.0, 20.0));
    renderer.render().unwrap();
    assert_eq!(renderer.pipelines().pipeline_count(), 1);

    renderer.set_msaa_samples(4);
    assert_eq!(renderer.pipelines().pipeline_count(), 0);
    renderer.render().unwrap();
    assert_eq!(renderer.pipelines().pipeline_count(), 1);
    assert_eq!(renderer.pipelines().program_count(), 1);
}

#[test]
fn frame_survives_an_object_removed_before_it_was_drawn() {
    let mut renderer = headless(RendererConfig::default());
    let kept = renderer.add_object(DisplayObject::new(ParsedStyle::circle(10.0)));
    let dropped = renderer.add_object(DisplayObject::new(ParsedStyle::circle(10.0)));
    renderer.remove_object(dropped);

    let stats = renderer.render().unwrap();
    assert_eq!(stats.instances, 1);
    assert!(renderer.batches().batch_of(kept).is_some());
    assert!(renderer.batches().batch_of(dropped).is_none());
}
