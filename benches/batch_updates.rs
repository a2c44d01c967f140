//! Criterion benchmarks comparing incremental instance patches with full batch rebuilds.
//!
//! A grid of identical circles lands in one instanced batch. Each iteration either
//! recolors a small share of them (patched in place) or moves one of them in the draw
//! order (the batch is rebuilt), then renders a frame on the in-memory backend.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera::platform::SoftwareDevice;
use tessera::{Color, EntityId, Renderer, RendererConfig, StyleAttribute};
use tessera_test_scenes::build_instanced_grid;

fn grid(side: u32) -> (Renderer<SoftwareDevice>, Vec<EntityId>) {
    let mut renderer = Renderer::headless(side * 10, side * 10, RendererConfig::default());
    let entities = build_instanced_grid(&mut renderer, side, side);
    renderer.render().expect("initial frame");
    (renderer, entities)
}

fn bench_batch_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_updates");
    for &side in &[32u32, 100u32] {
        let count = side * side;

        let (mut renderer, entities) = grid(side);
        let mut shade = 0u8;
        group.bench_with_input(BenchmarkId::new("patch_1pct_fill", count), &count, |b, _| {
            b.iter(|| {
                shade = shade.wrapping_add(1);
                for entity in entities.iter().step_by(100) {
                    renderer
                        .update_object(*entity, StyleAttribute::Fill, |object| {
                            object.style.fill = Color::rgb(shade, 0, 0);
                        })
                        .expect("entity is alive");
                }
                black_box(renderer.render().expect("frame"));
            })
        });

        let (mut renderer, entities) = grid(side);
        let mut z_index = 0;
        group.bench_with_input(BenchmarkId::new("rebuild_on_reorder", count), &count, |b, _| {
            b.iter(|| {
                z_index = 1 - z_index;
                renderer
                    .update_object(entities[0], StyleAttribute::ZIndex, |object| {
                        object.z_index = z_index;
                    })
                    .expect("entity is alive");
                black_box(renderer.render().expect("frame"));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_batch_updates);
criterion_main!(benches);
