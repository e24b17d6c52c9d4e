//! Benchmarks for topple
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec2;
use topple::{Body, BodyOptions, Engine};

fn rect(position: DVec2, width: f64, height: f64, is_static: bool) -> Body {
    let (hw, hh) = (width / 2.0, height / 2.0);
    Body::from_vertices(
        position,
        vec![
            DVec2::new(-hw, -hh),
            DVec2::new(hw, -hh),
            DVec2::new(hw, hh),
            DVec2::new(-hw, hh),
        ],
        BodyOptions {
            is_static,
            ..BodyOptions::default()
        },
    )
    .unwrap()
}

fn world_with_grid(columns: usize, rows: usize) -> Engine {
    let mut engine = Engine::default();
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 620.0), 1600.0, 40.0, true));
    for col in 0..columns {
        for row in 0..rows {
            engine.world.add_body(rect(
                DVec2::new(100.0 + 45.0 * col as f64, 560.0 - 45.0 * row as f64),
                40.0,
                40.0,
                false,
            ));
        }
    }
    engine
}

// ============================================================================
// Step benchmarks
// ============================================================================

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    group.bench_function("single_body_60_steps", |b| {
        b.iter(|| {
            let mut engine = Engine::default();
            engine
                .world
                .add_body(rect(DVec2::new(0.0, 0.0), 40.0, 40.0, false));
            for _ in 0..60 {
                engine.step();
            }
            black_box(engine.timing.timestamp)
        });
    });

    group.bench_function("grid_64_bodies_60_steps", |b| {
        b.iter(|| {
            let mut engine = world_with_grid(8, 8);
            for _ in 0..60 {
                engine.step();
            }
            black_box(engine.pairs().len())
        });
    });

    group.bench_function("stack_10_settled_120_steps", |b| {
        b.iter(|| {
            let mut engine = Engine::default();
            engine
                .world
                .add_body(rect(DVec2::new(400.0, 540.0), 800.0, 40.0, true));
            for i in 0..10 {
                engine.world.add_body(rect(
                    DVec2::new(400.0, 500.0 - 40.0 * i as f64),
                    40.0,
                    40.0,
                    false,
                ));
            }
            for _ in 0..120 {
                engine.step();
            }
            black_box(engine.pairs().len())
        });
    });

    group.finish();
}

// ============================================================================
// Query benchmarks
// ============================================================================

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let engine = world_with_grid(8, 8);

    group.bench_function("ray_across_grid", |b| {
        b.iter(|| {
            let hits = topple::query::ray(
                engine.world.bodies(),
                black_box(DVec2::new(0.0, 450.0)),
                black_box(DVec2::new(800.0, 450.0)),
                topple::query::DEFAULT_RAY_WIDTH,
            );
            black_box(hits.len())
        });
    });

    group.bench_function("point_pick", |b| {
        b.iter(|| {
            let hits = topple::query::point(engine.world.bodies(), black_box(DVec2::new(300.0, 500.0)));
            black_box(hits.len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_step, bench_queries);
criterion_main!(benches);
