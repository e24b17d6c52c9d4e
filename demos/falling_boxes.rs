//! Drop a column of boxes onto the ground and print how they settle.
//!
//! Run with: `cargo run --example falling_boxes`

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
    .expect("valid rectangle")
}

fn main() {
    let mut engine = Engine::default();
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 600.0), 800.0, 50.0, true));

    let mut boxes = Vec::new();
    for i in 0..5 {
        boxes.push(engine.world.add_body(rect(
            DVec2::new(390.0 + 5.0 * i as f64, 120.0 - 60.0 * i as f64),
            40.0,
            40.0,
            false,
        )));
    }

    for step in 0..=600 {
        if step % 100 == 0 {
            println!("t = {:7.1} ms", engine.timing.timestamp);
            for (i, &id) in boxes.iter().enumerate() {
                let body = engine.world.body(id).unwrap();
                println!(
                    "  box {i}: position ({:7.2}, {:7.2})  speed {:6.4}",
                    body.position.x, body.position.y, body.speed
                );
            }
        }
        engine.step();
    }

    println!(
        "done: {} cached pairs, {} bodies",
        engine.pairs().len(),
        engine.world.all_bodies().len()
    );
}
