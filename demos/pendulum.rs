//! A box swinging from a world-anchored constraint.
//!
//! Run with: `cargo run --example pendulum`

use glam::DVec2;
use topple::{Body, BodyOptions, ConstraintOptions, Engine};

fn main() {
    let mut engine = Engine::default();
    let anchor = DVec2::new(200.0, 100.0);

    let bob = Body::from_vertices(
        DVec2::new(200.0, 300.0),
        vec![
            DVec2::new(-10.0, -10.0),
            DVec2::new(10.0, -10.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(-10.0, 10.0),
        ],
        BodyOptions::default(),
    )
    .expect("valid rectangle");
    let bob = engine.world.add_body(bob);

    engine
        .world
        .add_constraint(
            None,
            Some(bob),
            ConstraintOptions {
                point_a: anchor,
                length: Some(200.0),
                stiffness: Some(0.9),
                ..ConstraintOptions::default()
            },
        )
        .expect("constraint endpoints are valid");

    // Start it swinging.
    engine
        .world
        .body_mut(bob)
        .unwrap()
        .set_velocity(DVec2::new(5.0, 0.0));

    for step in 0..=400 {
        if step % 40 == 0 {
            let body = engine.world.body(bob).unwrap();
            let stretch = (body.position - anchor).length();
            println!(
                "t = {:7.1} ms  position ({:7.2}, {:7.2})  rope {:6.2}",
                engine.timing.timestamp, body.position.x, body.position.y, stretch
            );
        }
        engine.step();
    }
}
