//! Integration tests for topple
//!
//! End-to-end scenarios driven through the public API: bodies settling
//! under gravity, stacks, pendulums, the pair lifecycle, sleeping and
//! deterministic replay.

use approx::assert_relative_eq;
use glam::DVec2;
use topple::{Body, BodyId, BodyOptions, ConstraintOptions, Engine, EngineOptions, DEFAULT_DELTA};

// ============================================================================
// Helpers
// ============================================================================

fn rect(position: DVec2, width: f64, height: f64, options: BodyOptions) -> Body {
    let (hw, hh) = (width / 2.0, height / 2.0);
    Body::from_vertices(
        position,
        vec![
            DVec2::new(-hw, -hh),
            DVec2::new(hw, -hh),
            DVec2::new(hw, hh),
            DVec2::new(-hw, hh),
        ],
        options,
    )
    .expect("rectangle is a valid convex ring")
}

fn static_options() -> BodyOptions {
    BodyOptions {
        is_static: true,
        ..BodyOptions::default()
    }
}

/// Run a fixed number of default-delta steps.
fn run(engine: &mut Engine, steps: usize) {
    for _ in 0..steps {
        engine.step();
    }
}

// ============================================================================
// Scenario 1 — falling box comes to rest on static ground
// ============================================================================

#[test]
fn test_falling_box_rests_on_ground() {
    let mut engine = Engine::default();
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 610.0), 800.0, 50.0, static_options()));
    let falling = engine
        .world
        .add_body(rect(DVec2::new(400.0, 200.0), 40.0, 40.0, BodyOptions::default()));

    run(&mut engine, 900);

    let body = engine.world.body(falling).unwrap();
    // Ground top edge is at y = 585; the box centre settles half its height
    // above, give or take slop-scale penetration.
    assert_relative_eq!(body.position.y, 565.0, epsilon = 1.5);
    assert!(
        body.velocity.y.abs() < 1e-3,
        "box should be at rest, velocity.y = {}",
        body.velocity.y
    );
    assert_relative_eq!(body.position.x, 400.0, epsilon = 0.5);
}

// ============================================================================
// Scenario 2 — stack stability
// ============================================================================

#[test]
fn test_stack_stays_upright() {
    let mut engine = Engine::default();
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 540.0), 800.0, 40.0, static_options()));

    let mut boxes: Vec<BodyId> = Vec::new();
    for i in 0..10 {
        let y = 500.0 - 40.0 * i as f64;
        boxes.push(
            engine
                .world
                .add_body(rect(DVec2::new(400.0, y), 40.0, 40.0, BodyOptions::default())),
        );
    }

    run(&mut engine, 1200);

    for &id in &boxes {
        let body = engine.world.body(id).unwrap();
        assert!(
            (body.position.x - 400.0).abs() < 2.0,
            "box drifted horizontally to {}",
            body.position.x
        );
    }

    // The column is still a column: each box roughly a box-height apart.
    let mut ys: Vec<f64> = boxes
        .iter()
        .map(|&id| engine.world.body(id).unwrap().position.y)
        .collect();
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for pair in ys.windows(2) {
        assert!(
            (pair[1] - pair[0]) > 30.0,
            "boxes interpenetrated: gap {}",
            pair[1] - pair[0]
        );
    }
}

// ============================================================================
// Scenario 3 — pendulum on a world-anchored constraint
// ============================================================================

#[test]
fn test_pendulum_swings_within_its_rope() {
    let mut engine = Engine::default();
    let anchor = DVec2::new(200.0, 100.0);
    let bob = engine
        .world
        .add_body(rect(DVec2::new(200.0, 300.0), 20.0, 20.0, BodyOptions::default()));
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
        .expect("constraint has a body");

    // Push the bob sideways so it actually swings.
    engine
        .world
        .body_mut(bob)
        .unwrap()
        .set_velocity(DVec2::new(4.0, 0.0));

    let mut max_excursion = 0.0f64;
    let mut max_stretch = 0.0f64;
    for _ in 0..400 {
        engine.step();
        let body = engine.world.body(bob).unwrap();
        max_excursion = max_excursion.max((body.position.x - anchor.x).abs());
        max_stretch = max_stretch.max((body.position - anchor).length());
    }

    assert!(
        max_excursion > 10.0,
        "pendulum should swing, max excursion {max_excursion}"
    );
    assert!(
        max_excursion <= 200.0,
        "bob never travels past the rope length, got {max_excursion}"
    );
    assert!(
        max_stretch < 220.0,
        "rope stretch stays bounded, got {max_stretch}"
    );
}

// ============================================================================
// Scenario 4 — pair lifecycle through approach, contact and separation
// ============================================================================

#[test]
fn test_pair_lifecycle_events() {
    let mut engine = Engine::default();
    engine.world.gravity = DVec2::ZERO;

    let mover = engine.world.add_body(rect(
        DVec2::new(0.0, 0.0),
        40.0,
        40.0,
        BodyOptions {
            friction_air: 0.0,
            ..BodyOptions::default()
        },
    ));
    engine.world.add_body(rect(
        DVec2::new(150.0, 0.0),
        40.0,
        40.0,
        BodyOptions {
            is_static: true,
            is_sensor: true,
            ..BodyOptions::default()
        },
    ));
    engine
        .world
        .body_mut(mover)
        .unwrap()
        .set_velocity(DVec2::new(6.0, 0.0));

    let mut starts = 0;
    let mut actives = 0;
    let mut ends = 0;
    let mut end_timestamp = None;

    for _ in 0..80 {
        engine.step();
        starts += engine.pairs().collision_start().len();
        actives += engine.pairs().collision_active().len();
        ends += engine.pairs().collision_end().len();
        if ends > 0 && end_timestamp.is_none() {
            end_timestamp = Some(engine.timing.timestamp);
        }

        // Contact identity stays unique within each active pair.
        for pair in engine.pairs().pairs() {
            let ids = &pair.active_contacts;
            for (i, a) in ids.iter().enumerate() {
                assert!(!ids[i + 1..].contains(a), "duplicate contact id in pair");
            }
        }
    }

    assert_eq!(starts, 1, "contact begins exactly once");
    assert!(actives >= 1, "contact stays active while overlapping");
    assert_eq!(ends, 1, "contact ends exactly once");
    assert_eq!(engine.pairs().len(), 1, "pair stays cached after separation");

    // The idle pair is evicted once it has been stale for a second.
    let end_timestamp = end_timestamp.unwrap();
    while engine.timing.timestamp < end_timestamp + 1100.0 {
        engine.step();
    }
    assert_eq!(engine.pairs().len(), 0, "idle pair evicted after a second");
}

// ============================================================================
// Scenario 5 — sleeping and force wake
// ============================================================================

#[test]
fn test_body_sleeps_at_rest_and_wakes_on_force() {
    let mut engine = Engine::new(EngineOptions {
        enable_sleeping: true,
        ..EngineOptions::default()
    });
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 540.0), 800.0, 40.0, static_options()));
    let id = engine
        .world
        .add_body(rect(DVec2::new(400.0, 460.0), 40.0, 40.0, BodyOptions::default()));

    run(&mut engine, 600);
    assert!(
        engine.world.body(id).unwrap().is_sleeping,
        "a settled box falls asleep"
    );
    let rest_y = engine.world.body(id).unwrap().position.y;

    run(&mut engine, 30);
    assert_relative_eq!(
        engine.world.body(id).unwrap().position.y,
        rest_y,
        epsilon = 1e-9
    );

    // A poke wakes it on the very next step.
    let position = engine.world.body(id).unwrap().position;
    engine
        .world
        .body_mut(id)
        .unwrap()
        .apply_force(position, DVec2::new(0.0, -0.05));
    engine.step();
    assert!(!engine.world.body(id).unwrap().is_sleeping);
}

// ============================================================================
// Scenario 6 — deterministic replay
// ============================================================================

#[test]
fn test_identical_engines_replay_identically() {
    fn build() -> (Engine, Vec<BodyId>) {
        let mut engine = Engine::default();
        engine
            .world
            .add_body(rect(DVec2::new(400.0, 540.0), 800.0, 40.0, static_options()));
        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(engine.world.add_body(rect(
                DVec2::new(380.0 + 5.0 * i as f64, 460.0 - 45.0 * i as f64),
                40.0,
                40.0,
                BodyOptions::default(),
            )));
        }
        (engine, ids)
    }

    let (mut engine_a, ids_a) = build();
    let (mut engine_b, ids_b) = build();

    // A slightly irregular delta sequence with matching corrections.
    let deltas = [
        (DEFAULT_DELTA, 1.0),
        (DEFAULT_DELTA * 0.5, 0.5),
        (DEFAULT_DELTA, 2.0),
        (DEFAULT_DELTA, 1.0),
    ];

    for step in 0..240 {
        let (delta, correction) = deltas[step % deltas.len()];
        engine_a.update(delta, correction);
        engine_b.update(delta, correction);

        for (&a, &b) in ids_a.iter().zip(&ids_b) {
            let pa = engine_a.world.body(a).unwrap().position;
            let pb = engine_b.world.body(b).unwrap().position;
            assert_eq!(pa, pb, "divergence at step {step}");
        }
    }
}

// ============================================================================
// Elastic head-on collision keeps kinetic energy
// ============================================================================

#[test]
fn test_elastic_head_on_collision_preserves_energy() {
    let mut engine = Engine::new(EngineOptions {
        velocity_iterations: 8,
        ..EngineOptions::default()
    });
    engine.world.gravity = DVec2::ZERO;

    let elastic = BodyOptions {
        restitution: 1.0,
        friction: 0.0,
        friction_static: 0.0,
        friction_air: 0.0,
        ..BodyOptions::default()
    };
    let a = engine
        .world
        .add_body(rect(DVec2::new(0.0, 0.0), 40.0, 40.0, elastic.clone()));
    let b = engine
        .world
        .add_body(rect(DVec2::new(120.0, 0.0), 40.0, 40.0, elastic));
    engine.world.body_mut(a).unwrap().set_velocity(DVec2::new(2.0, 0.0));
    engine.world.body_mut(b).unwrap().set_velocity(DVec2::new(-2.0, 0.0));

    let mass = engine.world.body(a).unwrap().mass;
    let initial_energy = mass * (2.0f64.powi(2) + 2.0f64.powi(2)) / 2.0;

    run(&mut engine, 60);

    let va = engine.world.body(a).unwrap().velocity;
    let vb = engine.world.body(b).unwrap().velocity;
    assert!(va.x < 0.0, "left box bounced back, vx = {}", va.x);
    assert!(vb.x > 0.0, "right box bounced back, vx = {}", vb.x);

    let energy = mass * (va.length_squared() + vb.length_squared()) / 2.0;
    assert!(
        (energy - initial_energy).abs() / initial_energy < 0.02,
        "kinetic energy drifted more than 2%: {energy} vs {initial_energy}"
    );
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_static_flag_matches_inverse_mass() {
    let mut engine = Engine::default();
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 540.0), 800.0, 40.0, static_options()));
    engine
        .world
        .add_body(rect(DVec2::new(400.0, 460.0), 40.0, 40.0, BodyOptions::default()));

    run(&mut engine, 120);

    for body in engine.world.bodies() {
        assert_eq!(
            body.inverse_mass == 0.0,
            body.is_static,
            "inverse_mass is zero exactly for static bodies"
        );
        assert!(
            topple::vertices::area(body.vertices(), true) > 0.0,
            "rings stay clockwise"
        );
        // Bounds track the ring plus the velocity expansion.
        let mut expected = topple::Bounds::from_vertices(body.vertices());
        if body.velocity.x > 0.0 {
            expected.max.x += body.velocity.x;
        } else {
            expected.min.x += body.velocity.x;
        }
        if body.velocity.y > 0.0 {
            expected.max.y += body.velocity.y;
        } else {
            expected.min.y += body.velocity.y;
        }
        assert_relative_eq!(body.bounds().min.x, expected.min.x, epsilon = 1e-9);
        assert_relative_eq!(body.bounds().max.y, expected.max.y, epsilon = 1e-9);
    }
}

#[test]
fn test_translate_rotate_round_trips() {
    let mut engine = Engine::default();
    let id = engine
        .world
        .add_body(rect(DVec2::new(100.0, 100.0), 40.0, 40.0, BodyOptions::default()));

    let body = engine.world.body_mut(id).unwrap();
    body.translate(DVec2::new(13.0, -7.5));
    body.translate(DVec2::new(-13.0, 7.5));
    assert_relative_eq!(body.position.x, 100.0, epsilon = 1e-9);
    assert_relative_eq!(body.position.y, 100.0, epsilon = 1e-9);

    let before: Vec<DVec2> = body.vertices().iter().map(|v| v.position).collect();
    body.rotate(0.7, Some(DVec2::new(60.0, 60.0)));
    body.rotate(-0.7, Some(DVec2::new(60.0, 60.0)));
    for (vertex, original) in body.vertices().iter().zip(&before) {
        assert_relative_eq!(vertex.position.x, original.x, epsilon = 1e-6);
        assert_relative_eq!(vertex.position.y, original.y, epsilon = 1e-6);
    }
}
