//! Engine and Step Pipeline
//!
//! The engine owns the world, the broadphase grid and the pair cache, and
//! advances the simulation one fixed stage order per step:
//!
//! 1. advance the clock; 2. sleep bookkeeping; 3. gravity; 4. integration;
//! 5. constraints; 6. broadphase; 7. narrowphase; 8. pair cache update and
//! eviction; 9. post-collision wake; 10. position solver; 11. constraints
//! again; 12. velocity solver; 13. force clearing.
//!
//! The step is synchronous and total: it never fails, never suspends, and
//! mutates only engine-owned state. Scratch buffers (the collision list)
//! are engine fields so independent engines stay reentrant and steps stay
//! allocation-steady.

use glam::DVec2;
use tracing::{debug, trace};

use crate::body::{Body, BodyId};
use crate::collision::Collision;
use crate::composite::{BodyStore, World};
use crate::constraint;
use crate::detector;
use crate::grid::{Grid, DEFAULT_BUCKET_SIZE};
use crate::pairs::PairSet;
use crate::resolver;
use crate::sleeping;

/// Default step delta: one 60 Hz frame, in milliseconds.
pub const DEFAULT_DELTA: f64 = 1000.0 / 60.0;

/// Simulation clock.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timing {
    /// Accumulated simulation time in milliseconds
    pub timestamp: f64,
    /// Global time scale; 0 freezes the simulation
    pub time_scale: f64,
}

/// Construction options for [`Engine::new`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineOptions {
    /// Position solver iterations per step
    pub position_iterations: usize,
    /// Velocity solver iterations per step
    pub velocity_iterations: usize,
    /// Constraint solver iterations per pass
    pub constraint_iterations: usize,
    /// Whether the sleeping controller runs
    pub enable_sleeping: bool,
    /// Initial time scale
    pub time_scale: f64,
    /// Broadphase cell width
    pub bucket_width: f64,
    /// Broadphase cell height
    pub bucket_height: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            position_iterations: 6,
            velocity_iterations: 4,
            constraint_iterations: 2,
            enable_sleeping: false,
            time_scale: 1.0,
            bucket_width: DEFAULT_BUCKET_SIZE,
            bucket_height: DEFAULT_BUCKET_SIZE,
        }
    }
}

/// The simulation engine.
#[derive(Debug)]
pub struct Engine {
    /// The world being simulated
    pub world: World,
    grid: Grid,
    pairs: PairSet,
    /// Simulation clock
    pub timing: Timing,
    /// Position solver iterations per step
    pub position_iterations: usize,
    /// Velocity solver iterations per step
    pub velocity_iterations: usize,
    /// Constraint solver iterations per pass
    pub constraint_iterations: usize,
    /// Whether the sleeping controller runs
    pub enable_sleeping: bool,
    collisions: Vec<Collision>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Engine {
    /// Create an engine with an empty world.
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        Self {
            world: World::new(),
            grid: Grid::new(options.bucket_width, options.bucket_height),
            pairs: PairSet::new(),
            timing: Timing {
                timestamp: 0.0,
                time_scale: options.time_scale,
            },
            position_iterations: options.position_iterations,
            velocity_iterations: options.velocity_iterations,
            constraint_iterations: options.constraint_iterations,
            enable_sleeping: options.enable_sleeping,
            collisions: Vec::new(),
        }
    }

    /// The pair cache, including this step's start/active/end sets.
    #[inline]
    #[must_use]
    pub fn pairs(&self) -> &PairSet {
        &self.pairs
    }

    /// The broadphase grid.
    #[inline]
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Remove a body from the world and sweep it out of the pair cache.
    /// The broadphase rebuilds on the next step via the world's dirty flag.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        self.pairs.remove_body(id);
        self.world.remove_body(id)
    }

    /// Drop all cached pairs and buckets; they rebuild on the next step.
    pub fn clear(&mut self) {
        self.pairs.clear();
        self.grid.clear();
        let root = self.world.root();
        self.world.mark_modified(root);
    }

    /// Advance one default 60 Hz step.
    pub fn step(&mut self) {
        self.update(DEFAULT_DELTA, 1.0);
    }

    /// Advance the simulation by `delta` milliseconds.
    ///
    /// `correction` is the Time-Corrected Verlet factor
    /// `delta / delta_prev`; pass 1.0 when stepping at a fixed delta.
    pub fn update(&mut self, delta: f64, correction: f64) {
        let time_scale = self.timing.time_scale;
        self.timing.timestamp += delta * time_scale;
        if time_scale == 0.0 {
            // Frozen: no motion, no new contacts, caches untouched.
            return;
        }

        let body_ids = self.world.all_bodies();
        let constraint_ids = self.world.all_constraints();

        if self.enable_sleeping {
            sleeping::update(&mut self.world.bodies, &body_ids, time_scale);
        }

        apply_gravity(
            &mut self.world.bodies,
            &body_ids,
            self.world.gravity,
            self.world.gravity_scale,
        );
        update_bodies(&mut self.world.bodies, &body_ids, delta, time_scale, correction);

        // First constraint pass.
        constraint::pre_solve_all(&mut self.world.bodies, &body_ids);
        for _ in 0..self.constraint_iterations {
            constraint::solve_all(
                &mut self.world.bodies,
                &mut self.world.constraints,
                &constraint_ids,
                time_scale,
            );
        }
        constraint::post_solve_all(&mut self.world.bodies, &body_ids);

        // Broadphase. Structural changes force a rebuild from scratch.
        let force_update = self.world.is_modified();
        if force_update {
            self.grid.clear();
            debug!("world modified, broadphase rebuilding");
        }
        self.grid
            .update(&mut self.world.bodies, &body_ids, &self.world.bounds, force_update);
        if force_update {
            self.world.clear_modified();
        }

        // Narrowphase over the candidate list.
        detector::collisions(
            self.grid.pairs_list(),
            &self.world.bodies,
            &self.pairs,
            &mut self.collisions,
        );

        // Pair cache bookkeeping.
        let timestamp = self.timing.timestamp;
        self.pairs
            .update(&self.collisions, &self.world.bodies, timestamp);
        self.pairs.remove_old(&self.world.bodies, timestamp);

        if self.enable_sleeping {
            sleeping::after_collisions(&mut self.world.bodies, &self.pairs, time_scale);
        }

        // Position solver.
        resolver::pre_solve_position(&mut self.world.bodies, &mut self.pairs);
        for _ in 0..self.position_iterations {
            resolver::solve_position(&mut self.world.bodies, &mut self.pairs, time_scale);
        }
        resolver::post_solve_position(&mut self.world.bodies, &body_ids);

        // Second constraint pass, over the positions the contacts settled.
        constraint::pre_solve_all(&mut self.world.bodies, &body_ids);
        for _ in 0..self.constraint_iterations {
            constraint::solve_all(
                &mut self.world.bodies,
                &mut self.world.constraints,
                &constraint_ids,
                time_scale,
            );
        }
        constraint::post_solve_all(&mut self.world.bodies, &body_ids);

        // Velocity solver.
        resolver::pre_solve_velocity(&mut self.world.bodies, &mut self.pairs);
        for _ in 0..self.velocity_iterations {
            resolver::solve_velocity(&mut self.world.bodies, &mut self.pairs, time_scale);
        }

        clear_forces(&mut self.world.bodies, &body_ids);

        trace!(
            bodies = body_ids.len(),
            pairs = self.pairs.len(),
            timestamp = self.timing.timestamp,
            "step complete"
        );
    }
}

/// Accumulate gravity as force on every dynamic awake body.
fn apply_gravity(bodies: &mut BodyStore, ids: &[BodyId], gravity: DVec2, gravity_scale: f64) {
    if (gravity.x == 0.0 && gravity.y == 0.0) || gravity_scale == 0.0 {
        return;
    }
    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        if body.is_static || body.is_sleeping {
            continue;
        }
        body.force += gravity * (body.mass * gravity_scale);
    }
}

/// Integrate every dynamic awake body.
fn update_bodies(
    bodies: &mut BodyStore,
    ids: &[BodyId],
    delta: f64,
    time_scale: f64,
    correction: f64,
) {
    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        if body.is_static || body.is_sleeping {
            continue;
        }
        body.update(delta, time_scale, correction);
    }
}

/// Zero the force and torque accumulators at the end of the step.
fn clear_forces(bodies: &mut BodyStore, ids: &[BodyId]) {
    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        body.force = DVec2::ZERO;
        body.torque = 0.0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyOptions};
    use approx::assert_relative_eq;
    use glam::DVec2;

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

    #[test]
    fn test_gravity_accelerates_bodies() {
        let mut engine = Engine::default();
        let id = engine.world.add_body(rect(DVec2::new(0.0, 0.0), 40.0, 40.0, false));

        for _ in 0..10 {
            engine.step();
        }
        let body = engine.world.body(id).unwrap();
        assert!(body.position.y > 0.0, "body falls along +y");
        assert!(body.velocity.y > 0.0);
        assert_eq!(body.force, DVec2::ZERO, "forces cleared after the step");
    }

    #[test]
    fn test_zero_gravity_leaves_rest() {
        let mut engine = Engine::default();
        engine.world.gravity = DVec2::ZERO;
        let id = engine.world.add_body(rect(DVec2::new(10.0, 20.0), 40.0, 40.0, false));

        for _ in 0..10 {
            engine.step();
        }
        let body = engine.world.body(id).unwrap();
        assert_relative_eq!(body.position.y, 20.0, epsilon = 1e-10);
        assert!(body.speed < 1e-10);
    }

    #[test]
    fn test_zero_time_scale_freezes() {
        let mut engine = Engine::default();
        let id = engine.world.add_body(rect(DVec2::new(0.0, 0.0), 40.0, 40.0, false));
        engine.world.body_mut(id).unwrap().set_velocity(DVec2::new(5.0, 0.0));
        engine.timing.time_scale = 0.0;

        for _ in 0..5 {
            engine.step();
        }
        let body = engine.world.body(id).unwrap();
        assert_eq!(body.position, DVec2::ZERO, "frozen body does not move");
        assert!(engine.pairs().is_empty(), "no contacts form while frozen");
        assert_eq!(engine.timing.timestamp, 0.0);
    }

    #[test]
    fn test_box_rests_on_ground() {
        let mut engine = Engine::default();
        let ground = rect(DVec2::new(0.0, 300.0), 800.0, 50.0, true);
        engine.world.add_body(ground);
        let id = engine.world.add_body(rect(DVec2::new(0.0, 100.0), 40.0, 40.0, false));

        for _ in 0..400 {
            engine.step();
        }

        let body = engine.world.body(id).unwrap();
        // Ground top edge is at y = 275; the box centre rests half its
        // height above, within slop-scale tolerance.
        assert_relative_eq!(body.position.y, 255.0, epsilon = 1.5);
        assert!(body.velocity.y.abs() < 1e-2, "box is at rest");
        assert!(!engine.pairs().is_empty(), "resting contact persists");
    }

    #[test]
    fn test_structural_change_forces_rebuild() {
        let mut engine = Engine::default();
        engine.world.add_body(rect(DVec2::new(0.0, 0.0), 40.0, 40.0, false));
        engine.step();
        assert!(!engine.world.is_modified(), "step clears the dirty flag");

        engine.world.add_body(rect(DVec2::new(100.0, 0.0), 40.0, 40.0, false));
        assert!(engine.world.is_modified());
        engine.step();
        assert!(!engine.world.is_modified());
    }

    #[test]
    fn test_deterministic_replay() {
        fn run() -> Vec<DVec2> {
            let mut engine = Engine::default();
            engine.world.add_body(rect(DVec2::new(0.0, 300.0), 800.0, 50.0, true));
            for i in 0..5 {
                engine
                    .world
                    .add_body(rect(DVec2::new(i as f64 * 10.0 - 20.0, 100.0 - 45.0 * i as f64), 40.0, 40.0, false));
            }
            for _ in 0..120 {
                engine.update(DEFAULT_DELTA, 1.0);
            }
            engine
                .world
                .all_bodies()
                .iter()
                .map(|&id| engine.world.body(id).unwrap().position)
                .collect()
        }

        let a = run();
        let b = run();
        assert_eq!(a, b, "identical runs produce identical positions");
    }
}
