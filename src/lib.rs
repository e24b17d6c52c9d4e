//! topple: Deterministic 2D Rigid-Body Physics
//!
//! An iterative impulse/position-correction physics engine for convex
//! polygons: gravity, distance/spring constraints, and contact collisions
//! with Coulomb friction and restitution. Built for real-time interactive
//! use: tens to low thousands of bodies at 60 Hz.
//!
//! # Features
//!
//! - **Verlet bodies**: velocity implied by `position - position_prev`,
//!   so solvers adjust velocity and position independently
//! - **Spatial hash broadphase**: uniform grid with counted pair overlap,
//!   incremental re-bucketing on region change
//! - **SAT narrowphase**: minimum-overlap axis with one-axis coherence
//!   reuse for resting pairs, hill-climbed support points
//! - **Warm-started solvers**: persistent pairs carry accumulated contact
//!   impulses across steps (Catto-style sequential impulses)
//! - **Sleeping**: filtered-motion sleep/wake with contact-driven wakes
//! - **Composite world**: nested containers over id-addressed body and
//!   constraint stores
//!
//! # Example
//!
//! ```
//! use glam::DVec2;
//! use topple::{Body, BodyOptions, Engine};
//!
//! let mut engine = Engine::default();
//!
//! // A static ground and a falling box.
//! let ground = Body::from_vertices(
//!     DVec2::new(400.0, 600.0),
//!     vec![
//!         DVec2::new(-400.0, -25.0),
//!         DVec2::new(400.0, -25.0),
//!         DVec2::new(400.0, 25.0),
//!         DVec2::new(-400.0, 25.0),
//!     ],
//!     BodyOptions { is_static: true, ..BodyOptions::default() },
//! )
//! .unwrap();
//! engine.world.add_body(ground);
//!
//! let falling = Body::from_vertices(
//!     DVec2::new(400.0, 100.0),
//!     vec![
//!         DVec2::new(-20.0, -20.0),
//!         DVec2::new(20.0, -20.0),
//!         DVec2::new(20.0, 20.0),
//!         DVec2::new(-20.0, 20.0),
//!     ],
//!     BodyOptions::default(),
//! )
//! .unwrap();
//! let id = engine.world.add_body(falling);
//!
//! for _ in 0..60 {
//!     engine.step();
//! }
//! assert!(engine.world.body(id).unwrap().position.y > 100.0);
//! ```
//!
//! # Determinism
//!
//! Stepping is single-threaded and iteration order is everywhere the
//! stable insertion order of the world, so two engines built and stepped
//! identically produce identical trajectories on the same platform.
//! Bit-exactness *across* differing FP platforms is out of scope.
//!
//! # Units
//!
//! Distances are world units, angles radians, time milliseconds
//! (`Engine::step` advances one 60 Hz frame).

#![warn(missing_docs)]

pub mod axes;
pub mod body;
pub mod bounds;
pub mod collision;
pub mod composite;
pub mod constraint;
pub mod contact;
pub mod detector;
pub mod engine;
pub mod error;
pub mod filter;
pub mod grid;
pub mod math;
pub mod pair;
pub mod pairs;
pub mod query;
pub mod resolver;
pub mod sleeping;
pub mod vertices;

pub use body::{Body, BodyId, BodyOptions, ConstraintImpulse, Part};
pub use bounds::Bounds;
pub use collision::{Collision, PartRef};
pub use composite::{Composite, CompositeId, World};
pub use constraint::{Constraint, ConstraintId, ConstraintOptions};
pub use contact::{Contact, ContactId};
pub use engine::{Engine, EngineOptions, Timing, DEFAULT_DELTA};
pub use error::PhysicsError;
pub use filter::CollisionFilter;
pub use grid::{Grid, Region};
pub use pair::{Pair, PairKey};
pub use pairs::PairSet;
pub use query::RayHit;
pub use vertices::Vertex;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::body::{Body, BodyId, BodyOptions, Part};
    pub use crate::bounds::Bounds;
    pub use crate::collision::Collision;
    pub use crate::composite::{CompositeId, World};
    pub use crate::constraint::{Constraint, ConstraintId, ConstraintOptions};
    pub use crate::contact::{Contact, ContactId};
    pub use crate::engine::{Engine, EngineOptions, DEFAULT_DELTA};
    pub use crate::error::PhysicsError;
    pub use crate::filter::CollisionFilter;
    pub use crate::pair::{Pair, PairKey};
    pub use crate::pairs::PairSet;
    pub use crate::query;
    pub use glam::DVec2;
}
