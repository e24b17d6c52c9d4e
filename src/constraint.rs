//! Distance Constraints
//!
//! A constraint links an anchor on one body (or a fixed world point) to an
//! anchor on another, holding the anchors at a rest length. Stiffness 1
//! behaves as a rigid pin, lower stiffness as a spring; `damping` bleeds
//! off velocity along the constraint axis.
//!
//! The solver is Gauss–Seidel over positions: each iteration moves the
//! endpoint bodies directly, splitting the correction by inverse mass, and
//! accumulates what it moved into each body's
//! [`constraint_impulse`](crate::body::Body::constraint_impulse). That cache
//! is pre-applied at the start of the next step (warm start) and decays to
//! 0.4 of itself after each post-solve, which is what keeps chains of
//! constraints from oscillating at interactive iteration counts.

use glam::DVec2;

use crate::axes;
use crate::body::{Body, BodyId};
use crate::composite::{BodyStore, ConstraintStore};
use crate::math;
use crate::vertices;

/// Stable constraint identifier, allocated by the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintId(pub u32);

/// Shortest length a constraint can measure; avoids dividing by zero for
/// co-located anchors.
pub(crate) const MIN_LENGTH: f64 = 1e-6;

/// Fraction of the accumulated impulse carried into the next step.
pub(crate) const WARMING: f64 = 0.4;

/// Global scale on constraint torque.
pub(crate) const TORQUE_DAMPEN: f64 = 1.0;

/// Construction options for a constraint.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintOptions {
    /// Anchor offset local to body A, or a world point when A is absent
    pub point_a: DVec2,
    /// Anchor offset local to body B, or a world point when B is absent
    pub point_b: DVec2,
    /// Rest length; defaults to the initial anchor distance
    pub length: Option<f64>,
    /// Stiffness in `0..=1`; defaults to 1 (or 0.7 for zero-length pins)
    pub stiffness: Option<f64>,
    /// Velocity damping along the constraint axis, `0..=1`
    pub damping: f64,
    /// How strongly the constraint resists rotating its bodies, `0..=1`
    pub angular_stiffness: f64,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            point_a: DVec2::ZERO,
            point_b: DVec2::ZERO,
            length: None,
            stiffness: None,
            damping: 0.0,
            angular_stiffness: 0.0,
        }
    }
}

/// A distance/spring constraint between two anchors.
#[derive(Clone, Debug)]
pub struct Constraint {
    /// Stable id; 0 until added to a world
    pub id: ConstraintId,
    /// First endpoint body, if any
    pub body_a: Option<BodyId>,
    /// Second endpoint body, if any
    pub body_b: Option<BodyId>,
    /// Anchor offset local to body A (world point when A is absent)
    pub point_a: DVec2,
    /// Anchor offset local to body B (world point when B is absent)
    pub point_b: DVec2,
    /// Rest length
    pub length: f64,
    /// Stiffness in `0..=1`
    pub stiffness: f64,
    /// Axis velocity damping
    pub damping: f64,
    /// Rotational stiffness share
    pub angular_stiffness: f64,
    /// Body A angle the local anchor was last expressed in
    pub angle_a: f64,
    /// Body B angle the local anchor was last expressed in
    pub angle_b: f64,
}

impl Constraint {
    /// Build a constraint between two optional bodies. Rest length and
    /// reference angles are captured from the bodies' current placement.
    #[must_use]
    pub fn create(
        body_a: Option<&Body>,
        body_b: Option<&Body>,
        options: ConstraintOptions,
    ) -> Self {
        let world_a = body_a.map_or(options.point_a, |b| b.position + options.point_a);
        let world_b = body_b.map_or(options.point_b, |b| b.position + options.point_b);
        let length = options.length.unwrap_or((world_a - world_b).length());
        let stiffness = options
            .stiffness
            .unwrap_or(if length == 0.0 { 0.7 } else { 1.0 });

        Self {
            id: ConstraintId(0),
            body_a: body_a.map(|b| b.id),
            body_b: body_b.map(|b| b.id),
            point_a: options.point_a,
            point_b: options.point_b,
            length,
            stiffness,
            damping: options.damping,
            angular_stiffness: options.angular_stiffness,
            angle_a: body_a.map_or(0.0, |b| b.angle),
            angle_b: body_b.map_or(0.0, |b| b.angle),
        }
    }
}

/// Warm start: re-apply each body's decayed constraint impulse from the
/// previous step before iterating.
pub(crate) fn pre_solve_all(bodies: &mut BodyStore, ids: &[BodyId]) {
    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        let impulse = body.constraint_impulse;
        if body.is_static || impulse.is_zero() {
            continue;
        }
        body.position += impulse.offset;
        body.angle += impulse.angle;
    }
}

/// One Gauss–Seidel sweep over all constraints. Constraints with a static
/// or missing endpoint are solved first: immovable anchors propagate their
/// correction through the rest of the chain faster.
pub(crate) fn solve_all(
    bodies: &mut BodyStore,
    constraints: &mut ConstraintStore,
    ids: &[ConstraintId],
    time_scale: f64,
) {
    for &id in ids {
        if constraint_is_fixed(bodies, constraints, id) {
            if let Some(constraint) = constraints.get_mut(id) {
                solve(constraint, bodies, time_scale);
            }
        }
    }
    for &id in ids {
        if !constraint_is_fixed(bodies, constraints, id) {
            if let Some(constraint) = constraints.get_mut(id) {
                solve(constraint, bodies, time_scale);
            }
        }
    }
}

fn constraint_is_fixed(bodies: &BodyStore, constraints: &ConstraintStore, id: ConstraintId) -> bool {
    let Some(constraint) = constraints.get(id) else {
        return false;
    };
    let fixed_end = |body: Option<BodyId>| {
        body.map_or(true, |id| bodies.get(id).map_or(true, |b| b.is_static))
    };
    fixed_end(constraint.body_a) || fixed_end(constraint.body_b)
}

/// Solve a single constraint, translating and rotating its endpoint bodies
/// toward the rest length.
pub(crate) fn solve(constraint: &mut Constraint, bodies: &mut BodyStore, time_scale: f64) {
    // A referenced body that has left the world disables the constraint.
    if constraint.body_a.is_some_and(|id| bodies.get(id).is_none())
        || constraint.body_b.is_some_and(|id| bodies.get(id).is_none())
    {
        return;
    }

    let body_a = constraint.body_a.and_then(|id| bodies.get(id));
    let body_b = constraint.body_b.and_then(|id| bodies.get(id));

    // Keep local anchors in step with body rotation.
    if let Some(body) = body_a {
        if !body.is_static {
            constraint.point_a = math::rotate(constraint.point_a, body.angle - constraint.angle_a);
            constraint.angle_a = body.angle;
        }
    }
    if let Some(body) = body_b {
        if !body.is_static {
            constraint.point_b = math::rotate(constraint.point_b, body.angle - constraint.angle_b);
            constraint.angle_b = body.angle;
        }
    }

    let world_a = body_a.map_or(constraint.point_a, |b| b.position + constraint.point_a);
    let world_b = body_b.map_or(constraint.point_b, |b| b.position + constraint.point_b);

    let delta = world_a - world_b;
    let current_length = delta.length().max(MIN_LENGTH);

    let difference = (current_length - constraint.length) / current_length;
    let stiffness = if constraint.stiffness < 1.0 {
        constraint.stiffness * time_scale
    } else {
        constraint.stiffness
    };
    let force = delta * (difference * stiffness);

    let mass_total = body_a.map_or(0.0, |b| b.inverse_mass) + body_b.map_or(0.0, |b| b.inverse_mass);
    let inertia_total =
        body_a.map_or(0.0, |b| b.inverse_inertia) + body_b.map_or(0.0, |b| b.inverse_inertia);
    if mass_total == 0.0 {
        // Both endpoints immovable.
        return;
    }
    let resistance_total = mass_total + inertia_total;

    let (normal, normal_velocity) = if constraint.damping > 0.0 {
        let normal = delta / current_length;
        let velocity_a = body_a.map_or(DVec2::ZERO, |b| b.position - b.position_prev);
        let velocity_b = body_b.map_or(DVec2::ZERO, |b| b.position - b.position_prev);
        (normal, normal.dot(velocity_b - velocity_a))
    } else {
        (DVec2::ZERO, 0.0)
    };

    let damping = constraint.damping;
    let angular_share = 1.0 - constraint.angular_stiffness;

    if let Some(id) = constraint.body_a {
        let body = bodies.get_mut(id).expect("endpoint checked above");
        if !body.is_static {
            let share = body.inverse_mass / mass_total;
            body.constraint_impulse.offset -= force * share;
            body.position -= force * share;
            if damping > 0.0 {
                body.position_prev -= damping * normal * normal_velocity * share;
            }
            let torque = math::cross(constraint.point_a, force) / resistance_total
                * TORQUE_DAMPEN
                * body.inverse_inertia
                * angular_share;
            body.constraint_impulse.angle -= torque;
            body.angle -= torque;
        }
    }
    if let Some(id) = constraint.body_b {
        let body = bodies.get_mut(id).expect("endpoint checked above");
        if !body.is_static {
            let share = body.inverse_mass / mass_total;
            body.constraint_impulse.offset += force * share;
            body.position += force * share;
            if damping > 0.0 {
                body.position_prev += damping * normal * normal_velocity * share;
            }
            let torque = math::cross(constraint.point_b, force) / resistance_total
                * TORQUE_DAMPEN
                * body.inverse_inertia
                * angular_share;
            body.constraint_impulse.angle += torque;
            body.angle += torque;
        }
    }
}

/// Push the iterated corrections out to body geometry, wake moved bodies
/// and decay the impulse cache for the next step's warm start.
pub(crate) fn post_solve_all(bodies: &mut BodyStore, ids: &[BodyId]) {
    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        let impulse = body.constraint_impulse;
        if body.is_static || impulse.is_zero() {
            continue;
        }

        body.set_sleeping(false);

        let position = body.position;
        let velocity = body.velocity;
        for (i, part) in body.parts.iter_mut().enumerate() {
            if i == 0 {
                part.position = position;
            } else {
                part.position += impulse.offset;
            }
            vertices::translate(&mut part.vertices, impulse.offset);
            if impulse.angle != 0.0 {
                vertices::rotate(&mut part.vertices, impulse.angle, position);
                axes::rotate(&mut part.axes, impulse.angle);
                if i > 0 {
                    part.position = math::rotate_about(part.position, impulse.angle, position);
                }
            }
            part.bounds.update(&part.vertices, velocity);
        }

        body.constraint_impulse.offset *= WARMING;
        body.constraint_impulse.angle *= WARMING;
    }
}

// ============================================================================
// Tests
// ============================================================================
