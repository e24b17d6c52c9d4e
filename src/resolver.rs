//! Contact Resolution
//!
//! Two warm-started solvers run over the active pairs each step:
//!
//! - the **position solver** accumulates a positional impulse per body that
//!   pushes overlapping pairs apart to within their slop, shared across the
//!   body's contacts and damped to keep stacks calm;
//! - the **velocity solver** is a sequential-impulse loop: per contact it
//!   measures relative velocity at the contact point, forms a restitution
//!   normal impulse and a Coulomb-limited friction impulse, scales by the
//!   pair's effective mass, and applies the result by shifting
//!   `position_prev`/`angle_prev` (Verlet's way of changing velocity
//!   without moving geometry).
//!
//! Accumulated impulses are clamped (normal impulses may only push apart)
//! and carried on the contacts across steps; fast collisions bypass the
//! accumulator and take the raw impulse instead.

use crate::body::BodyId;
use crate::composite::BodyStore;
use crate::math;
use crate::pairs::PairSet;
use crate::vertices;

/// Fraction of the measured separation fed back per position iteration.
pub(crate) const POSITION_DAMPEN: f64 = 0.9;

/// Decay applied to the positional impulse carried into the next step.
pub(crate) const POSITION_WARMING: f64 = 0.8;

/// Scale from clamped separation to the friction normal force.
pub(crate) const FRICTION_NORMAL_MULTIPLIER: f64 = 5.0;

/// Squared normal velocity above which a contact is treated as a fresh
/// impact rather than a resting contact.
pub(crate) const RESTING_THRESH: f64 = 4.0;

/// Squared tangent velocity above which friction bypasses the accumulator.
pub(crate) const RESTING_THRESH_TANGENT: f64 = 6.0;

// ============================================================================
// Position solver
// ============================================================================

/// Count this step's active contacts onto their parent bodies; the counts
/// divide the positional correction between a body's contacts.
pub(crate) fn pre_solve_position(bodies: &mut BodyStore, pairs: &mut PairSet) {
    for pair in pairs.pairs_mut() {
        if !pair.is_active {
            continue;
        }
        let count = pair.active_contacts.len() as u32;
        if let Some(body) = bodies.get_mut(pair.collision.parent_a()) {
            body.total_contacts += count;
        }
        if let Some(body) = bodies.get_mut(pair.collision.parent_b()) {
            body.total_contacts += count;
        }
    }
}

/// One position iteration: re-measure each pair's remaining overlap under
/// the impulses accumulated so far, then push both bodies' accumulators
/// along the contact normal.
pub(crate) fn solve_position(bodies: &mut BodyStore, pairs: &mut PairSet, time_scale: f64) {
    // Remaining overlap shrinks as the accumulated impulses eat into the
    // measured depth.
    for pair in pairs.pairs_mut() {
        if !pair.is_active || pair.is_sensor {
            continue;
        }
        let (Some(body_a), Some(body_b)) = (
            bodies.get(pair.collision.parent_a()),
            bodies.get(pair.collision.parent_b()),
        ) else {
            continue;
        };
        let body_b_to_a =
            body_b.position_impulse - body_a.position_impulse + pair.collision.penetration;
        pair.separation = pair.collision.normal.dot(body_b_to_a);
    }

    for pair in pairs.pairs_mut() {
        if !pair.is_active || pair.is_sensor {
            continue;
        }
        let Some((body_a, body_b)) =
            bodies.pair_mut(pair.collision.parent_a(), pair.collision.parent_b())
        else {
            continue;
        };

        let mut position_impulse = (pair.separation - pair.slop) * time_scale;
        if body_a.is_static || body_b.is_static {
            // A static side leaves the whole correction to one body.
            position_impulse *= 2.0;
        }

        let normal = pair.collision.normal;
        if !(body_a.is_static || body_a.is_sleeping) {
            let contact_share = POSITION_DAMPEN / body_a.total_contacts as f64;
            body_a.position_impulse += normal * (position_impulse * contact_share);
        }
        if !(body_b.is_static || body_b.is_sleeping) {
            let contact_share = POSITION_DAMPEN / body_b.total_contacts as f64;
            body_b.position_impulse -= normal * (position_impulse * contact_share);
        }
    }
}

/// Apply each body's accumulated positional impulse: translate the geometry
/// and `position_prev` together so no velocity is introduced, then either
/// zero the accumulator (when it opposes the motion) or decay it as next
/// step's warm start.
pub(crate) fn post_solve_position(bodies: &mut BodyStore, ids: &[BodyId]) {
    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        body.total_contacts = 0;

        let impulse = body.position_impulse;
        if impulse.x == 0.0 && impulse.y == 0.0 {
            continue;
        }

        let velocity = body.velocity;
        for part in &mut body.parts {
            vertices::translate(&mut part.vertices, impulse);
            part.bounds.update(&part.vertices, velocity);
            part.position += impulse;
        }
        body.position += impulse;
        body.position_prev += impulse;

        if impulse.dot(velocity) < 0.0 {
            // Pushing against the motion: the contact is settling, snap the
            // accumulator to rest.
            body.position_impulse = glam::DVec2::ZERO;
        } else {
            body.position_impulse *= POSITION_WARMING;
        }
    }
}

// ============================================================================
// Velocity solver
// ============================================================================

/// Warm start: apply each contact's impulses cached from the previous step
/// before iterating.
pub(crate) fn pre_solve_velocity(bodies: &mut BodyStore, pairs: &mut PairSet) {
    for pair in pairs.pairs_mut() {
        if !pair.is_active || pair.is_sensor {
            continue;
        }
        let normal = pair.collision.normal;
        let tangent = pair.collision.tangent;
        let Some((body_a, body_b)) =
            bodies.pair_mut(pair.collision.parent_a(), pair.collision.parent_b())
        else {
            continue;
        };

        for k in 0..pair.active_contacts.len() {
            let id = pair.active_contacts[k];
            let Some(contact) = pair.contacts.iter().find(|c| c.id == id) else {
                continue;
            };
            let (vertex, normal_impulse, tangent_impulse) =
                (contact.vertex.position, contact.normal_impulse, contact.tangent_impulse);
            if normal_impulse == 0.0 && tangent_impulse == 0.0 {
                continue;
            }

            let impulse = normal * normal_impulse + tangent * tangent_impulse;
            if !(body_a.is_static || body_a.is_sleeping) {
                let offset = vertex - body_a.position;
                body_a.position_prev += impulse * body_a.inverse_mass;
                body_a.angle_prev += math::cross(offset, impulse) * body_a.inverse_inertia;
            }
            if !(body_b.is_static || body_b.is_sleeping) {
                let offset = vertex - body_b.position;
                body_b.position_prev -= impulse * body_b.inverse_mass;
                body_b.angle_prev -= math::cross(offset, impulse) * body_b.inverse_inertia;
            }
        }
    }
}

/// One sequential-impulse iteration over all active contacts.
pub(crate) fn solve_velocity(bodies: &mut BodyStore, pairs: &mut PairSet, time_scale: f64) {
    let time_scale_squared = time_scale * time_scale;

    for pair in pairs.pairs_mut() {
        if !pair.is_active || pair.is_sensor {
            continue;
        }
        let contact_count = pair.active_contacts.len();
        if contact_count == 0 {
            continue;
        }
        let contact_share = 1.0 / contact_count as f64;

        let normal = pair.collision.normal;
        let tangent = pair.collision.tangent;
        let Some((body_a, body_b)) =
            bodies.pair_mut(pair.collision.parent_a(), pair.collision.parent_b())
        else {
            continue;
        };

        // Refresh the implied velocities; earlier pairs this iteration may
        // have shifted these bodies already.
        body_a.velocity = body_a.position - body_a.position_prev;
        body_a.angular_velocity = body_a.angle - body_a.angle_prev;
        body_b.velocity = body_b.position - body_b.position_prev;
        body_b.angular_velocity = body_b.angle - body_b.angle_prev;

        for k in 0..contact_count {
            let id = pair.active_contacts[k];
            let Some(contact_index) = pair.contacts.iter().position(|c| c.id == id) else {
                continue;
            };
            let vertex = pair.contacts[contact_index].vertex.position;

            let offset_a = vertex - body_a.position;
            let offset_b = vertex - body_b.position;
            let velocity_point_a = body_a.velocity + offset_a.perp() * body_a.angular_velocity;
            let velocity_point_b = body_b.velocity + offset_b.perp() * body_b.angular_velocity;
            let relative_velocity = velocity_point_a - velocity_point_b;
            let normal_velocity = normal.dot(relative_velocity);
            let tangent_velocity = tangent.dot(relative_velocity);
            let tangent_speed = tangent_velocity.abs();
            let tangent_direction = if tangent_velocity < 0.0 { -1.0 } else { 1.0 };

            let mut normal_impulse = (1.0 + pair.restitution) * normal_velocity;
            let normal_force = (pair.separation + normal_velocity).clamp(0.0, 1.0)
                * FRICTION_NORMAL_MULTIPLIER;

            let mut tangent_impulse = tangent_velocity;
            let mut max_friction = f64::INFINITY;
            if tangent_speed
                > pair.friction * pair.friction_static * normal_force * time_scale_squared
            {
                max_friction = tangent_speed;
                tangent_impulse = (pair.friction * tangent_direction * time_scale_squared)
                    .clamp(-max_friction, max_friction);
            }

            // Effective mass at this contact offset.
            let offset_a_cross_normal = math::cross(offset_a, normal);
            let offset_b_cross_normal = math::cross(offset_b, normal);
            let share = contact_share
                / (body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * offset_a_cross_normal * offset_a_cross_normal
                    + body_b.inverse_inertia * offset_b_cross_normal * offset_b_cross_normal);
            normal_impulse *= share;
            tangent_impulse *= share;

            let contact = &mut pair.contacts[contact_index];

            if normal_velocity < 0.0
                && normal_velocity * normal_velocity > RESTING_THRESH * time_scale_squared
            {
                // Fresh impact: drop the accumulator and take the raw impulse.
                contact.normal_impulse = 0.0;
            } else {
                // Resting: accumulate and clamp so contacts only push apart.
                let prior = contact.normal_impulse;
                contact.normal_impulse = (contact.normal_impulse + normal_impulse).min(0.0);
                normal_impulse = contact.normal_impulse - prior;
            }

            if tangent_velocity * tangent_velocity
                > RESTING_THRESH_TANGENT * time_scale_squared
            {
                contact.tangent_impulse = 0.0;
            } else {
                let prior = contact.tangent_impulse;
                contact.tangent_impulse =
                    (contact.tangent_impulse + tangent_impulse).clamp(-max_friction, max_friction);
                tangent_impulse = contact.tangent_impulse - prior;
            }

            let impulse = normal * normal_impulse + tangent * tangent_impulse;
            if !(body_a.is_static || body_a.is_sleeping) {
                body_a.position_prev += impulse * body_a.inverse_mass;
                body_a.angle_prev += math::cross(offset_a, impulse) * body_a.inverse_inertia;
            }
            if !(body_b.is_static || body_b.is_sleeping) {
                body_b.position_prev -= impulse * body_b.inverse_mass;
                body_b.angle_prev -= math::cross(offset_b, impulse) * body_b.inverse_inertia;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
