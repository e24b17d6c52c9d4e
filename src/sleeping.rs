//! Sleeping Controller
//!
//! Bodies whose filtered motion stays below a threshold for enough
//! consecutive steps are put to sleep: integration, broadphase re-bucketing
//! and solver response all skip them until something wakes them again.
//!
//! Motion is `speed² + angular_speed²` blended with the previous value,
//! biased strongly toward the minimum so one quiet step doesn't put a
//! jittering body to sleep. Applied force wakes a body immediately; after
//! the narrowphase, an awake body bumping a sleeping one wakes it when the
//! mover carries enough motion.

use crate::body::BodyId;
use crate::composite::BodyStore;
use crate::pairs::PairSet;

/// Filtered-motion threshold below which a body counts toward sleep,
/// scaled by `time_scale³`.
pub(crate) const MOTION_SLEEP_THRESHOLD: f64 = 0.08;

/// Filtered-motion threshold a moving body must exceed to wake a sleeping
/// contact partner, scaled by `time_scale³`.
pub(crate) const MOTION_WAKE_THRESHOLD: f64 = 0.18;

/// Blend bias toward the smaller of (previous, current) motion.
pub(crate) const MIN_BIAS: f64 = 0.9;

/// Per-step sleep bookkeeping for every non-static body.
pub(crate) fn update(bodies: &mut BodyStore, ids: &[BodyId], time_scale: f64) {
    let time_factor = time_scale * time_scale * time_scale;

    for &id in ids {
        let Some(body) = bodies.get_mut(id) else { continue };
        if body.is_static {
            continue;
        }

        // An applied force always wakes.
        if body.force.x != 0.0 || body.force.y != 0.0 {
            body.set_sleeping(false);
            continue;
        }

        let motion = body.speed * body.speed + body.angular_speed * body.angular_speed;
        let min_motion = body.motion.min(motion);
        let max_motion = body.motion.max(motion);
        body.motion = MIN_BIAS * min_motion + (1.0 - MIN_BIAS) * max_motion;

        if body.sleep_threshold > 0 && body.motion < MOTION_SLEEP_THRESHOLD * time_factor {
            body.sleep_counter += 1;
            if body.sleep_counter >= body.sleep_threshold {
                body.set_sleeping(true);
            }
        } else if body.sleep_counter > 0 {
            body.sleep_counter -= 1;
        }
    }
}

/// Wake sleeping bodies whose active contact partner is moving hard enough.
pub(crate) fn after_collisions(bodies: &mut BodyStore, pairs: &PairSet, time_scale: f64) {
    let time_factor = time_scale * time_scale * time_scale;

    for pair in pairs.pairs() {
        if !pair.is_active {
            continue;
        }
        let id_a = pair.collision.parent_a();
        let id_b = pair.collision.parent_b();
        let (Some(body_a), Some(body_b)) = (bodies.get(id_a), bodies.get(id_b)) else {
            continue;
        };
        if !(body_a.is_sleeping || body_b.is_sleeping) {
            continue;
        }

        let (sleeping_id, moving_id) = if body_a.is_sleeping && !body_a.is_static {
            (id_a, id_b)
        } else {
            (id_b, id_a)
        };

        let sleeping_is_static = bodies.get(sleeping_id).is_some_and(|b| b.is_static);
        let moving_motion = bodies.get(moving_id).map_or(0.0, |b| b.motion);
        if !sleeping_is_static && moving_motion > MOTION_WAKE_THRESHOLD * time_factor {
            if let Some(body) = bodies.get_mut(sleeping_id) {
                body.set_sleeping(false);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
