//! Narrowphase Dispatch
//!
//! Walks the broadphase candidate list and decides which part pairs to hand
//! to the SAT test: pairs of resting/static bodies are skipped, collision
//! filters consulted, and body- then part-level AABB tests applied before
//! any projection work. Colliding results reuse the pair cache's previous
//! collision for axis coherence.

use crate::body::BodyId;
use crate::collision::{self, Collision};
use crate::composite::BodyStore;
use crate::filter::CollisionFilter;
use crate::pair::PairKey;
use crate::pairs::PairSet;

/// Run the narrowphase over broadphase candidates, appending colliding
/// results to `out` (which is cleared first).
pub fn collisions(
    candidates: &[(BodyId, BodyId)],
    bodies: &BodyStore,
    pairs: &PairSet,
    out: &mut Vec<Collision>,
) {
    out.clear();

    for &(id_a, id_b) in candidates {
        let (Some(body_a), Some(body_b)) = (bodies.get(id_a), bodies.get(id_b)) else {
            continue;
        };

        if (body_a.is_static || body_a.is_sleeping) && (body_b.is_static || body_b.is_sleeping) {
            continue;
        }
        if !CollisionFilter::can_collide(&body_a.collision_filter, &body_b.collision_filter) {
            continue;
        }
        if !body_a.bounds().overlaps(body_b.bounds()) {
            continue;
        }

        // Compound bodies test their pieces; the identity hull of a
        // compound is skipped.
        let start_a = usize::from(body_a.parts.len() > 1);
        let start_b = usize::from(body_b.parts.len() > 1);

        for index_a in start_a..body_a.parts.len() {
            let part_a = &body_a.parts[index_a];
            for index_b in start_b..body_b.parts.len() {
                let part_b = &body_b.parts[index_b];

                let whole_bodies = index_a == 0 && index_b == 0;
                if !whole_bodies && !part_a.bounds.overlaps(&part_b.bounds) {
                    continue;
                }

                let key = PairKey::new(part_a.id, part_b.id);
                let previous = pairs
                    .get(key)
                    .filter(|pair| pair.is_active)
                    .map(|pair| &pair.collision);

                if let Some(collision) =
                    collision::collides(body_a, index_a, body_b, index_b, previous)
                {
                    out.push(collision);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
