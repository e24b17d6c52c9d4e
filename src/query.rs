//! Spatial Queries
//!
//! One-shot queries over bodies, outside the stepping pipeline: overlap
//! tests against a probe body, raycasts (a ray is a hair-thin rotated
//! rectangle driven through the narrowphase), bounds-region filtering and
//! point picking.

use glam::DVec2;

use crate::body::{Body, BodyId, BodyOptions};
use crate::bounds::Bounds;
use crate::collision::{self, Collision};
use crate::math;
use crate::vertices;

/// Default ray thickness: effectively a line.
pub const DEFAULT_RAY_WIDTH: f64 = 1e-100;

/// A raycast hit.
#[derive(Clone, Debug)]
pub struct RayHit {
    /// The body that was hit
    pub body: BodyId,
    /// Narrowphase detail for the hit
    pub collision: Collision,
}

/// Find all bodies colliding with a probe body.
pub fn collides<'a, I>(body: &Body, bodies: I) -> Vec<Collision>
where
    I: IntoIterator<Item = &'a Body>,
{
    let mut out = Vec::new();
    for other in bodies {
        if !other.bounds().overlaps(body.bounds()) {
            continue;
        }
        let start = usize::from(other.parts.len() > 1);
        for index in start..other.parts.len() {
            let part = &other.parts[index];
            if !part.bounds.overlaps(body.bounds()) {
                continue;
            }
            if let Some(collision) = collision::collides(other, index, body, 0, None) {
                out.push(collision);
                break;
            }
        }
    }
    out
}

/// Cast a ray from `start` to `end`, returning every body it crosses.
///
/// `width` widens the ray into a rectangle; pass
/// [`DEFAULT_RAY_WIDTH`] (or any non-positive value) for a line.
pub fn ray<'a, I>(bodies: I, start: DVec2, end: DVec2, width: f64) -> Vec<RayHit>
where
    I: IntoIterator<Item = &'a Body>,
{
    let width = if width > 0.0 { width } else { DEFAULT_RAY_WIDTH };
    let angle = math::angle(start, end);
    let length = (end - start).length();
    let midpoint = (start + end) * 0.5;

    let (half_length, half_width) = (length / 2.0, width / 2.0);
    let Ok(ray_body) = Body::from_vertices(
        midpoint,
        vec![
            DVec2::new(-half_length, -half_width),
            DVec2::new(half_length, -half_width),
            DVec2::new(half_length, half_width),
            DVec2::new(-half_length, half_width),
        ],
        BodyOptions {
            angle,
            ..BodyOptions::default()
        },
    ) else {
        return Vec::new();
    };

    collides(&ray_body, bodies)
        .into_iter()
        .map(|collision| {
            // The probe is the zero-id side; the other parent is the hit.
            let body = if collision.parent_a() == BodyId(0) {
                collision.parent_b()
            } else {
                collision.parent_a()
            };
            RayHit { body, collision }
        })
        .collect()
}

/// All bodies whose bounds overlap `bounds` (or, with `outside` set, all
/// bodies whose bounds do not).
pub fn region<'a, I>(bodies: I, bounds: &Bounds, outside: bool) -> Vec<BodyId>
where
    I: IntoIterator<Item = &'a Body>,
{
    bodies
        .into_iter()
        .filter(|body| body.bounds().overlaps(bounds) != outside)
        .map(|body| body.id)
        .collect()
}

/// All bodies containing the given point.
pub fn point<'a, I>(bodies: I, point: DVec2) -> Vec<BodyId>
where
    I: IntoIterator<Item = &'a Body>,
{
    let mut out = Vec::new();
    for body in bodies {
        if !body.bounds().contains(point) {
            continue;
        }
        let start = usize::from(body.parts.len() > 1);
        for part in &body.parts[start..] {
            if part.bounds.contains(point) && vertices::contains(&part.vertices, point) {
                out.push(body.id);
                break;
            }
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
