//! Narrowphase: Separating Axis Theorem
//!
//! Tests candidate part pairs for overlap and synthesises a contact set.
//! Projections run over each part's deduplicated edge normals; the axis of
//! minimum overlap defines the collision normal and depth. Support points
//! are the one or two vertices of one part deepest inside the other, found
//! by hill-climbing the vertex ring from the nearest vertex.
//!
//! # Coherence
//!
//! When both bodies moved very little since the previous step, the full
//! axis sweep is skipped and only the previously separating axis is
//! retested. The owning side and axis index are recorded on the collision
//! for that purpose.

use glam::DVec2;

use crate::body::{Body, BodyId, Part};
use crate::vertices::{self, Vertex};

/// Combined squared-motion threshold below which the previous separating
/// axis is retested alone.
const COHERENCE_MOTION_THRESH: f64 = 0.2;

/// Identifies one side of a collision: the part and its parent body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartRef {
    /// Parent body id
    pub parent: BodyId,
    /// Part id (equals `parent` for single-part bodies)
    pub id: BodyId,
    /// Part index within the parent
    pub index: usize,
}

/// A narrowphase result for one part pair. Transient: rebuilt every step,
/// cached on the pair only for coherence reuse.
#[derive(Clone, Debug)]
pub struct Collision {
    /// Side with the smaller part id
    pub part_a: PartRef,
    /// Side with the larger part id
    pub part_b: PartRef,
    /// Unit collision normal, oriented from part B toward part A so that
    /// pushing A along it separates the pair
    pub normal: DVec2,
    /// `perp(normal)`
    pub tangent: DVec2,
    /// Overlap along the normal
    pub depth: f64,
    /// `normal * depth`
    pub penetration: DVec2,
    /// One or two deepest contact vertices
    pub supports: Vec<Vertex>,
    /// Whether the minimum-overlap axis came from part A's set
    pub axis_from_a: bool,
    /// Index of that axis in its owner's set
    pub axis_number: usize,
    /// Set when the result came from a one-axis coherence retest
    pub reused: bool,
}

impl Collision {
    /// Parent body id of side A.
    #[inline]
    #[must_use]
    pub fn parent_a(&self) -> BodyId {
        self.part_a.parent
    }

    /// Parent body id of side B.
    #[inline]
    #[must_use]
    pub fn parent_b(&self) -> BodyId {
        self.part_b.parent
    }
}

struct OverlapResult {
    overlap: f64,
    axis: DVec2,
    axis_number: usize,
}

/// Test two parts for overlap.
///
/// `previous` is the last step's colliding result for the same pair; when
/// the bodies are nearly at rest it enables the one-axis retest. The
/// returned record is canonical: side A is the part with the smaller id.
#[must_use]
pub fn collides(
    body_a: &Body,
    index_a: usize,
    body_b: &Body,
    index_b: usize,
    previous: Option<&Collision>,
) -> Option<Collision> {
    // Canonical ordering by part id.
    let (body_a, index_a, body_b, index_b) =
        if body_a.parts[index_a].id <= body_b.parts[index_b].id {
            (body_a, index_a, body_b, index_b)
        } else {
            (body_b, index_b, body_a, index_a)
        };
    let part_a = &body_a.parts[index_a];
    let part_b = &body_b.parts[index_b];

    let motion = body_a.speed * body_a.speed
        + body_a.angular_speed * body_a.angular_speed
        + body_b.speed * body_b.speed
        + body_b.angular_speed * body_b.angular_speed;

    let reusable = previous
        .filter(|_| motion < COHERENCE_MOTION_THRESH)
        .filter(|prev| {
            let owner = if prev.axis_from_a { part_a } else { part_b };
            prev.axis_number < owner.axes.len()
        });

    let (min_overlap, axis_from_a, reused) = match reusable {
        Some(prev) => {
            // Only the previously separating axis needs retesting.
            let (owner, other) = if prev.axis_from_a {
                (part_a, part_b)
            } else {
                (part_b, part_a)
            };
            let axis = [owner.axes[prev.axis_number]];
            let mut result = overlap_axes(&owner.vertices, &other.vertices, &axis);
            if result.overlap <= 0.0 {
                return None;
            }
            result.axis_number = prev.axis_number;
            (result, prev.axis_from_a, true)
        }
        None => {
            let overlap_ab = overlap_axes(&part_a.vertices, &part_b.vertices, &part_a.axes);
            if overlap_ab.overlap <= 0.0 {
                return None;
            }
            let overlap_ba = overlap_axes(&part_b.vertices, &part_a.vertices, &part_b.axes);
            if overlap_ba.overlap <= 0.0 {
                return None;
            }
            if overlap_ab.overlap < overlap_ba.overlap {
                (overlap_ab, true, false)
            } else {
                (overlap_ba, false, false)
            }
        }
    };

    if min_overlap.overlap == f64::MAX {
        // Neither ring contributed an axis (degenerate geometry).
        return None;
    }

    // Orient the axis so positive positional correction pushes A off B.
    let axis = min_overlap.axis;
    let normal = if axis.dot(part_b.position - part_a.position) < 0.0 {
        axis
    } else {
        -axis
    };
    let tangent = normal.perp();
    let depth = min_overlap.overlap;

    let mut supports: Vec<Vertex> = Vec::with_capacity(2);
    let (support_a, support_b) = find_supports(part_a, part_b, normal);
    if vertices::contains(&part_a.vertices, support_a.position) {
        supports.push(support_a);
    }
    if vertices::contains(&part_a.vertices, support_b.position) {
        supports.push(support_b);
    }
    if supports.len() < 2 {
        let (other_a, other_b) = find_supports(part_b, part_a, -normal);
        if vertices::contains(&part_b.vertices, other_a.position) {
            supports.push(other_a);
        }
        if supports.len() < 2 && vertices::contains(&part_b.vertices, other_b.position) {
            supports.push(other_b);
        }
    }
    if supports.is_empty() {
        supports.push(support_a);
    }

    Some(Collision {
        part_a: PartRef {
            parent: body_a.id,
            id: part_a.id,
            index: index_a,
        },
        part_b: PartRef {
            parent: body_b.id,
            id: part_b.id,
            index: index_b,
        },
        normal,
        tangent,
        depth,
        penetration: normal * depth,
        supports,
        axis_from_a,
        axis_number: min_overlap.axis_number,
        reused,
    })
}

/// Project both rings onto each axis and keep the axis of minimum overlap.
/// Bails out early with a non-positive overlap when a separating axis is
/// found.
fn overlap_axes(vertices_a: &[Vertex], vertices_b: &[Vertex], axes: &[DVec2]) -> OverlapResult {
    let mut result = OverlapResult {
        overlap: f64::MAX,
        axis: DVec2::ZERO,
        axis_number: 0,
    };

    for (i, &axis) in axes.iter().enumerate() {
        let (min_a, max_a) = project(vertices_a, axis);
        let (min_b, max_b) = project(vertices_b, axis);
        let overlap = (max_a - min_b).min(max_b - min_a);

        if overlap <= 0.0 {
            result.overlap = overlap;
            return result;
        }
        if overlap < result.overlap {
            result.overlap = overlap;
            result.axis = axis;
            result.axis_number = i;
        }
    }
    result
}

/// Project a ring onto an axis, returning (min, max).
fn project(vertices: &[Vertex], axis: DVec2) -> (f64, f64) {
    let mut min = vertices[0].position.dot(axis);
    let mut max = min;
    for vertex in &vertices[1..] {
        let p = vertex.position.dot(axis);
        if p < min {
            min = p;
        } else if p > max {
            max = p;
        }
    }
    (min, max)
}

/// Find the vertex of `part_b` deepest toward `part_a` along `normal`, plus
/// whichever of its ring neighbours projects deeper.
fn find_supports(part_a: &Part, part_b: &Part, normal: DVec2) -> (Vertex, Vertex) {
    let position = part_a.position;
    let verts = &part_b.vertices;
    let n = verts.len();

    let mut nearest = 0;
    let mut nearest_distance = f64::MAX;
    for (i, vertex) in verts.iter().enumerate() {
        let distance = -normal.dot(vertex.position - position);
        if distance < nearest_distance {
            nearest_distance = distance;
            nearest = i;
        }
    }
    let vertex_a = verts[nearest];

    let prev = verts[(nearest + n - 1) % n];
    let next = verts[(nearest + 1) % n];
    let prev_distance = -normal.dot(prev.position - position);
    let next_distance = -normal.dot(next.position - position);
    let vertex_b = if next_distance < prev_distance {
        next
    } else {
        prev
    };

    (vertex_a, vertex_b)
}

// ============================================================================
// Tests
// ============================================================================
