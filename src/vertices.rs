//! Vertex Rings
//!
//! World-space polygon rings and the geometric operations the engine needs
//! from them: area, centroid, second moment of area, rigid transforms, point
//! containment and convex hulls.
//!
//! Every vertex carries its ring `index` and the id of the body part that
//! owns it. That pair is the stable identity used to match contact points
//! across steps, so rings must keep their order once created.
//!
//! Winding is clockwise in screen coordinates (y grows downward), which is
//! the positive-signed-area direction of the formulas below. Constructors
//! normalize input rings to that winding.

use glam::DVec2;

use crate::body::BodyId;
use crate::error::PhysicsError;
use crate::math;

/// A single vertex of a body part's ring.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    /// World-space position
    pub position: DVec2,
    /// Index within the owning ring
    pub index: usize,
    /// Id of the body part this vertex belongs to
    pub body: BodyId,
}

/// Build a vertex ring from points, tagging each vertex with its ring index
/// and the owning part id.
#[must_use]
pub fn create(points: &[DVec2], body: BodyId) -> Vec<Vertex> {
    points
        .iter()
        .enumerate()
        .map(|(index, &position)| Vertex {
            position,
            index,
            body,
        })
        .collect()
}

/// Validate a ring and normalize it to clockwise winding.
///
/// Rejects empty rings, non-finite coordinates and (for rings of three or
/// more points) non-convex polygons. Counter-clockwise input is reversed
/// rather than rejected.
pub fn normalize(mut points: Vec<DVec2>) -> Result<Vec<DVec2>, PhysicsError> {
    if points.is_empty() {
        return Err(PhysicsError::EmptyVertices);
    }
    for (index, p) in points.iter().enumerate() {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(PhysicsError::NonFiniteVertex {
                index,
                x: p.x,
                y: p.y,
            });
        }
    }
    if points.len() >= 3 {
        if let Some(index) = find_reflex_vertex(&points) {
            return Err(PhysicsError::NonConvexPolygon { index });
        }
        if points_area(&points, true) < 0.0 {
            points.reverse();
        }
    }
    Ok(points)
}

/// Find a vertex where the winding direction reverses, if any.
///
/// Returns `None` for convex rings. Collinear edges are allowed.
fn find_reflex_vertex(points: &[DVec2]) -> Option<usize> {
    let n = points.len();
    let mut sign = 0.0f64;
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let curr = points[i];
        let next = points[(i + 1) % n];
        let cross = math::cross(curr - prev, next - curr);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return Some(i);
        }
    }
    None
}

/// Area of a raw point ring. Signed area is positive for clockwise winding.
#[must_use]
pub fn points_area(points: &[DVec2], signed: bool) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        area += (points[j].x - points[i].x) * (points[j].y + points[i].y);
        j = i;
    }
    if signed {
        area / 2.0
    } else {
        area.abs() / 2.0
    }
}

/// Area of a vertex ring. See [`points_area`].
#[must_use]
pub fn area(vertices: &[Vertex], signed: bool) -> f64 {
    let n = vertices.len();
    let mut area = 0.0;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        area += (vertices[j].position.x - vertices[i].position.x)
            * (vertices[j].position.y + vertices[i].position.y);
        j = i;
    }
    if signed {
        area / 2.0
    } else {
        area.abs() / 2.0
    }
}

/// Centroid (centre of mass) of a vertex ring.
#[must_use]
pub fn centroid(vertices: &[Vertex]) -> DVec2 {
    let signed_area = area(vertices, true);
    if signed_area == 0.0 {
        return mean(vertices);
    }
    let n = vertices.len();
    let mut centre = DVec2::ZERO;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = math::cross(vertices[i].position, vertices[j].position);
        centre += (vertices[i].position + vertices[j].position) * cross;
    }
    centre / (6.0 * signed_area)
}

/// Arithmetic mean of the ring's vertices.
#[must_use]
pub fn mean(vertices: &[Vertex]) -> DVec2 {
    if vertices.is_empty() {
        return DVec2::ZERO;
    }
    let sum: DVec2 = vertices.iter().map(|v| v.position).sum();
    sum / vertices.len() as f64
}

/// Second moment of area of a ring about its centroid, scaled by `mass`.
///
/// The ring must already be expressed relative to its centroid.
#[must_use]
pub fn inertia(vertices: &[Vertex], mass: f64) -> f64 {
    let n = vertices.len();
    if n == 0 {
        return 0.0;
    }
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let a = vertices[j].position;
        let b = vertices[i].position;
        let cross = math::cross(a, b).abs();
        numerator += cross * (a.dot(a) + a.dot(b) + b.dot(b));
        denominator += cross;
    }
    if denominator == 0.0 {
        return 0.0;
    }
    (mass / 6.0) * (numerator / denominator)
}

/// Translate a ring in place.
pub fn translate(vertices: &mut [Vertex], vector: DVec2) {
    for vertex in vertices {
        vertex.position += vector;
    }
}

/// Rotate a ring in place about a point.
pub fn rotate(vertices: &mut [Vertex], angle: f64, point: DVec2) {
    if angle == 0.0 {
        return;
    }
    let (sin, cos) = angle.sin_cos();
    for vertex in vertices {
        let d = vertex.position - point;
        vertex.position = point + DVec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos);
    }
}

/// Scale a ring in place about a point.
pub fn scale(vertices: &mut [Vertex], scale_x: f64, scale_y: f64, point: DVec2) {
    if scale_x == 1.0 && scale_y == 1.0 {
        return;
    }
    for vertex in vertices {
        let d = vertex.position - point;
        vertex.position = point + DVec2::new(d.x * scale_x, d.y * scale_y);
    }
}

/// Test whether a point lies inside a clockwise ring (edges inclusive).
#[must_use]
pub fn contains(vertices: &[Vertex], point: DVec2) -> bool {
    let n = vertices.len();
    for i in 0..n {
        let vertex = vertices[i].position;
        let next = vertices[(i + 1) % n].position;
        if (point.x - vertex.x) * (next.y - vertex.y) + (point.y - vertex.y) * (vertex.x - next.x)
            > 0.0
        {
            return false;
        }
    }
    true
}

/// Convex hull of a point set (monotone chain), returned in clockwise
/// winding. Duplicate points are tolerated.
#[must_use]
pub fn hull(points: &[DVec2]) -> Vec<DVec2> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted: Vec<DVec2> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });

    let turns_right = |o: DVec2, a: DVec2, b: DVec2| math::cross(a - o, b - o) <= 0.0;

    let mut lower: Vec<DVec2> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && turns_right(lower[lower.len() - 2], lower[lower.len() - 1], p) {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<DVec2> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && turns_right(upper[upper.len() - 2], upper[upper.len() - 1], p) {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if points_area(&lower, true) < 0.0 {
        lower.reverse();
    }
    lower
}

// ============================================================================
// Tests
// ============================================================================
