//! Projection Axes
//!
//! The SAT narrowphase projects vertex rings onto the edge normals of both
//! polygons. Parallel edges produce the same separating axis, so normals are
//! deduplicated by gradient: a rectangle contributes two axes, not four.
//! First-occurrence order is kept so axis indices stay stable for the
//! narrowphase's coherence reuse.

use glam::DVec2;

use crate::vertices::Vertex;

/// Gradient quantisation used for deduplication (three decimal places).
const GRADIENT_SCALE: f64 = 1000.0;

/// Compute the unit edge normals of a ring, deduplicated by gradient.
#[must_use]
pub fn from_vertices(vertices: &[Vertex]) -> Vec<DVec2> {
    let n = vertices.len();
    let mut axes: Vec<DVec2> = Vec::new();
    let mut gradients: Vec<i64> = Vec::new();

    for i in 0..n {
        let j = (i + 1) % n;
        let a = vertices[i].position;
        let b = vertices[j].position;
        let normal = DVec2::new(b.y - a.y, a.x - b.x).normalize_or_zero();
        if normal == DVec2::ZERO {
            // Degenerate edge (repeated vertex); no axis to project on.
            continue;
        }
        let gradient = if normal.y == 0.0 {
            f64::INFINITY
        } else {
            normal.x / normal.y
        };
        // Saturating cast maps the infinite gradient onto a single key.
        let key = (gradient * GRADIENT_SCALE).round() as i64;
        if !gradients.contains(&key) {
            gradients.push(key);
            axes.push(normal);
        }
    }
    axes
}

/// Rotate an axis set in place.
pub fn rotate(axes: &mut [DVec2], angle: f64) {
    if angle == 0.0 {
        return;
    }
    let (sin, cos) = angle.sin_cos();
    for axis in axes {
        *axis = DVec2::new(axis.x * cos - axis.y * sin, axis.x * sin + axis.y * cos);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;
    use crate::vertices;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_has_two_axes() {
        let verts = vertices::create(
            &[
                DVec2::new(0.0, 0.0),
                DVec2::new(40.0, 0.0),
                DVec2::new(40.0, 20.0),
                DVec2::new(0.0, 20.0),
            ],
            BodyId(0),
        );
        let axes = from_vertices(&verts);
        assert_eq!(axes.len(), 2, "parallel edges share an axis");
    }

    #[test]
    fn test_axes_are_unit_length() {
        let verts = vertices::create(
            &[
                DVec2::new(0.0, 0.0),
                DVec2::new(30.0, 10.0),
                DVec2::new(20.0, 40.0),
            ],
            BodyId(0),
        );
        for axis in from_vertices(&verts) {
            assert_relative_eq!(axis.length(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_triangle_has_three_axes() {
        let verts = vertices::create(
            &[
                DVec2::new(0.0, 0.0),
                DVec2::new(30.0, 10.0),
                DVec2::new(20.0, 40.0),
            ],
            BodyId(0),
        );
        assert_eq!(from_vertices(&verts).len(), 3);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let mut axes = vec![DVec2::X];
        rotate(&mut axes, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(axes[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(axes[0].y, 1.0, epsilon = 1e-12);
    }
}
