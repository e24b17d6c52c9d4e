//! Planar Math Helpers
//!
//! Thin extensions over [`glam::DVec2`] used throughout the engine: scalar
//! cross products, rotation about an arbitrary point, and the direction
//! angle between two points. All simulation state is `f64`.

use glam::DVec2;

/// 2D scalar cross product: `a.x * b.y - a.y * b.x`.
///
/// This is the z-component of the 3D cross product when both vectors are
/// embedded in the plane. Equivalent to [`DVec2::perp_dot`]; named here the
/// way the solver formulas read.
#[inline]
#[must_use]
pub fn cross(a: DVec2, b: DVec2) -> f64 {
    a.perp_dot(b)
}

/// Rotate a vector by an angle in radians.
#[inline]
#[must_use]
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    let (sin, cos) = angle.sin_cos();
    DVec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Rotate a point about another point by an angle in radians.
#[inline]
#[must_use]
pub fn rotate_about(v: DVec2, angle: f64, point: DVec2) -> DVec2 {
    point + rotate(v - point, angle)
}

/// Angle of the direction from `from` to `to`, in radians.
#[inline]
#[must_use]
pub fn angle(from: DVec2, to: DVec2) -> f64 {
    let d = to - from;
    d.y.atan2(d.x)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cross() {
        let a = DVec2::new(3.0, 4.0);
        let b = DVec2::new(2.0, 5.0);
        // 3*5 - 4*2 = 7
        assert_relative_eq!(cross(a, b), 7.0);
        assert_relative_eq!(cross(b, a), -7.0);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(DVec2::X, FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_about_round_trip() {
        let point = DVec2::new(10.0, -4.0);
        let v = DVec2::new(3.0, 7.0);
        let out = rotate_about(rotate_about(v, 0.83, point), -0.83, point);
        assert_relative_eq!(out.x, v.x, epsilon = 1e-9);
        assert_relative_eq!(out.y, v.y, epsilon = 1e-9);
    }

    #[test]
    fn test_angle() {
        assert_relative_eq!(angle(DVec2::ZERO, DVec2::new(5.0, 0.0)), 0.0);
        assert_relative_eq!(angle(DVec2::ZERO, DVec2::new(0.0, 3.0)), FRAC_PI_2);
    }
}
