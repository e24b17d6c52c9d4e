//! Axis-Aligned Bounding Boxes
//!
//! AABBs are recomputed from a body's world-space vertex ring every time the
//! ring moves, optionally expanded along the body's velocity so that the
//! broadphase sees where the body is about to be, not just where it is.

use glam::DVec2;

use crate::vertices::Vertex;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Minimum corner
    pub min: DVec2,
    /// Maximum corner
    pub max: DVec2,
}

impl Bounds {
    /// Bounds covering the whole plane. Used as the default world extent.
    pub const EVERYTHING: Self = Self {
        min: DVec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        max: DVec2::new(f64::INFINITY, f64::INFINITY),
    };

    /// Create bounds from explicit corners.
    #[inline]
    #[must_use]
    pub const fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Empty bounds, ready to be grown by [`Bounds::update`].
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min: DVec2::new(f64::INFINITY, f64::INFINITY),
            max: DVec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Create bounds enclosing a vertex ring.
    #[must_use]
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        let mut bounds = Self::empty();
        bounds.update(vertices, DVec2::ZERO);
        bounds
    }

    /// Recompute the bounds from a vertex ring, then expand them along
    /// `velocity` so a moving body's bounds cover its next position too.
    pub fn update(&mut self, vertices: &[Vertex], velocity: DVec2) {
        self.min = DVec2::new(f64::INFINITY, f64::INFINITY);
        self.max = DVec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);

        for vertex in vertices {
            let p = vertex.position;
            if p.x > self.max.x {
                self.max.x = p.x;
            }
            if p.x < self.min.x {
                self.min.x = p.x;
            }
            if p.y > self.max.y {
                self.max.y = p.y;
            }
            if p.y < self.min.y {
                self.min.y = p.y;
            }
        }

        if velocity.x > 0.0 {
            self.max.x += velocity.x;
        } else {
            self.min.x += velocity.x;
        }
        if velocity.y > 0.0 {
            self.max.y += velocity.y;
        } else {
            self.min.y += velocity.y;
        }
    }

    /// Check whether two bounds overlap.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
    }

    /// Check whether a point lies inside the bounds.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Translate the bounds in place.
    #[inline]
    pub fn translate(&mut self, vector: DVec2) {
        self.min += vector;
        self.max += vector;
    }

    /// Grow to enclose another bounds.
    pub fn merge(&mut self, other: &Bounds) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
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

    fn square(size: f64) -> Vec<Vertex> {
        vertices::create(
            &[
                DVec2::new(0.0, 0.0),
                DVec2::new(size, 0.0),
                DVec2::new(size, size),
                DVec2::new(0.0, size),
            ],
            BodyId(0),
        )
    }

    #[test]
    fn test_update_encloses_vertices() {
        let verts = square(10.0);
        let bounds = Bounds::from_vertices(&verts);
        assert_eq!(bounds.min, DVec2::ZERO);
        assert_eq!(bounds.max, DVec2::new(10.0, 10.0));
    }

    #[test]
    fn test_update_expands_along_velocity() {
        let verts = square(10.0);
        let mut bounds = Bounds::empty();
        bounds.update(&verts, DVec2::new(3.0, -2.0));
        assert_eq!(bounds.max.x, 13.0, "positive velocity grows max");
        assert_eq!(bounds.min.y, -2.0, "negative velocity grows min");
        assert_eq!(bounds.min.x, 0.0);
        assert_eq!(bounds.max.y, 10.0);
    }

    #[test]
    fn test_overlaps() {
        let a = Bounds::new(DVec2::ZERO, DVec2::new(10.0, 10.0));
        let b = Bounds::new(DVec2::new(5.0, 5.0), DVec2::new(15.0, 15.0));
        let c = Bounds::new(DVec2::new(11.0, 0.0), DVec2::new(20.0, 10.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&Bounds::EVERYTHING));
    }

    #[test]
    fn test_contains() {
        let a = Bounds::new(DVec2::ZERO, DVec2::new(10.0, 10.0));
        assert!(a.contains(DVec2::new(5.0, 5.0)));
        assert!(a.contains(DVec2::new(0.0, 10.0)), "edges are inside");
        assert!(!a.contains(DVec2::new(-0.1, 5.0)));
    }

    #[test]
    fn test_translate() {
        let mut a = Bounds::new(DVec2::ZERO, DVec2::new(10.0, 10.0));
        a.translate(DVec2::new(2.0, -3.0));
        assert_eq!(a.min, DVec2::new(2.0, -3.0));
        assert_eq!(a.max, DVec2::new(12.0, 7.0));
    }
}
