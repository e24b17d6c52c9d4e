//! Collision Filtering (Category/Mask/Group System)
//!
//! Bitmask-based collision filtering for controlling which bodies can
//! interact, with an additional signed group override.
//!
//! # Usage
//!
//! ```
//! use topple::filter::CollisionFilter;
//!
//! // Category 0 = terrain, category 1 = players, category 2 = debris
//! let terrain = CollisionFilter::new(1 << 0, u32::MAX);
//! let player = CollisionFilter::new(1 << 1, (1 << 0) | (1 << 1)); // ignores debris
//! let debris = CollisionFilter::new(1 << 2, 1 << 0);              // only hits terrain
//!
//! assert!(CollisionFilter::can_collide(&player, &terrain));
//! assert!(!CollisionFilter::can_collide(&player, &debris));
//! ```

/// Collision filter using category/mask bitmasks and a signed group.
///
/// If both filters share the same non-zero `group`, the group decides alone:
/// a positive shared group always collides, a negative one never does.
/// Otherwise two bodies collide iff
/// `(a.mask & b.category) != 0 && (b.mask & a.category) != 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionFilter {
    /// Which category bit(s) this body belongs to
    pub category: u32,
    /// Which categories this body can collide with (bitmask)
    pub mask: u32,
    /// Signed collision group; `0` means "use category/mask"
    pub group: i32,
}

impl CollisionFilter {
    /// Default filter: category 1, collides with everything.
    pub const DEFAULT: Self = Self {
        category: 1,
        mask: u32::MAX,
        group: 0,
    };

    /// Create a new filter from category and mask, group 0.
    #[inline]
    #[must_use]
    pub const fn new(category: u32, mask: u32) -> Self {
        Self {
            category,
            mask,
            group: 0,
        }
    }

    /// Set the signed group.
    #[inline]
    #[must_use]
    pub const fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    /// Check whether two filters allow collision.
    #[inline]
    #[must_use]
    pub fn can_collide(a: &Self, b: &Self) -> bool {
        if a.group == b.group && a.group != 0 {
            return a.group > 0;
        }
        (a.mask & b.category) != 0 && (b.mask & a.category) != 0
    }
}

impl Default for CollisionFilter {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_collide() {
        let a = CollisionFilter::default();
        let b = CollisionFilter::default();
        assert!(CollisionFilter::can_collide(&a, &b));
    }

    #[test]
    fn test_category_mask() {
        let terrain = CollisionFilter::new(1 << 0, u32::MAX);
        let player = CollisionFilter::new(1 << 1, (1 << 0) | (1 << 1));
        let debris = CollisionFilter::new(1 << 2, 1 << 0);

        assert!(CollisionFilter::can_collide(&player, &terrain));
        assert!(CollisionFilter::can_collide(&debris, &terrain));
        assert!(!CollisionFilter::can_collide(&player, &debris));
    }

    #[test]
    fn test_mask_must_be_mutual() {
        // A wants to hit B, but B masks A out.
        let a = CollisionFilter::new(1 << 0, 1 << 1);
        let b = CollisionFilter::new(1 << 1, 0);
        assert!(!CollisionFilter::can_collide(&a, &b));
    }

    #[test]
    fn test_positive_group_overrides_mask() {
        let a = CollisionFilter::new(1, 0).with_group(3);
        let b = CollisionFilter::new(2, 0).with_group(3);
        assert!(
            CollisionFilter::can_collide(&a, &b),
            "same positive group always collides"
        );
    }

    #[test]
    fn test_negative_group_overrides_mask() {
        let a = CollisionFilter::default().with_group(-2);
        let b = CollisionFilter::default().with_group(-2);
        assert!(
            !CollisionFilter::can_collide(&a, &b),
            "same negative group never collides"
        );
    }

    #[test]
    fn test_different_groups_fall_back_to_mask() {
        let a = CollisionFilter::default().with_group(-1);
        let b = CollisionFilter::default().with_group(-2);
        assert!(CollisionFilter::can_collide(&a, &b));
    }
}
