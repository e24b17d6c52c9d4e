//! Body Pairs
//!
//! A pair is the persistent record of a potential or actual contact between
//! two parts. It outlives individual collisions: while the parts keep
//! touching, its contacts carry warm-start impulses; once they separate it
//! stays cached (inactive) until evicted for idleness.

use std::fmt;

use crate::body::{Body, BodyId};
use crate::collision::Collision;
use crate::contact::{Contact, ContactId};

/// Canonical unordered pair key: the two part ids packed `min ⇒ max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairKey(u64);

impl PairKey {
    /// Build the canonical key for two part ids, in either order.
    #[inline]
    #[must_use]
    pub fn new(a: BodyId, b: BodyId) -> Self {
        let (lo, hi) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        Self((u64::from(lo) << 32) | u64::from(hi))
    }

    /// The smaller part id.
    #[inline]
    #[must_use]
    pub fn lo(&self) -> BodyId {
        BodyId((self.0 >> 32) as u32)
    }

    /// The larger part id.
    #[inline]
    #[must_use]
    pub fn hi(&self) -> BodyId {
        BodyId(self.0 as u32)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}B{}", self.lo().0, self.hi().0)
    }
}

/// Persistent record of contact between two parts.
#[derive(Clone, Debug)]
pub struct Pair {
    /// Canonical key
    pub key: PairKey,
    /// Most recent colliding narrowphase result
    pub collision: Collision,
    /// Persistent contacts, keyed by [`ContactId`], kept while the pair lives
    pub contacts: Vec<Contact>,
    /// Contact ids active this step, in support order
    pub active_contacts: Vec<ContactId>,
    /// Depth of the current collision
    pub separation: f64,
    /// Whether the pair collided this step
    pub is_active: bool,
    /// Scratch flag used by the cache while re-confirming pairs
    pub confirmed_active: bool,
    /// Either body is a sensor: detect, but skip the solvers
    pub is_sensor: bool,
    /// Pair friction: `min` of the parents'
    pub friction: f64,
    /// Pair static friction: `max` of the parents'
    pub friction_static: f64,
    /// Pair restitution: `max` of the parents'
    pub restitution: f64,
    /// Pair slop: `max` of the parents'
    pub slop: f64,
    /// Sum of the parents' inverse masses
    pub inverse_mass: f64,
    /// Simulation time the pair was created (ms)
    pub time_created: f64,
    /// Simulation time the pair was last active (ms)
    pub time_updated: f64,
}

impl Pair {
    /// Create a pair from its first colliding result.
    #[must_use]
    pub fn new(collision: Collision, parent_a: &Body, parent_b: &Body, timestamp: f64) -> Self {
        let key = PairKey::new(collision.part_a.id, collision.part_b.id);
        let mut pair = Self {
            key,
            collision: collision.clone(),
            contacts: Vec::with_capacity(2),
            active_contacts: Vec::with_capacity(2),
            separation: 0.0,
            is_active: true,
            confirmed_active: true,
            is_sensor: parent_a.is_sensor || parent_b.is_sensor,
            friction: 0.0,
            friction_static: 0.0,
            restitution: 0.0,
            slop: 0.0,
            inverse_mass: 0.0,
            time_created: timestamp,
            time_updated: timestamp,
        };
        pair.update(collision, parent_a, parent_b, timestamp);
        pair
    }

    /// Refresh the pair from this step's colliding result: re-derive the
    /// pair material from the parents and rebuild the active contact set,
    /// reusing persistent contacts (and their accumulated impulses) by id.
    pub fn update(
        &mut self,
        collision: Collision,
        parent_a: &Body,
        parent_b: &Body,
        timestamp: f64,
    ) {
        self.inverse_mass = parent_a.inverse_mass + parent_b.inverse_mass;
        self.friction = parent_a.friction.min(parent_b.friction);
        self.friction_static = parent_a.friction_static.max(parent_b.friction_static);
        self.restitution = parent_a.restitution.max(parent_b.restitution);
        self.slop = parent_a.slop.max(parent_b.slop);
        self.is_sensor = parent_a.is_sensor || parent_b.is_sensor;

        self.active_contacts.clear();
        for support in &collision.supports {
            let id = ContactId::of(support);
            match self.contacts.iter_mut().find(|c| c.id == id) {
                Some(contact) => contact.vertex = *support,
                None => self.contacts.push(Contact::new(*support)),
            }
            self.active_contacts.push(id);
        }

        self.separation = collision.depth;
        self.collision = collision;
        self.set_active(true, timestamp);
    }

    /// Activate or deactivate the pair. Deactivation clears the active
    /// contact set but keeps the persistent contacts cached.
    pub fn set_active(&mut self, is_active: bool, timestamp: f64) {
        if is_active {
            self.is_active = true;
            self.time_updated = timestamp;
        } else {
            self.is_active = false;
            self.active_contacts.clear();
        }
    }

    /// Look up a persistent contact by id.
    #[inline]
    #[must_use]
    pub fn contact_mut(&mut self, id: ContactId) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id == id)
    }
}

// ============================================================================
// Tests
// ============================================================================
