//! Pair Cache
//!
//! Persists [`Pair`](crate::pair::Pair) records across steps. Lookups go
//! through a hash table keyed by the canonical pair key; iteration always
//! walks the insertion-ordered list, keeping step results independent of
//! hash order.
//!
//! Each step the cache classifies every colliding narrowphase result as a
//! started or still-active pair, deactivates pairs that stopped colliding,
//! and exposes the three sets for observers. Pairs idle for longer than
//! [`PairSet::max_idle_life`] are evicted, except that a pair touching a
//! sleeping body is kept alive by refreshing its timestamp.

use std::collections::HashMap;

use crate::body::BodyId;
use crate::collision::Collision;
use crate::composite::BodyStore;
use crate::pair::{Pair, PairKey};

/// Default idle lifetime of an inactive pair, in simulation milliseconds.
pub const PAIR_MAX_IDLE_LIFE: f64 = 1000.0;

/// The pair cache.
#[derive(Debug)]
pub struct PairSet {
    list: Vec<Pair>,
    table: HashMap<PairKey, usize>,
    collision_start: Vec<PairKey>,
    collision_active: Vec<PairKey>,
    collision_end: Vec<PairKey>,
    /// Idle eviction horizon (simulation ms)
    pub max_idle_life: f64,
}

impl Default for PairSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PairSet {
    /// Create an empty cache with the default idle lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            list: Vec::new(),
            table: HashMap::new(),
            collision_start: Vec::new(),
            collision_active: Vec::new(),
            collision_end: Vec::new(),
            max_idle_life: PAIR_MAX_IDLE_LIFE,
        }
    }

    /// Ingest this step's colliding results: promote, refresh or create
    /// pairs and rebuild the start/active/end sets.
    pub fn update(&mut self, collisions: &[Collision], bodies: &BodyStore, timestamp: f64) {
        self.collision_start.clear();
        self.collision_active.clear();
        self.collision_end.clear();

        for pair in &mut self.list {
            pair.confirmed_active = false;
        }

        for collision in collisions {
            let (Some(parent_a), Some(parent_b)) = (
                bodies.get(collision.parent_a()),
                bodies.get(collision.parent_b()),
            ) else {
                continue;
            };

            let key = PairKey::new(collision.part_a.id, collision.part_b.id);
            match self.table.get(&key).copied() {
                Some(index) => {
                    let pair = &mut self.list[index];
                    if pair.is_active {
                        self.collision_active.push(key);
                    } else {
                        self.collision_start.push(key);
                    }
                    pair.update(collision.clone(), parent_a, parent_b, timestamp);
                    pair.confirmed_active = true;
                }
                None => {
                    let mut pair = Pair::new(collision.clone(), parent_a, parent_b, timestamp);
                    pair.confirmed_active = true;
                    self.table.insert(key, self.list.len());
                    self.list.push(pair);
                    self.collision_start.push(key);
                }
            }
        }

        // Anything active but not re-confirmed has separated this step.
        for pair in &mut self.list {
            if pair.is_active && !pair.confirmed_active {
                pair.set_active(false, timestamp);
                self.collision_end.push(pair.key);
            }
        }
    }

    /// Evict pairs idle for longer than [`max_idle_life`](Self::max_idle_life)
    /// or whose bodies left the world. Pairs touching a sleeping body get
    /// their timestamp refreshed instead, so warm contacts survive sleep.
    pub fn remove_old(&mut self, bodies: &BodyStore, timestamp: f64) {
        for pair in &mut self.list {
            if let (Some(a), Some(b)) = (
                bodies.get(pair.collision.parent_a()),
                bodies.get(pair.collision.parent_b()),
            ) {
                if a.is_sleeping || b.is_sleeping {
                    pair.time_updated = timestamp;
                }
            }
        }

        let before = self.list.len();
        let max_idle = self.max_idle_life;
        self.list.retain(|pair| {
            let bodies_alive = bodies.get(pair.collision.parent_a()).is_some()
                && bodies.get(pair.collision.parent_b()).is_some();
            bodies_alive && timestamp - pair.time_updated <= max_idle
        });
        if self.list.len() != before {
            self.rebuild_table();
        }
    }

    /// Drop every pair whose either side belongs to the given body (id
    /// sweep used when a body is removed mid-session).
    pub fn remove_body(&mut self, body: BodyId) {
        let before = self.list.len();
        self.list
            .retain(|pair| pair.collision.parent_a() != body && pair.collision.parent_b() != body);
        if self.list.len() != before {
            self.rebuild_table();
        }
    }

    /// Remove all pairs.
    pub fn clear(&mut self) {
        self.list.clear();
        self.table.clear();
        self.collision_start.clear();
        self.collision_active.clear();
        self.collision_end.clear();
    }

    fn rebuild_table(&mut self) {
        self.table.clear();
        for (index, pair) in self.list.iter().enumerate() {
            self.table.insert(pair.key, index);
        }
    }

    /// All cached pairs, in creation order.
    #[inline]
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.list
    }

    #[inline]
    pub(crate) fn pairs_mut(&mut self) -> &mut [Pair] {
        &mut self.list
    }

    /// Look up a pair by key.
    #[must_use]
    pub fn get(&self, key: PairKey) -> Option<&Pair> {
        self.table.get(&key).map(|&index| &self.list[index])
    }

    /// Pairs that began colliding this step.
    #[inline]
    #[must_use]
    pub fn collision_start(&self) -> &[PairKey] {
        &self.collision_start
    }

    /// Pairs that were already colliding and still are.
    #[inline]
    #[must_use]
    pub fn collision_active(&self) -> &[PairKey] {
        &self.collision_active
    }

    /// Pairs that stopped colliding this step.
    #[inline]
    #[must_use]
    pub fn collision_end(&self) -> &[PairKey] {
        &self.collision_end
    }

    /// Number of cached pairs (active and inactive).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the cache is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyOptions};
    use crate::collision;
    use glam::DVec2;

    fn square(position: DVec2, id: u32) -> Body {
        let mut body = Body::from_vertices(
            position,
            vec![
                DVec2::new(-20.0, -20.0),
                DVec2::new(20.0, -20.0),
                DVec2::new(20.0, 20.0),
                DVec2::new(-20.0, 20.0),
            ],
            BodyOptions::default(),
        )
        .unwrap();
        let mut next = id;
        body.assign_ids(&mut next);
        body
    }

    fn store_with(bodies: Vec<Body>) -> BodyStore {
        let mut store = BodyStore::new();
        for body in bodies {
            store.insert(body);
        }
        store
    }

    fn collide(store: &BodyStore, a: u32, b: u32) -> Vec<Collision> {
        let body_a = store.get(crate::body::BodyId(a)).unwrap();
        let body_b = store.get(crate::body::BodyId(b)).unwrap();
        collision::collides(body_a, 0, body_b, 0, None)
            .into_iter()
            .collect()
    }

    #[test]
    fn test_pair_lifecycle() {
        let store = store_with(vec![
            square(DVec2::new(0.0, 0.0), 1),
            square(DVec2::new(35.0, 0.0), 2),
        ]);
        let mut pairs = PairSet::new();

        // Step 1: contact begins.
        let collisions = collide(&store, 1, 2);
        pairs.update(&collisions, &store, 0.0);
        assert_eq!(pairs.collision_start().len(), 1);
        assert_eq!(pairs.collision_active().len(), 0);
        assert_eq!(pairs.len(), 1);

        // Step 2: contact persists.
        pairs.update(&collisions, &store, 16.0);
        assert_eq!(pairs.collision_start().len(), 0);
        assert_eq!(pairs.collision_active().len(), 1);
        assert_eq!(pairs.collision_end().len(), 0);

        // Step 3: bodies separated: contact ends, pair stays cached.
        pairs.update(&[], &store, 32.0);
        assert_eq!(pairs.collision_end().len(), 1);
        assert_eq!(pairs.len(), 1);
        assert!(!pairs.pairs()[0].is_active);

        // Re-contact is a fresh start event.
        pairs.update(&collisions, &store, 48.0);
        assert_eq!(pairs.collision_start().len(), 1);
    }

    #[test]
    fn test_idle_pairs_are_evicted() {
        let store = store_with(vec![
            square(DVec2::new(0.0, 0.0), 1),
            square(DVec2::new(35.0, 0.0), 2),
        ]);
        let mut pairs = PairSet::new();
        let collisions = collide(&store, 1, 2);

        pairs.update(&collisions, &store, 0.0);
        pairs.update(&[], &store, 16.0);
        assert_eq!(pairs.len(), 1);

        pairs.remove_old(&store, 500.0);
        assert_eq!(pairs.len(), 1, "young pairs survive");

        pairs.remove_old(&store, 1100.0);
        assert_eq!(pairs.len(), 0, "idle pairs are evicted after the horizon");
    }

    #[test]
    fn test_sleeping_body_keeps_pair_alive() {
        let mut store = store_with(vec![
            square(DVec2::new(0.0, 0.0), 1),
            square(DVec2::new(35.0, 0.0), 2),
        ]);
        let mut pairs = PairSet::new();
        let collisions = collide(&store, 1, 2);
        pairs.update(&collisions, &store, 0.0);

        store
            .get_mut(crate::body::BodyId(1))
            .unwrap()
            .set_sleeping(true);
        pairs.remove_old(&store, 5000.0);
        assert_eq!(pairs.len(), 1, "sleeping pairs are refreshed, not evicted");
    }

    #[test]
    fn test_remove_body_sweeps_pairs() {
        let store = store_with(vec![
            square(DVec2::new(0.0, 0.0), 1),
            square(DVec2::new(35.0, 0.0), 2),
        ]);
        let mut pairs = PairSet::new();
        pairs.update(&collide(&store, 1, 2), &store, 0.0);
        assert_eq!(pairs.len(), 1);

        pairs.remove_body(crate::body::BodyId(2));
        assert_eq!(pairs.len(), 0);
    }

    #[test]
    fn test_table_matches_list() {
        let store = store_with(vec![
            square(DVec2::new(0.0, 0.0), 1),
            square(DVec2::new(35.0, 0.0), 2),
            square(DVec2::new(70.0, 0.0), 3),
        ]);
        let mut pairs = PairSet::new();
        let mut collisions = collide(&store, 1, 2);
        collisions.extend(collide(&store, 2, 3));
        pairs.update(&collisions, &store, 0.0);

        assert_eq!(pairs.len(), 2);
        for pair in pairs.pairs() {
            let found = pairs.get(pair.key).expect("every listed pair is indexed");
            assert_eq!(found.key, pair.key);
        }
    }
}
