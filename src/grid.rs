//! Broadphase: Uniform Spatial Hash Grid
//!
//! Divides the plane into uniform cells and tracks which bodies overlap
//! which cells. Candidate pairs are bodies sharing at least one cell; a
//! per-pair overlap counter tracks *how many* cells they share so that
//! multi-cell bodies appear in the candidate list exactly once and pairs
//! drop out only when their last shared cell empties.
//!
//! Bodies re-bucket only when their integer cell span (region) changes, so
//! resting bodies cost nothing here. A forced update (after structural
//! world changes) rebuilds everything from scratch.
//!
//! The pair map is ordered so the candidate list is rebuilt in a
//! deterministic order, independent of hash state.

use std::collections::{BTreeMap, HashMap};

use crate::body::BodyId;
use crate::bounds::Bounds;
use crate::composite::BodyStore;

/// Default cell size, in world units.
pub const DEFAULT_BUCKET_SIZE: f64 = 48.0;

/// Integer cell span `(columns, rows)` a body's bounds cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    /// First column covered
    pub start_col: i32,
    /// Last column covered
    pub end_col: i32,
    /// First row covered
    pub start_row: i32,
    /// Last row covered
    pub end_row: i32,
}

impl Region {
    /// Smallest region covering both spans.
    #[must_use]
    pub fn union(&self, other: &Region) -> Region {
        Region {
            start_col: self.start_col.min(other.start_col),
            end_col: self.end_col.max(other.end_col),
            start_row: self.start_row.min(other.start_row),
            end_row: self.end_row.max(other.end_row),
        }
    }

    /// Whether a cell lies inside the span.
    #[inline]
    #[must_use]
    pub fn contains(&self, col: i32, row: i32) -> bool {
        col >= self.start_col && col <= self.end_col && row >= self.start_row && row <= self.end_row
    }
}

/// The uniform-grid broadphase.
#[derive(Debug)]
pub struct Grid {
    /// Cell width in world units
    pub bucket_width: f64,
    /// Cell height in world units
    pub bucket_height: f64,
    buckets: HashMap<(i32, i32), Vec<BodyId>>,
    pairs: BTreeMap<(BodyId, BodyId), u32>,
    pairs_list: Vec<(BodyId, BodyId)>,
}

impl Grid {
    /// Create a grid with the given cell size.
    #[must_use]
    pub fn new(bucket_width: f64, bucket_height: f64) -> Self {
        Self {
            bucket_width,
            bucket_height,
            buckets: HashMap::new(),
            pairs: BTreeMap::new(),
            pairs_list: Vec::new(),
        }
    }

    /// Drop all buckets and candidate pairs.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.pairs.clear();
        self.pairs_list.clear();
    }

    /// Current candidate pairs, each body pair listed once.
    #[inline]
    #[must_use]
    pub fn pairs_list(&self) -> &[(BodyId, BodyId)] {
        &self.pairs_list
    }

    /// Cell span covered by a bounds rectangle.
    #[must_use]
    pub fn region_for(&self, bounds: &Bounds) -> Region {
        Region {
            start_col: (bounds.min.x / self.bucket_width).floor() as i32,
            end_col: (bounds.max.x / self.bucket_width).floor() as i32,
            start_row: (bounds.min.y / self.bucket_height).floor() as i32,
            end_row: (bounds.max.y / self.bucket_height).floor() as i32,
        }
    }

    /// Re-bucket bodies whose region changed (all of them when `force` is
    /// set) and rebuild the candidate list if anything moved.
    ///
    /// Bodies whose bounds lie wholly outside `world_bounds` are ignored.
    /// Sleeping bodies keep their buckets untouched.
    pub fn update(&mut self, bodies: &mut BodyStore, ids: &[BodyId], world_bounds: &Bounds, force: bool) {
        let mut grid_changed = false;

        for &id in ids {
            let Some(body) = bodies.get(id) else { continue };
            if body.is_sleeping && !force {
                continue;
            }

            let bounds = *body.bounds();
            let old_region = body.region;
            let is_static = body.is_static;

            if bounds.max.x < world_bounds.min.x
                || bounds.min.x > world_bounds.max.x
                || bounds.max.y < world_bounds.min.y
                || bounds.min.y > world_bounds.max.y
            {
                continue;
            }

            let new_region = self.region_for(&bounds);
            if old_region == Some(new_region) && !force {
                continue;
            }

            let fresh = force || old_region.is_none();
            let base = if fresh { new_region } else { old_region.unwrap() };
            let union = new_region.union(&base);

            for col in union.start_col..=union.end_col {
                for row in union.start_row..=union.end_row {
                    let in_new = new_region.contains(col, row);
                    let in_old = base.contains(col, row);

                    if !in_new && in_old {
                        self.bucket_remove((col, row), id);
                    }
                    if fresh || (in_new && !in_old) {
                        self.bucket_add(bodies, (col, row), id, is_static);
                    }
                }
            }

            if let Some(body) = bodies.get_mut(id) {
                body.region = Some(new_region);
            }
            grid_changed = true;
        }

        if grid_changed {
            self.rebuild_pairs_list();
        }
    }

    /// Insert a body into a cell, counting a shared cell against every
    /// other occupant. Static-static pairs are never recorded.
    fn bucket_add(&mut self, bodies: &BodyStore, cell: (i32, i32), id: BodyId, is_static: bool) {
        let Self { buckets, pairs, .. } = self;
        let bucket = buckets.entry(cell).or_default();
        for &other in bucket.iter() {
            if other == id {
                continue;
            }
            let other_static = bodies.get(other).is_some_and(|b| b.is_static);
            if is_static && other_static {
                continue;
            }
            let key = if other.0 < id.0 { (other, id) } else { (id, other) };
            *pairs.entry(key).or_insert(0) += 1;
        }
        bucket.push(id);
    }

    /// Remove a body from a cell, releasing one shared cell per remaining
    /// occupant.
    fn bucket_remove(&mut self, cell: (i32, i32), id: BodyId) {
        let Self { buckets, pairs, .. } = self;
        let Some(bucket) = buckets.get_mut(&cell) else {
            return;
        };
        if let Some(position) = bucket.iter().position(|&b| b == id) {
            bucket.remove(position);
        }
        for &other in bucket.iter() {
            let key = if other.0 < id.0 { (other, id) } else { (id, other) };
            if let Some(count) = pairs.get_mut(&key) {
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Rebuild the candidate list from the counted pair map, dropping pairs
    /// with no shared cells left.
    fn rebuild_pairs_list(&mut self) {
        let Self { pairs, pairs_list, .. } = self;
        pairs_list.clear();
        pairs.retain(|&key, count| {
            if *count > 0 {
                pairs_list.push(key);
                true
            } else {
                false
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyOptions};
    use glam::DVec2;

    fn body_at(position: DVec2, size: f64, id: u32, is_static: bool) -> Body {
        let half = size / 2.0;
        let mut body = Body::from_vertices(
            position,
            vec![
                DVec2::new(-half, -half),
                DVec2::new(half, -half),
                DVec2::new(half, half),
                DVec2::new(-half, half),
            ],
            BodyOptions {
                is_static,
                ..BodyOptions::default()
            },
        )
        .unwrap();
        let mut next = id;
        body.assign_ids(&mut next);
        body
    }

    fn store_with(bodies: Vec<Body>) -> (BodyStore, Vec<BodyId>) {
        let mut store = BodyStore::new();
        let mut ids = Vec::new();
        for body in bodies {
            ids.push(body.id);
            store.insert(body);
        }
        (store, ids)
    }

    #[test]
    fn test_nearby_bodies_become_candidates() {
        let (mut store, ids) = store_with(vec![
            body_at(DVec2::new(10.0, 10.0), 40.0, 1, false),
            body_at(DVec2::new(30.0, 10.0), 40.0, 2, false),
        ]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert_eq!(grid.pairs_list(), &[(BodyId(1), BodyId(2))]);
    }

    #[test]
    fn test_distant_bodies_are_not_candidates() {
        let (mut store, ids) = store_with(vec![
            body_at(DVec2::new(0.0, 0.0), 20.0, 1, false),
            body_at(DVec2::new(500.0, 500.0), 20.0, 2, false),
        ]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert!(grid.pairs_list().is_empty());
    }

    #[test]
    fn test_static_static_pairs_never_recorded() {
        let (mut store, ids) = store_with(vec![
            body_at(DVec2::new(10.0, 10.0), 40.0, 1, true),
            body_at(DVec2::new(30.0, 10.0), 40.0, 2, true),
        ]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert!(grid.pairs_list().is_empty());
    }

    #[test]
    fn test_multi_cell_overlap_lists_pair_once() {
        // Bodies spanning several cells share more than one bucket but must
        // appear exactly once in the candidate list.
        let (mut store, ids) = store_with(vec![
            body_at(DVec2::new(48.0, 48.0), 120.0, 1, false),
            body_at(DVec2::new(60.0, 48.0), 120.0, 2, false),
        ]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert_eq!(grid.pairs_list().len(), 1);
    }

    #[test]
    fn test_pair_dropped_when_body_moves_away() {
        let (mut store, ids) = store_with(vec![
            body_at(DVec2::new(10.0, 10.0), 40.0, 1, false),
            body_at(DVec2::new(30.0, 10.0), 40.0, 2, false),
        ]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert_eq!(grid.pairs_list().len(), 1);

        store
            .get_mut(BodyId(2))
            .unwrap()
            .set_position(DVec2::new(800.0, 800.0));
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert!(grid.pairs_list().is_empty());
    }

    #[test]
    fn test_region_change_is_incremental() {
        let (mut store, ids) = store_with(vec![body_at(DVec2::new(10.0, 10.0), 20.0, 1, false)]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        let first = store.get(BodyId(1)).unwrap().region.unwrap();

        // A small move inside the same cells does not change the region.
        store
            .get_mut(BodyId(1))
            .unwrap()
            .set_position(DVec2::new(12.0, 10.0));
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert_eq!(store.get(BodyId(1)).unwrap().region.unwrap(), first);

        // Crossing a cell border does.
        store
            .get_mut(BodyId(1))
            .unwrap()
            .set_position(DVec2::new(100.0, 10.0));
        grid.update(&mut store, &ids, &Bounds::EVERYTHING, false);
        assert_ne!(store.get(BodyId(1)).unwrap().region.unwrap(), first);
    }

    #[test]
    fn test_bodies_outside_world_bounds_ignored() {
        let world = Bounds::new(DVec2::new(0.0, 0.0), DVec2::new(200.0, 200.0));
        let (mut store, ids) = store_with(vec![
            body_at(DVec2::new(10.0, 10.0), 40.0, 1, false),
            body_at(DVec2::new(1000.0, 10.0), 40.0, 2, false),
        ]);
        let mut grid = Grid::new(DEFAULT_BUCKET_SIZE, DEFAULT_BUCKET_SIZE);
        grid.update(&mut store, &ids, &world, false);
        assert!(
            store.get(BodyId(2)).unwrap().region.is_none(),
            "out-of-world body was never bucketed"
        );
    }
}
