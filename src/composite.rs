//! World Composites
//!
//! The world is a tree of composites, each holding bodies, constraints and
//! child composites. Bodies and constraints themselves live in central
//! stores keyed by stable ids; composites only hold ids, so the tree can be
//! walked, translated or dissolved without touching ownership.
//!
//! Structural mutations set `is_modified` on the touched composite and all
//! its ancestors. The engine reads the root flag to force a broadphase
//! rebuild, then clears the whole tree.

use std::collections::HashMap;

use glam::DVec2;
use tracing::debug;

use crate::body::{Body, BodyId};
use crate::bounds::Bounds;
use crate::constraint::{Constraint, ConstraintId, ConstraintOptions};
use crate::error::PhysicsError;

/// Stable composite identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeId(pub u32);

// ============================================================================
// Stores
// ============================================================================

/// Central body storage: insertion-ordered list plus an id index.
/// Iteration follows insertion order, which keeps stepping deterministic.
#[derive(Debug, Default)]
pub struct BodyStore {
    items: Vec<Body>,
    index: HashMap<BodyId, usize>,
}

impl BodyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a body (its id must already be assigned and unique).
    pub fn insert(&mut self, body: Body) {
        debug_assert!(
            !self.index.contains_key(&body.id),
            "duplicate body id {:?}",
            body.id
        );
        self.index.insert(body.id, self.items.len());
        self.items.push(body);
    }

    /// Look up a body by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    /// Look up a body mutably by id.
    #[inline]
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.index.get(&id).map(|&i| &mut self.items[i])
    }

    /// Borrow two distinct bodies mutably at once.
    pub fn pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut Body, &mut Body)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.items.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.items.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    /// Remove a body by id.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let position = self.index.remove(&id)?;
        let body = self.items.remove(position);
        for (i, item) in self.items.iter().enumerate().skip(position) {
            self.index.insert(item.id, i);
        }
        Some(body)
    }

    /// Iterate bodies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.items.iter()
    }

    /// Number of stored bodies.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Central constraint storage, mirroring [`BodyStore`].
#[derive(Debug, Default)]
pub struct ConstraintStore {
    items: Vec<Constraint>,
    index: HashMap<ConstraintId, usize>,
}

impl ConstraintStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a constraint (its id must already be assigned and unique).
    pub fn insert(&mut self, constraint: Constraint) {
        debug_assert!(
            !self.index.contains_key(&constraint.id),
            "duplicate constraint id {:?}",
            constraint.id
        );
        self.index.insert(constraint.id, self.items.len());
        self.items.push(constraint);
    }

    /// Look up a constraint by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ConstraintId) -> Option<&Constraint> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    /// Look up a constraint mutably by id.
    #[inline]
    pub fn get_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.index.get(&id).map(|&i| &mut self.items[i])
    }

    /// Remove a constraint by id.
    pub fn remove(&mut self, id: ConstraintId) -> Option<Constraint> {
        let position = self.index.remove(&id)?;
        let constraint = self.items.remove(position);
        for (i, item) in self.items.iter().enumerate().skip(position) {
            self.index.insert(item.id, i);
        }
        Some(constraint)
    }

    /// Number of stored constraints.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Composite tree
// ============================================================================

/// One node of the world tree.
#[derive(Debug)]
pub struct Composite {
    /// Stable id
    pub id: CompositeId,
    /// Parent node, `None` for the root
    pub parent: Option<CompositeId>,
    /// Child composites, in insertion order
    pub children: Vec<CompositeId>,
    /// Bodies directly in this node, in insertion order
    pub bodies: Vec<BodyId>,
    /// Constraints directly in this node, in insertion order
    pub constraints: Vec<ConstraintId>,
    /// Structural dirty flag
    pub is_modified: bool,
}

/// The world: a composite tree over central body/constraint stores, plus
/// gravity and broadphase bounds.
#[derive(Debug)]
pub struct World {
    composites: Vec<Composite>,
    composite_index: HashMap<CompositeId, usize>,
    pub(crate) bodies: BodyStore,
    pub(crate) constraints: ConstraintStore,
    root: CompositeId,
    next_id: u32,
    /// Gravity direction, applied as `mass * gravity * gravity_scale`
    pub gravity: DVec2,
    /// Gravity magnitude scale
    pub gravity_scale: f64,
    /// Bodies outside these bounds are ignored by the broadphase
    pub bounds: Bounds,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world with downward gravity and infinite bounds.
    #[must_use]
    pub fn new() -> Self {
        let root = CompositeId(1);
        let mut composite_index = HashMap::new();
        composite_index.insert(root, 0);
        Self {
            composites: vec![Composite {
                id: root,
                parent: None,
                children: Vec::new(),
                bodies: Vec::new(),
                constraints: Vec::new(),
                is_modified: false,
            }],
            composite_index,
            bodies: BodyStore::new(),
            constraints: ConstraintStore::new(),
            root,
            next_id: 2,
            gravity: DVec2::new(0.0, 1.0),
            gravity_scale: 0.001,
            bounds: Bounds::EVERYTHING,
        }
    }

    /// The root composite id.
    #[inline]
    #[must_use]
    pub fn root(&self) -> CompositeId {
        self.root
    }

    /// Look up a composite node.
    #[must_use]
    pub fn composite(&self, id: CompositeId) -> Option<&Composite> {
        self.composite_index.get(&id).map(|&i| &self.composites[i])
    }

    fn composite_mut(&mut self, id: CompositeId) -> Option<&mut Composite> {
        self.composite_index
            .get(&id)
            .map(|&i| &mut self.composites[i])
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a child composite under `parent`.
    pub fn add_composite(&mut self, parent: CompositeId) -> CompositeId {
        let id = CompositeId(self.alloc_id());
        self.composite_index.insert(id, self.composites.len());
        self.composites.push(Composite {
            id,
            parent: Some(parent),
            children: Vec::new(),
            bodies: Vec::new(),
            constraints: Vec::new(),
            is_modified: false,
        });
        if let Some(node) = self.composite_mut(parent) {
            node.children.push(id);
        }
        self.mark_modified(parent);
        debug!(composite = id.0, parent = parent.0, "composite added");
        id
    }

    /// Add a body to the root composite.
    pub fn add_body(&mut self, body: Body) -> BodyId {
        self.add_body_to(self.root, body)
    }

    /// Add a body to a specific composite. Assigns the body (and its parts)
    /// fresh world ids.
    pub fn add_body_to(&mut self, composite: CompositeId, mut body: Body) -> BodyId {
        let mut next = self.next_id;
        body.assign_ids(&mut next);
        self.next_id = next;
        let id = body.id;
        self.bodies.insert(body);
        if let Some(node) = self.composite_mut(composite) {
            node.bodies.push(id);
        }
        self.mark_modified(composite);
        debug!(body = id.0, composite = composite.0, "body added");
        id
    }

    /// Remove a body from the world, sweeping it from whichever composite
    /// holds it.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let body = self.bodies.remove(id)?;
        let mut holder = None;
        for node in &mut self.composites {
            if let Some(position) = node.bodies.iter().position(|&b| b == id) {
                node.bodies.remove(position);
                holder = Some(node.id);
                break;
            }
        }
        if let Some(holder) = holder {
            self.mark_modified(holder);
        }
        debug!(body = id.0, "body removed");
        Some(body)
    }

    /// Add a constraint between two optional bodies to the root composite.
    pub fn add_constraint(
        &mut self,
        body_a: Option<BodyId>,
        body_b: Option<BodyId>,
        options: ConstraintOptions,
    ) -> Result<ConstraintId, PhysicsError> {
        self.add_constraint_to(self.root, body_a, body_b, options)
    }

    /// Add a constraint to a specific composite. At least one endpoint body
    /// must be given, and referenced bodies must exist.
    pub fn add_constraint_to(
        &mut self,
        composite: CompositeId,
        body_a: Option<BodyId>,
        body_b: Option<BodyId>,
        options: ConstraintOptions,
    ) -> Result<ConstraintId, PhysicsError> {
        if body_a.is_none() && body_b.is_none() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "constraint requires at least one body",
            });
        }
        let unknown = PhysicsError::InvalidConfiguration {
            reason: "constraint references an unknown body",
        };
        let ref_a = match body_a {
            None => None,
            Some(id) => Some(self.bodies.get(id).ok_or(unknown.clone())?),
        };
        let ref_b = match body_b {
            None => None,
            Some(id) => Some(self.bodies.get(id).ok_or(unknown)?),
        };
        let mut constraint = Constraint::create(ref_a, ref_b, options);
        constraint.id = ConstraintId(self.alloc_id());
        let id = constraint.id;
        self.constraints.insert(constraint);
        if let Some(node) = self.composite_mut(composite) {
            node.constraints.push(id);
        }
        self.mark_modified(composite);
        debug!(constraint = id.0, "constraint added");
        Ok(id)
    }

    /// Remove a constraint from the world.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        let constraint = self.constraints.remove(id)?;
        let mut holder = None;
        for node in &mut self.composites {
            if let Some(position) = node.constraints.iter().position(|&c| c == id) {
                node.constraints.remove(position);
                holder = Some(node.id);
                break;
            }
        }
        if let Some(holder) = holder {
            self.mark_modified(holder);
        }
        Some(constraint)
    }

    /// Look up a body.
    #[inline]
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// Look up a body mutably.
    #[inline]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Look up a constraint.
    #[inline]
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    /// Look up a constraint mutably.
    #[inline]
    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.constraints.get_mut(id)
    }

    /// Iterate all bodies in insertion order (for queries and inspection;
    /// stepping uses the composite-tree order from [`all_bodies`](Self::all_bodies)).
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// All body ids, depth-first from the root: a node's own bodies first,
    /// then each child subtree in insertion order.
    #[must_use]
    pub fn all_bodies(&self) -> Vec<BodyId> {
        let mut out = Vec::with_capacity(self.bodies.len());
        self.collect_bodies(self.root, &mut out);
        out
    }

    fn collect_bodies(&self, id: CompositeId, out: &mut Vec<BodyId>) {
        let Some(node) = self.composite(id) else { return };
        out.extend_from_slice(&node.bodies);
        for &child in &node.children {
            self.collect_bodies(child, out);
        }
    }

    /// All constraint ids, in the same depth-first order.
    #[must_use]
    pub fn all_constraints(&self) -> Vec<ConstraintId> {
        let mut out = Vec::with_capacity(self.constraints.len());
        self.collect_constraints(self.root, &mut out);
        out
    }

    fn collect_constraints(&self, id: CompositeId, out: &mut Vec<ConstraintId>) {
        let Some(node) = self.composite(id) else { return };
        out.extend_from_slice(&node.constraints);
        for &child in &node.children {
            self.collect_constraints(child, out);
        }
    }

    /// Body ids in one composite's subtree.
    #[must_use]
    pub fn bodies_in(&self, composite: CompositeId) -> Vec<BodyId> {
        let mut out = Vec::new();
        self.collect_bodies(composite, &mut out);
        out
    }

    /// Whether any structural mutation happened since the last
    /// [`clear_modified`](Self::clear_modified).
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.composite(self.root).is_some_and(|c| c.is_modified)
    }

    /// Mark a composite and all its ancestors modified.
    pub fn mark_modified(&mut self, id: CompositeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            match self.composite_mut(id) {
                Some(node) => {
                    node.is_modified = true;
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    /// Clear the dirty flag on every composite.
    pub fn clear_modified(&mut self) {
        for node in &mut self.composites {
            node.is_modified = false;
        }
    }

    /// Translate every body in a composite's subtree.
    pub fn translate(&mut self, composite: CompositeId, translation: DVec2) {
        for id in self.bodies_in(composite) {
            if let Some(body) = self.bodies.get_mut(id) {
                body.translate(translation);
            }
        }
    }

    /// Rotate every body in a composite's subtree about a point.
    pub fn rotate(&mut self, composite: CompositeId, rotation: f64, point: DVec2) {
        for id in self.bodies_in(composite) {
            if let Some(body) = self.bodies.get_mut(id) {
                body.rotate(rotation, Some(point));
            }
        }
    }

    /// Scale every body in a composite's subtree about a point.
    pub fn scale(&mut self, composite: CompositeId, scale_x: f64, scale_y: f64, point: DVec2) {
        for id in self.bodies_in(composite) {
            if let Some(body) = self.bodies.get_mut(id) {
                body.scale(scale_x, scale_y, Some(point));
            }
        }
    }

    /// AABB enclosing every body in a composite's subtree.
    #[must_use]
    pub fn bounds_of(&self, composite: CompositeId) -> Bounds {
        let mut bounds = Bounds::empty();
        for id in self.bodies_in(composite) {
            if let Some(body) = self.bodies.get(id) {
                bounds.merge(body.bounds());
            }
        }
        bounds
    }
}

// ============================================================================
// Tests
// ============================================================================
