//! Rigid Bodies
//!
//! A body is a convex polygon (or a compound of several) with Verlet-style
//! kinematic state: velocity is implied by `position - position_prev`, so the
//! solvers can change velocity by shifting `position_prev` and change
//! position without adding velocity by shifting both.
//!
//! # Parts
//!
//! Every body has at least one part; part 0 is the identity part whose
//! geometry, position and bounds stand for the whole body. Compound bodies
//! built with [`Body::compound`] carry their pieces as parts 1.., and the
//! narrowphase tests part pairs individually.
//!
//! # Units
//!
//! Positions are world units, angles radians, time milliseconds. Gravity is
//! applied as a per-step force `mass * gravity * gravity_scale`.

use glam::DVec2;
use tracing::trace;

use crate::axes;
use crate::bounds::Bounds;
use crate::error::PhysicsError;
use crate::filter::CollisionFilter;
use crate::grid::Region;
use crate::math;
use crate::vertices::{self, Vertex};

/// Stable body identifier, allocated by the world and never reused.
///
/// Compound parts receive their own ids from the same sequence; contact
/// identity is expressed in part ids. Id 0 marks a body not yet added to a
/// world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyId(pub u32);

/// Moment-of-area multiplier applied when deriving inertia from geometry.
pub(crate) const INERTIA_SCALE: f64 = 4.0;

/// Smallest mass a dynamic body can have; zero or negative mass clamps here.
pub(crate) const MIN_MASS: f64 = 1e-12;

/// Smallest inertia a dynamic body can have.
pub(crate) const MIN_INERTIA: f64 = 1e-12;

/// Accumulated constraint impulse, carried across steps for warm starting.
/// The angular component lives alongside the positional one so the whole
/// cache warms and decays together.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstraintImpulse {
    /// Positional component
    pub offset: DVec2,
    /// Angular component (radians)
    pub angle: f64,
}

impl ConstraintImpulse {
    /// Whether any component is non-zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.offset.x == 0.0 && self.offset.y == 0.0 && self.angle == 0.0
    }
}

/// Material and mass state saved when a body is made static, restored when
/// it is made dynamic again.
#[derive(Clone, Copy, Debug)]
struct StaticBackup {
    restitution: f64,
    friction: f64,
    mass: f64,
    inertia: f64,
    density: f64,
    inverse_mass: f64,
    inverse_inertia: f64,
}

/// One convex piece of a body. Part 0 is the identity part.
#[derive(Clone, Debug)]
pub struct Part {
    /// Part id (equals the body id for part 0)
    pub id: BodyId,
    /// Centroid position in world space
    pub position: DVec2,
    /// World-space vertex ring, clockwise
    pub vertices: Vec<Vertex>,
    /// Unit edge normals, deduplicated by gradient
    pub axes: Vec<DVec2>,
    /// AABB of the ring, velocity-expanded
    pub bounds: Bounds,
    /// Ring area
    pub area: f64,
    /// Part mass
    pub mass: f64,
    /// Part inertia about its centroid
    pub inertia: f64,
}

/// Construction options for [`Body::from_vertices`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyOptions {
    /// Mass per unit area; mass is derived as `density * area`
    pub density: f64,
    /// Kinetic friction coefficient (0 = frictionless)
    pub friction: f64,
    /// Static friction multiplier applied on top of `friction`
    pub friction_static: f64,
    /// Air drag applied by the integrator each step
    pub friction_air: f64,
    /// Restitution (bounciness, 0..1)
    pub restitution: f64,
    /// Allowed penetration before the position solver pushes back
    pub slop: f64,
    /// Create the body static (infinite mass)
    pub is_static: bool,
    /// Sensor bodies detect overlap but produce no collision response
    pub is_sensor: bool,
    /// Initial angle in radians
    pub angle: f64,
    /// Steps of low motion before the body may sleep (0 disables sleeping)
    pub sleep_threshold: u32,
    /// Collision filter
    pub collision_filter: CollisionFilter,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            density: 0.001,
            friction: 0.1,
            friction_static: 0.5,
            friction_air: 0.01,
            restitution: 0.0,
            slop: 0.05,
            is_static: false,
            is_sensor: false,
            angle: 0.0,
            sleep_threshold: 60,
            collision_filter: CollisionFilter::DEFAULT,
        }
    }
}

/// A rigid body.
#[derive(Clone, Debug)]
pub struct Body {
    /// Stable id; 0 until the body is added to a world
    pub id: BodyId,

    // Kinematics
    /// Centre of mass in world space
    pub position: DVec2,
    /// Position at the end of the previous step
    pub position_prev: DVec2,
    /// Orientation in radians
    pub angle: f64,
    /// Angle at the end of the previous step
    pub angle_prev: f64,
    /// Per-step displacement (implied velocity)
    pub velocity: DVec2,
    /// Per-step angular displacement
    pub angular_velocity: f64,
    /// `|velocity|`, maintained by the integrator
    pub speed: f64,
    /// `|angular_velocity|`
    pub angular_speed: f64,

    // Accumulators
    /// Force accumulator, cleared at the end of each step
    pub force: DVec2,
    /// Torque accumulator, cleared at the end of each step
    pub torque: f64,
    /// Positional-solver impulse accumulator, warmed across steps
    pub position_impulse: DVec2,
    /// Constraint-solver impulse cache, warmed across steps
    pub constraint_impulse: ConstraintImpulse,
    /// Contact count for the current step's position solve
    pub total_contacts: u32,

    // Mass properties
    /// Mass (infinite when static)
    pub mass: f64,
    /// `1 / mass`, 0 when static
    pub inverse_mass: f64,
    /// Moment of inertia (infinite when static)
    pub inertia: f64,
    /// `1 / inertia`, 0 when static
    pub inverse_inertia: f64,
    /// Mass per unit area
    pub density: f64,
    /// Total ring area
    pub area: f64,

    // Material
    /// Kinetic friction coefficient
    pub friction: f64,
    /// Static friction multiplier
    pub friction_static: f64,
    /// Air drag used by the integrator
    pub friction_air: f64,
    /// Restitution
    pub restitution: f64,
    /// Allowed penetration
    pub slop: f64,

    // Flags and filters
    /// Static bodies never move and never sleep-count
    pub is_static: bool,
    /// Sleeping bodies are skipped by integration and solving
    pub is_sleeping: bool,
    /// Sensors detect but do not resolve
    pub is_sensor: bool,
    /// Consecutive low-motion steps so far
    pub sleep_counter: u32,
    /// Low-motion steps required to fall asleep (0 disables)
    pub sleep_threshold: u32,
    /// Filtered kinetic motion metric used by the sleeping controller
    pub motion: f64,
    /// Collision filter
    pub collision_filter: CollisionFilter,

    // Geometry
    /// Parts; part 0 is the identity part
    pub parts: Vec<Part>,
    /// Current broadphase cell span, `None` until first bucketing
    pub region: Option<Region>,

    static_backup: Option<StaticBackup>,
}

impl Body {
    /// Create a body from a polygon ring.
    ///
    /// `points` may be in any translation (they are re-centred on the ring
    /// centroid and placed at `position`) and either winding; they must form
    /// a convex ring with finite coordinates.
    pub fn from_vertices(
        position: DVec2,
        points: Vec<DVec2>,
        options: BodyOptions,
    ) -> Result<Self, PhysicsError> {
        let mut body = Self {
            id: BodyId(0),
            position,
            position_prev: position,
            angle: 0.0,
            angle_prev: 0.0,
            velocity: DVec2::ZERO,
            angular_velocity: 0.0,
            speed: 0.0,
            angular_speed: 0.0,
            force: DVec2::ZERO,
            torque: 0.0,
            position_impulse: DVec2::ZERO,
            constraint_impulse: ConstraintImpulse::default(),
            total_contacts: 0,
            mass: 0.0,
            inverse_mass: 0.0,
            inertia: 0.0,
            inverse_inertia: 0.0,
            density: options.density,
            area: 0.0,
            friction: options.friction,
            friction_static: options.friction_static,
            friction_air: options.friction_air,
            restitution: options.restitution,
            slop: options.slop,
            is_static: false,
            is_sleeping: false,
            is_sensor: options.is_sensor,
            sleep_counter: 0,
            sleep_threshold: options.sleep_threshold,
            motion: 0.0,
            collision_filter: options.collision_filter,
            parts: Vec::new(),
            region: None,
            static_backup: None,
        };
        body.set_vertices(points)?;
        if options.angle != 0.0 {
            body.set_angle(options.angle);
        }
        if options.is_static {
            body.set_static(true);
        }
        Ok(body)
    }

    /// Build a compound body from single-part bodies.
    ///
    /// The children's geometry stays where it is; the compound's position
    /// becomes the mass-weighted centroid and its mass/area/inertia the part
    /// sums. With `auto_hull` the identity part becomes the convex hull of
    /// all pieces, otherwise it mirrors the first piece.
    pub fn compound(
        children: Vec<Body>,
        auto_hull: bool,
        options: BodyOptions,
    ) -> Result<Self, PhysicsError> {
        if children.is_empty() {
            return Err(PhysicsError::EmptyVertices);
        }

        let child_parts: Vec<Part> = children
            .into_iter()
            .map(|mut b| b.parts.swap_remove(0))
            .collect();

        let first_ring: Vec<DVec2> = child_parts[0].vertices.iter().map(|v| v.position).collect();
        let mut body = Self::from_vertices(child_parts[0].position, first_ring, options)?;
        body.parts.truncate(1);
        body.parts.extend(child_parts);

        if auto_hull {
            let all_points: Vec<DVec2> = body.parts[1..]
                .iter()
                .flat_map(|p| p.vertices.iter().map(|v| v.position))
                .collect();
            let hull = vertices::hull(&all_points);
            let hull_centre = vertices::centroid(&vertices::create(&hull, BodyId(0)));
            body.position = hull_centre;
            body.position_prev = hull_centre;
            let hull_relative: Vec<DVec2> = hull.iter().map(|&p| p - hull_centre).collect();
            body.set_vertices(hull_relative)?;
        }

        let mut mass = 0.0;
        let mut area = 0.0;
        let mut inertia = 0.0;
        let mut centre = DVec2::ZERO;
        for part in &body.parts[1..] {
            mass += part.mass;
            area += part.area;
            inertia += part.inertia;
            centre += part.position * part.mass;
        }
        let centre = centre / mass;

        body.area = area;
        body.set_mass(mass);
        body.set_inertia(inertia);
        body.position = centre;
        body.position_prev = centre;
        body.parts[0].position = centre;
        Ok(body)
    }

    /// Assign world ids to the body and its parts from an id counter. The
    /// identity part shares the body id; extra parts draw fresh ids so
    /// contact identity stays unique across the whole world.
    pub(crate) fn assign_ids(&mut self, next_id: &mut u32) {
        self.id = BodyId(*next_id);
        *next_id += 1;
        for (i, part) in self.parts.iter_mut().enumerate() {
            let part_id = if i == 0 {
                self.id
            } else {
                let id = BodyId(*next_id);
                *next_id += 1;
                id
            };
            part.id = part_id;
            for vertex in &mut part.vertices {
                vertex.body = part_id;
            }
        }
    }

    /// Replace the identity part's ring. Mass, inertia, axes and bounds are
    /// recomputed; the ring is re-centred on its centroid at the body
    /// position.
    pub fn set_vertices(&mut self, points: Vec<DVec2>) -> Result<(), PhysicsError> {
        let points = vertices::normalize(points)?;
        let part_id = self.parts.first().map_or(self.id, |p| p.id);

        let mut verts = vertices::create(&points, part_id);
        let axes_set = axes::from_vertices(&verts);
        let area = vertices::area(&verts, false);
        self.area = area;
        self.set_mass(self.density * area);

        let centre = vertices::centroid(&verts);
        vertices::translate(&mut verts, -centre);
        self.set_inertia(INERTIA_SCALE * vertices::inertia(&verts, self.mass));
        vertices::translate(&mut verts, self.position);

        let mut bounds = Bounds::empty();
        bounds.update(&verts, self.velocity);

        let part = Part {
            id: part_id,
            position: self.position,
            vertices: verts,
            axes: axes_set,
            bounds,
            area,
            mass: self.mass,
            inertia: self.inertia,
        };
        if self.parts.is_empty() {
            self.parts.push(part);
        } else {
            self.parts[0] = part;
        }
        Ok(())
    }

    /// The body's AABB (the identity part's bounds).
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.parts[0].bounds
    }

    /// The body's world-space vertex ring (the identity part's).
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.parts[0].vertices
    }

    /// Set the mass, rescaling inertia to keep the moment consistent.
    /// Non-positive or non-finite mass clamps to a small minimum.
    pub fn set_mass(&mut self, mass: f64) {
        let mass = if mass.is_finite() && mass > 0.0 {
            mass.max(MIN_MASS)
        } else {
            MIN_MASS
        };
        if self.inertia.is_finite() && self.inertia > 0.0 && self.mass.is_finite() && self.mass > 0.0
        {
            let moment = self.inertia / (self.mass / 6.0);
            self.inertia = moment * (mass / 6.0);
            self.inverse_inertia = 1.0 / self.inertia;
        }
        self.mass = mass;
        self.inverse_mass = 1.0 / mass;
        if self.area > 0.0 {
            self.density = mass / self.area;
        }
    }

    /// Set the density and derive mass from the current area.
    pub fn set_density(&mut self, density: f64) {
        self.set_mass(density * self.area);
        self.density = density;
    }

    /// Set the moment of inertia. Non-positive values clamp to a minimum.
    pub fn set_inertia(&mut self, inertia: f64) {
        let inertia = if inertia.is_finite() && inertia > 0.0 {
            inertia.max(MIN_INERTIA)
        } else {
            MIN_INERTIA
        };
        self.inertia = inertia;
        self.inverse_inertia = 1.0 / inertia;
    }

    /// Make the body static (infinite mass, zero inverse) or restore it to
    /// the dynamic state it had before it was made static.
    pub fn set_static(&mut self, is_static: bool) {
        if is_static == self.is_static {
            return;
        }
        if is_static {
            self.static_backup = Some(StaticBackup {
                restitution: self.restitution,
                friction: self.friction,
                mass: self.mass,
                inertia: self.inertia,
                density: self.density,
                inverse_mass: self.inverse_mass,
                inverse_inertia: self.inverse_inertia,
            });
            self.restitution = 0.0;
            self.friction = 1.0;
            self.mass = f64::INFINITY;
            self.inertia = f64::INFINITY;
            self.density = f64::INFINITY;
            self.inverse_mass = 0.0;
            self.inverse_inertia = 0.0;
            self.position_prev = self.position;
            self.angle_prev = self.angle;
            self.velocity = DVec2::ZERO;
            self.angular_velocity = 0.0;
            self.speed = 0.0;
            self.angular_speed = 0.0;
            self.motion = 0.0;
            self.is_static = true;
        } else {
            if let Some(backup) = self.static_backup.take() {
                self.restitution = backup.restitution;
                self.friction = backup.friction;
                self.mass = backup.mass;
                self.inertia = backup.inertia;
                self.density = backup.density;
                self.inverse_mass = backup.inverse_mass;
                self.inverse_inertia = backup.inverse_inertia;
            }
            self.is_static = false;
        }
    }

    /// Teleport the body (no velocity change); all parts follow.
    pub fn set_position(&mut self, position: DVec2) {
        let delta = position - self.position;
        self.position_prev += delta;
        self.position = position;
        let velocity = self.velocity;
        for part in &mut self.parts {
            part.position += delta;
            vertices::translate(&mut part.vertices, delta);
            part.bounds.update(&part.vertices, velocity);
        }
    }

    /// Translate by a vector (no velocity change).
    #[inline]
    pub fn translate(&mut self, translation: DVec2) {
        self.set_position(self.position + translation);
    }

    /// Set the orientation (no angular velocity change); vertices and axes
    /// rotate about the body position.
    pub fn set_angle(&mut self, angle: f64) {
        let delta = angle - self.angle;
        self.angle_prev += delta;
        self.angle = angle;
        let position = self.position;
        let velocity = self.velocity;
        for (i, part) in self.parts.iter_mut().enumerate() {
            vertices::rotate(&mut part.vertices, delta, position);
            axes::rotate(&mut part.axes, delta);
            part.bounds.update(&part.vertices, velocity);
            if i > 0 {
                part.position = math::rotate_about(part.position, delta, position);
            }
        }
    }

    /// Rotate by an angle, optionally about a world point instead of the
    /// body position.
    pub fn rotate(&mut self, rotation: f64, point: Option<DVec2>) {
        match point {
            None => self.set_angle(self.angle + rotation),
            Some(p) => {
                let position = math::rotate_about(self.position, rotation, p);
                self.set_position(position);
                self.set_angle(self.angle + rotation);
            }
        }
    }

    /// Scale the body about a point (defaults to the body position),
    /// recomputing axes, area, mass and inertia.
    pub fn scale(&mut self, scale_x: f64, scale_y: f64, point: Option<DVec2>) {
        let point = point.unwrap_or(self.position);
        let density = self.density;
        let velocity = self.velocity;

        let mut total_area = 0.0;
        let mut total_inertia = 0.0;
        for part in &mut self.parts {
            vertices::scale(&mut part.vertices, scale_x, scale_y, point);
            part.axes = axes::from_vertices(&part.vertices);
            part.area = vertices::area(&part.vertices, false);
            part.mass = density * part.area;
            let centre = part.position;
            vertices::translate(&mut part.vertices, -centre);
            part.inertia = INERTIA_SCALE * vertices::inertia(&part.vertices, part.mass);
            vertices::translate(&mut part.vertices, centre);
            total_area += part.area;
            total_inertia += part.inertia;
            part.position = point + (part.position - point) * DVec2::new(scale_x, scale_y);
            part.bounds.update(&part.vertices, velocity);
        }

        if self.parts.len() > 1 {
            // Compound: identity part is a derived hull, skip its share.
            total_area -= self.parts[0].area;
            total_inertia -= self.parts[0].inertia;
        }
        self.area = total_area;
        self.position = self.parts[0].position;
        if !self.is_static {
            self.set_mass(density * total_area);
            self.set_inertia(total_inertia);
        }
    }

    /// Set the velocity by adjusting `position_prev`.
    pub fn set_velocity(&mut self, velocity: DVec2) {
        self.position_prev = self.position - velocity;
        self.velocity = velocity;
        self.speed = velocity.length();
    }

    /// Set the angular velocity by adjusting `angle_prev`.
    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        self.angle_prev = self.angle - angular_velocity;
        self.angular_velocity = angular_velocity;
        self.angular_speed = angular_velocity.abs();
    }

    /// Accumulate a force applied at a world point; an off-centre point also
    /// accumulates torque.
    pub fn apply_force(&mut self, position: DVec2, force: DVec2) {
        self.force += force;
        let offset = position - self.position;
        self.torque += math::cross(offset, force);
    }

    /// Put the body to sleep or wake it. Falling asleep zeroes velocities
    /// and the positional impulse cache so the body stays exactly put.
    pub fn set_sleeping(&mut self, is_sleeping: bool) {
        if is_sleeping {
            if !self.is_sleeping {
                trace!(body = self.id.0, "body fell asleep");
            }
            self.is_sleeping = true;
            self.sleep_counter = self.sleep_threshold;
            self.position_impulse = DVec2::ZERO;
            self.position_prev = self.position;
            self.angle_prev = self.angle;
            self.velocity = DVec2::ZERO;
            self.angular_velocity = 0.0;
            self.speed = 0.0;
            self.angular_speed = 0.0;
            self.motion = 0.0;
        } else {
            if self.is_sleeping {
                trace!(body = self.id.0, "body woke");
            }
            self.is_sleeping = false;
            self.sleep_counter = 0;
        }
    }

    /// Integrate one step of Time-Corrected Verlet with air drag.
    ///
    /// `delta` is the step in milliseconds, `time_scale` the global scale,
    /// `correction` the ratio `delta / delta_prev` supplied by the caller's
    /// timer (1.0 for a fixed step). Updates velocity, position, angle and
    /// all part geometry.
    pub fn update(&mut self, delta: f64, time_scale: f64, correction: f64) {
        let delta_scaled = delta * time_scale;
        let delta_time_squared = delta_scaled * delta_scaled;
        let friction_air = 1.0 - self.friction_air * time_scale;
        let velocity_prev = self.position - self.position_prev;

        self.velocity =
            velocity_prev * friction_air * correction + (self.force / self.mass) * delta_time_squared;
        self.position_prev = self.position;
        self.position += self.velocity;

        self.angular_velocity = (self.angle - self.angle_prev) * friction_air * correction
            + (self.torque / self.inertia) * delta_time_squared;
        self.angle_prev = self.angle;
        self.angle += self.angular_velocity;

        self.speed = self.velocity.length();
        self.angular_speed = self.angular_velocity.abs();

        let velocity = self.velocity;
        let angular_velocity = self.angular_velocity;
        let position = self.position;
        for (i, part) in self.parts.iter_mut().enumerate() {
            part.position += velocity;
            vertices::translate(&mut part.vertices, velocity);
            if angular_velocity != 0.0 {
                vertices::rotate(&mut part.vertices, angular_velocity, position);
                axes::rotate(&mut part.axes, angular_velocity);
                if i > 0 {
                    part.position = math::rotate_about(part.position, angular_velocity, position);
                }
            }
            part.bounds.update(&part.vertices, velocity);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
