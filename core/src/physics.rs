//! Rigid-body physics port driven by the simulator.

use glam::Vec2;
use thiserror::Error;

use crate::{BodyCategory, Pose, Shape};

/// Opaque identifier of a body inside a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u32);

impl BodyHandle {
    /// Creates a handle from its numeric representation.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque identifier of a constraint inside a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(u32);

impl ConstraintHandle {
    /// Creates a handle from its numeric representation.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Everything a physics backend needs to create a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySpec {
    /// Collision shape.
    pub shape: Shape,
    /// Initial centre in world units.
    pub position: Vec2,
    /// Initial linear velocity in world units per second.
    pub velocity: Vec2,
    /// Category used for collision filtering.
    pub category: BodyCategory,
    /// Explicit mass; `None` derives mass from the shape.
    pub mass: Option<f32>,
    /// Bounciness in `0.0..=1.0`.
    pub restitution: f32,
}

impl BodySpec {
    /// Creates a resting body with shape-derived mass.
    #[must_use]
    pub const fn new(shape: Shape, position: Vec2, category: BodyCategory) -> Self {
        Self {
            shape,
            position,
            velocity: Vec2::ZERO,
            category,
            mass: None,
            restitution: 0.0,
        }
    }

    /// Overrides the initial linear velocity.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Overrides the body mass.
    #[must_use]
    pub const fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Overrides the restitution coefficient.
    #[must_use]
    pub const fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Whether the body is immovable.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.category.is_static()
    }
}

/// Constraints the simulator can create between two bodies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConstraintSpec {
    /// Rigid joint holding both anchors together and locking relative rotation.
    Weld {
        /// First body.
        a: BodyHandle,
        /// Second body.
        b: BodyHandle,
        /// Anchor on `a` in its body space.
        anchor_a: Vec2,
        /// Anchor on `b` in its body space.
        anchor_b: Vec2,
    },
    /// Elastic link pulling both body centres toward `rest_length`.
    Spring {
        /// First body.
        a: BodyHandle,
        /// Second body.
        b: BodyHandle,
        /// Distance at which the spring exerts no force.
        rest_length: f32,
        /// Spring stiffness in engine units.
        stiffness: f32,
        /// Spring damping in engine units.
        damping: f32,
    },
    /// Point joint holding both anchors together while allowing free rotation.
    Pin {
        /// First body.
        a: BodyHandle,
        /// Second body.
        b: BodyHandle,
        /// Anchor on `a` in its body space.
        anchor_a: Vec2,
        /// Anchor on `b` in its body space.
        anchor_b: Vec2,
    },
}

/// Pair of bodies that started touching during the last step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContactStart {
    /// First body of the pair.
    pub a: BodyHandle,
    /// Second body of the pair.
    pub b: BodyHandle,
}

impl ContactStart {
    /// Creates a new contact descriptor.
    #[must_use]
    pub const fn new(a: BodyHandle, b: BodyHandle) -> Self {
        Self { a, b }
    }

    /// Whether the pair contains the provided body.
    #[must_use]
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.a == body || self.b == body
    }
}

/// Errors raised by physics backends.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// The handle does not name a body in this world.
    #[error("unknown body handle {0:?}")]
    UnknownBody(BodyHandle),
    /// The handle does not name a live constraint in this world.
    #[error("unknown constraint handle {0:?}")]
    UnknownConstraint(ConstraintHandle),
    /// The provided body or constraint description is not usable.
    #[error("invalid physics description: {0}")]
    InvalidSpec(String),
    /// The engine failed internally.
    #[error("physics engine failure: {0}")]
    Engine(String),
}

/// Narrow 2D rigid-body capability consumed by the simulator.
///
/// Positions, sizes and velocities are world units with y pointing down.
/// Torque, spring stiffness and damping are passed through in the backend's
/// native units.
pub trait PhysicsWorld {
    /// Adds a body and returns its handle.
    fn add_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, PhysicsError>;

    /// Adds a constraint between two existing bodies.
    fn add_constraint(&mut self, spec: &ConstraintSpec) -> Result<ConstraintHandle, PhysicsError>;

    /// Removes a constraint permanently.
    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), PhysicsError>;

    /// Sets the torque applied to a body during the next step.
    fn apply_torque(&mut self, body: BodyHandle, torque: f32) -> Result<(), PhysicsError>;

    /// Advances the world by `dt` seconds.
    fn step(&mut self, dt: f32) -> Result<(), PhysicsError>;

    /// Returns the contacts that started during the most recent step and clears them.
    fn drain_contact_starts(&mut self) -> Vec<ContactStart>;

    /// Current pose of a body.
    fn pose(&self, body: BodyHandle) -> Result<Pose, PhysicsError>;
}

impl<T: PhysicsWorld + ?Sized> PhysicsWorld for &mut T {
    fn add_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, PhysicsError> {
        (**self).add_body(spec)
    }

    fn add_constraint(&mut self, spec: &ConstraintSpec) -> Result<ConstraintHandle, PhysicsError> {
        (**self).add_constraint(spec)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), PhysicsError> {
        (**self).remove_constraint(handle)
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: f32) -> Result<(), PhysicsError> {
        (**self).apply_torque(body, torque)
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        (**self).step(dt)
    }

    fn drain_contact_starts(&mut self) -> Vec<ContactStart> {
        (**self).drain_contact_starts()
    }

    fn pose(&self, body: BodyHandle) -> Result<Pose, PhysicsError> {
        (**self).pose(body)
    }
}
