#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rapier-backed implementation of the contraption physics port.
//!
//! The simulator works in pixels with y pointing down. This adapter scales
//! every length by [`PhysicsSettings::pixels_per_meter`] before handing it to
//! rapier and keeps gravity pointing toward positive y.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use contraption_core::{
    BodyHandle, BodySpec, ConstraintHandle, ConstraintSpec, ContactStart, PhysicsError,
    PhysicsWorld, Pose, Shape,
};
use glam::Vec2;
use rapier2d::prelude::*;

/// Default conversion between simulator pixels and rapier metres.
pub const PIXELS_PER_METER: f32 = 64.0;

/// Tuning of the rapier world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsSettings {
    /// Pixels per rapier metre.
    pub pixels_per_meter: f32,
    /// Downward gravitational acceleration in metres per second squared.
    pub gravity: f32,
    /// Rapier steps taken for every simulator step.
    pub substeps: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            pixels_per_meter: PIXELS_PER_METER,
            gravity: 9.81,
            substeps: 4,
        }
    }
}

/// Collects collision-start events raised while rapier steps.
#[derive(Default)]
struct ContactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl ContactCollector {
    fn take(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        std::mem::take(&mut *self.started.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if event.started() {
            self.started
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((event.collider1(), event.collider2()));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Rapier world exposed through [`PhysicsWorld`].
pub struct RapierWorld {
    settings: PhysicsSettings,
    pipeline: PhysicsPipeline,
    parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    events: ContactCollector,
    body_handles: Vec<RigidBodyHandle>,
    body_lookup: HashMap<RigidBodyHandle, BodyHandle>,
    joints: Vec<Option<ImpulseJointHandle>>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

impl std::fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierWorld")
            .field("settings", &self.settings)
            .field("bodies", &self.body_handles.len())
            .field("joints", &self.joints.iter().flatten().count())
            .finish()
    }
}

impl RapierWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            pipeline: PhysicsPipeline::new(),
            parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            events: ContactCollector::default(),
            body_handles: Vec::new(),
            body_lookup: HashMap::new(),
            joints: Vec::new(),
        }
    }

    /// Settings the world was created with.
    #[must_use]
    pub const fn settings(&self) -> PhysicsSettings {
        self.settings
    }

    fn to_engine(&self, pixels: Vec2) -> Vector<Real> {
        let scale = self.settings.pixels_per_meter;
        vector![pixels.x / scale, pixels.y / scale]
    }

    fn anchor(&self, pixels: Vec2) -> Point<Real> {
        let scale = self.settings.pixels_per_meter;
        point![pixels.x / scale, pixels.y / scale]
    }

    fn rigid_body(&self, body: BodyHandle) -> Result<RigidBodyHandle, PhysicsError> {
        self.body_handles
            .get(body.get() as usize)
            .copied()
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn collider_owner(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        self.body_lookup.get(&parent).copied()
    }

    fn collider(&self, spec: &BodySpec) -> Result<ColliderBuilder, PhysicsError> {
        let scale = self.settings.pixels_per_meter;
        let builder = match spec.shape {
            Shape::Rect { width, height } if width > 0.0 && height > 0.0 => {
                ColliderBuilder::cuboid(width / scale / 2.0, height / scale / 2.0)
            }
            Shape::Circle { radius } if radius > 0.0 => ColliderBuilder::ball(radius / scale),
            shape => {
                return Err(PhysicsError::InvalidSpec(format!(
                    "shape {shape:?} has no extent"
                )))
            }
        };
        let filter = spec.category.collision_filter();
        let groups = InteractionGroups::new(
            Group::from_bits_truncate(filter.membership),
            Group::from_bits_truncate(filter.filter),
        );
        let mut builder = builder
            .collision_groups(groups)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .restitution(spec.restitution);
        if let Some(mass) = spec.mass {
            if !(mass > 0.0) {
                return Err(PhysicsError::InvalidSpec(format!(
                    "mass must be positive (received {mass})"
                )));
            }
            builder = builder.mass(mass);
        }
        Ok(builder)
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, PhysicsError> {
        let collider = self.collider(spec)?;
        let builder = if spec.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().linvel(self.to_engine(spec.velocity))
        };
        let rigid_body = builder.translation(self.to_engine(spec.position)).build();

        let parent = self.bodies.insert(rigid_body);
        let _ = self
            .colliders
            .insert_with_parent(collider, parent, &mut self.bodies);

        let handle = BodyHandle::new(self.body_handles.len() as u32);
        self.body_handles.push(parent);
        let _ = self.body_lookup.insert(parent, handle);
        Ok(handle)
    }

    fn add_constraint(&mut self, spec: &ConstraintSpec) -> Result<ConstraintHandle, PhysicsError> {
        let (a, b, joint): (BodyHandle, BodyHandle, GenericJoint) = match *spec {
            ConstraintSpec::Weld {
                a,
                b,
                anchor_a,
                anchor_b,
            } => {
                let joint = FixedJointBuilder::new()
                    .local_anchor1(self.anchor(anchor_a))
                    .local_anchor2(self.anchor(anchor_b))
                    .contacts_enabled(false)
                    .build();
                (a, b, joint.into())
            }
            ConstraintSpec::Spring {
                a,
                b,
                rest_length,
                stiffness,
                damping,
            } => {
                let rest = rest_length / self.settings.pixels_per_meter;
                let joint = SpringJointBuilder::new(rest, stiffness, damping).build();
                (a, b, joint.into())
            }
            ConstraintSpec::Pin {
                a,
                b,
                anchor_a,
                anchor_b,
            } => {
                let joint = RevoluteJointBuilder::new()
                    .local_anchor1(self.anchor(anchor_a))
                    .local_anchor2(self.anchor(anchor_b))
                    .contacts_enabled(false)
                    .build();
                (a, b, joint.into())
            }
        };

        let (first, second) = (self.rigid_body(a)?, self.rigid_body(b)?);
        let joint = self.impulse_joints.insert(first, second, joint, true);
        let handle = ConstraintHandle::new(self.joints.len() as u32);
        self.joints.push(Some(joint));
        Ok(handle)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), PhysicsError> {
        let joint = self
            .joints
            .get_mut(handle.get() as usize)
            .and_then(Option::take)
            .ok_or(PhysicsError::UnknownConstraint(handle))?;
        let _ = self.impulse_joints.remove(joint, true);
        Ok(())
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: f32) -> Result<(), PhysicsError> {
        let handle = self.rigid_body(body)?;
        let rigid_body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(body))?;
        rigid_body.reset_torques(true);
        rigid_body.add_torque(torque, true);
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        if !(dt > 0.0) {
            return Err(PhysicsError::InvalidSpec(format!(
                "timestep must be positive (received {dt})"
            )));
        }
        let substeps = self.settings.substeps.max(1);
        self.parameters.dt = dt / substeps as f32;
        let gravity = vector![0.0, self.settings.gravity];

        for _ in 0..substeps {
            self.pipeline.step(
                &gravity,
                &self.parameters,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                None,
                &(),
                &self.events,
            );
        }
        Ok(())
    }

    fn drain_contact_starts(&mut self) -> Vec<ContactStart> {
        self.events
            .take()
            .into_iter()
            .filter_map(|(first, second)| {
                let a = self.collider_owner(first)?;
                let b = self.collider_owner(second)?;
                Some(ContactStart::new(a, b))
            })
            .collect()
    }

    fn pose(&self, body: BodyHandle) -> Result<Pose, PhysicsError> {
        let rigid_body = self
            .bodies
            .get(self.rigid_body(body)?)
            .ok_or(PhysicsError::UnknownBody(body))?;
        let translation = rigid_body.translation();
        let scale = self.settings.pixels_per_meter;
        Ok(Pose::new(
            Vec2::new(translation.x * scale, translation.y * scale),
            rigid_body.rotation().angle(),
        ))
    }
}
