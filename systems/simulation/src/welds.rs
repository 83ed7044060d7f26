//! Weld-break policy.

use contraption_core::{BodyHandle, ConstraintHandle, PhysicsError, PhysicsWorld};
use glam::Vec2;

/// Weld still holding two bodies together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveWeld {
    /// Constraint inside the physics world.
    pub handle: ConstraintHandle,
    /// First welded body.
    pub a: BodyHandle,
    /// Second welded body.
    pub b: BodyHandle,
    /// Anchor on `a` in its body space.
    pub anchor_a: Vec2,
    /// Anchor on `b` in its body space.
    pub anchor_b: Vec2,
}

impl ActiveWeld {
    /// World-space distance between both anchors.
    pub fn separation<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Result<f32, PhysicsError> {
        let a = world.pose(self.a)?.transform_point(self.anchor_a);
        let b = world.pose(self.b)?.transform_point(self.anchor_b);
        Ok(a.distance(b))
    }
}

/// Removes every weld stretched beyond `threshold` and returns how many broke.
///
/// Broken welds leave `welds` for good and are never checked again.
pub fn break_stretched_welds<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    welds: &mut Vec<ActiveWeld>,
    threshold: f32,
) -> Result<u32, PhysicsError> {
    let mut broken = 0;
    let mut index = 0;
    while index < welds.len() {
        let weld = welds[index];
        let separation = weld.separation(world)?;
        if separation > threshold {
            world.remove_constraint(weld.handle)?;
            let _ = welds.swap_remove(index);
            broken += 1;
            log::debug!(
                "weld {:?} broke at separation {separation:.3}",
                weld.handle
            );
        } else {
            index += 1;
        }
    }
    Ok(broken)
}
