use contraption_core::{
    BodyCategory, BodyHandle, BodySpec, ConstraintHandle, ConstraintSpec, PhysicsError,
    PhysicsWorld, Shape,
};
use contraption_physics_rapier::{PhysicsSettings, RapierWorld};
use glam::Vec2;

const DT: f32 = 1.0 / 30.0;

fn square(size: f32) -> Shape {
    Shape::Rect {
        width: size,
        height: size,
    }
}

fn ground(world: &mut RapierWorld) -> BodyHandle {
    world
        .add_body(&BodySpec::new(
            Shape::Rect {
                width: 800.0,
                height: 50.0,
            },
            Vec2::new(400.0, 575.0),
            BodyCategory::Ground,
        ))
        .expect("ground is created")
}

fn run_until_contact(world: &mut RapierWorld, steps: u32) -> Vec<contraption_core::ContactStart> {
    let mut contacts = Vec::new();
    for _ in 0..steps {
        world.step(DT).expect("world steps");
        contacts.extend(world.drain_contact_starts());
    }
    contacts
}

#[test]
fn bodies_fall_toward_positive_y() {
    let mut world = RapierWorld::default();
    let body = world
        .add_body(&BodySpec::new(square(64.0), Vec2::new(100.0, 100.0), BodyCategory::Box))
        .expect("box is created");

    for _ in 0..10 {
        world.step(DT).expect("world steps");
    }

    let pose = world.pose(body).expect("box exists");
    assert!(pose.position.y > 100.0, "box rose to {}", pose.position.y);
    assert!((pose.position.x - 100.0).abs() < 1e-3, "box drifted sideways");
}

#[test]
fn static_bodies_stay_put() {
    let mut world = RapierWorld::default();
    let floor = ground(&mut world);
    let _ = run_until_contact(&mut world, 5);
    let pose = world.pose(floor).expect("ground exists");
    assert_eq!(pose.position, Vec2::new(400.0, 575.0));
}

#[test]
fn player_landing_on_ground_reports_contact() {
    let mut world = RapierWorld::default();
    let floor = ground(&mut world);
    let player = world
        .add_body(&BodySpec::new(
            Shape::Rect {
                width: 32.0,
                height: 64.0,
            },
            Vec2::new(400.0, 480.0),
            BodyCategory::Player,
        ))
        .expect("player is created");

    let contacts = run_until_contact(&mut world, 60);
    assert!(
        contacts
            .iter()
            .any(|contact| contact.involves(floor) && contact.involves(player)),
        "expected a player and ground contact, got {contacts:?}"
    );
}

#[test]
fn debris_passes_through_players() {
    let mut world = RapierWorld::default();
    let player = world
        .add_body(&BodySpec::new(
            Shape::Rect {
                width: 32.0,
                height: 64.0,
            },
            Vec2::new(400.0, 300.0),
            BodyCategory::Player,
        ))
        .expect("player is created");
    let debris = world
        .add_body(
            &BodySpec::new(square(51.2), Vec2::new(400.0, 200.0), BodyCategory::Debris)
                .with_velocity(Vec2::new(0.0, 600.0))
                .with_mass(5.0),
        )
        .expect("debris is created");

    let contacts = run_until_contact(&mut world, 30);
    assert!(
        !contacts
            .iter()
            .any(|contact| contact.involves(player) && contact.involves(debris)),
        "player and debris must not collide"
    );
}

#[test]
fn welded_boxes_fall_together() {
    let mut world = RapierWorld::default();
    let left = world
        .add_body(&BodySpec::new(square(64.0), Vec2::new(100.0, 100.0), BodyCategory::Box))
        .expect("left box");
    let right = world
        .add_body(&BodySpec::new(square(64.0), Vec2::new(164.0, 100.0), BodyCategory::Box))
        .expect("right box");
    let _ = world
        .add_constraint(&ConstraintSpec::Weld {
            a: left,
            b: right,
            anchor_a: Vec2::new(32.0, 0.0),
            anchor_b: Vec2::new(-32.0, 0.0),
        })
        .expect("weld is created");

    let _ = run_until_contact(&mut world, 20);

    let a = world.pose(left).expect("left pose");
    let b = world.pose(right).expect("right pose");
    assert!((a.position.distance(b.position) - 64.0).abs() < 1.0);
}

#[test]
fn removed_constraints_cannot_be_removed_twice() {
    let mut world = RapierWorld::new(PhysicsSettings {
        substeps: 1,
        ..PhysicsSettings::default()
    });
    let a = world
        .add_body(&BodySpec::new(square(64.0), Vec2::ZERO, BodyCategory::Box))
        .expect("first box");
    let b = world
        .add_body(&BodySpec::new(square(64.0), Vec2::new(64.0, 0.0), BodyCategory::Box))
        .expect("second box");
    let weld = world
        .add_constraint(&ConstraintSpec::Weld {
            a,
            b,
            anchor_a: Vec2::new(32.0, 0.0),
            anchor_b: Vec2::new(-32.0, 0.0),
        })
        .expect("weld is created");

    world.remove_constraint(weld).expect("first removal succeeds");
    assert!(matches!(
        world.remove_constraint(weld),
        Err(PhysicsError::UnknownConstraint(handle)) if handle == weld
    ));
    assert!(matches!(
        world.remove_constraint(ConstraintHandle::new(99)),
        Err(PhysicsError::UnknownConstraint(_))
    ));
}

#[test]
fn unknown_bodies_and_degenerate_specs_are_rejected() {
    let mut world = RapierWorld::default();
    assert!(matches!(
        world.pose(BodyHandle::new(3)),
        Err(PhysicsError::UnknownBody(_))
    ));
    assert!(matches!(
        world.apply_torque(BodyHandle::new(0), 1.0),
        Err(PhysicsError::UnknownBody(_))
    ));
    assert!(matches!(
        world.add_body(&BodySpec::new(
            Shape::Circle { radius: 0.0 },
            Vec2::ZERO,
            BodyCategory::Wheel
        )),
        Err(PhysicsError::InvalidSpec(_))
    ));
    let weightless = BodySpec::new(square(10.0), Vec2::ZERO, BodyCategory::Debris).with_mass(0.0);
    assert!(matches!(
        world.add_body(&weightless),
        Err(PhysicsError::InvalidSpec(_))
    ));
    assert!(matches!(world.step(0.0), Err(PhysicsError::InvalidSpec(_))));
}

#[test]
fn torque_spins_wheels() {
    let mut world = RapierWorld::default();
    let wheel = world
        .add_body(&BodySpec::new(
            Shape::Circle { radius: 25.6 },
            Vec2::new(200.0, 200.0),
            BodyCategory::Wheel,
        ))
        .expect("wheel is created");

    for _ in 0..3 {
        world.apply_torque(wheel, 2.0).expect("torque applies");
        world.step(DT).expect("world steps");
    }

    let pose = world.pose(wheel).expect("wheel exists");
    assert!(pose.angle > 0.0, "positive torque turns positively, got {}", pose.angle);
}
