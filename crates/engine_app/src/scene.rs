//! Demo scene driven by the authority.

use engine_component::Entity;
use engine_math::{Quat, Transform3D, Vec3};
use engine_physics::{BodyType, PhysicsBackend};
use engine_sim::{AvatarRig, IkTargets, TickDriver};

/// Spawn `count` entities in a ring: even slots are avatars, odd slots
/// alternate between dynamic and kinematic bodies.
pub fn populate(driver: &mut TickDriver, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|slot| {
            let angle = slot as f32 / count.max(1) as f32 * std::f32::consts::TAU;
            let position = Vec3::new(angle.cos() * 6.0, 0.0, angle.sin() * 6.0 - 8.0);
            let e = driver.world.spawn();
            driver
                .world
                .insert_transform(e, Transform3D::from_position(position));
            if slot % 2 == 0 {
                driver.world.insert_ik_targets(
                    e,
                    IkTargets {
                        head_position: position + Vec3::new(0.0, 1.6, -1.0),
                        ..IkTargets::default()
                    },
                );
                driver.world.insert_rig(e, AvatarRig::humanoid(position));
                driver.world.set_visible(e, true);
            } else {
                let body_type = if slot % 4 == 1 {
                    BodyType::Dynamic
                } else {
                    BodyType::Kinematic
                };
                let handle =
                    driver
                        .world
                        .insert_rigid_body(e, body_type, position, Quat::IDENTITY);
                if body_type == BodyType::Dynamic {
                    driver.world.physics.set_angvel(handle, Vec3::new(0.0, 0.5, 0.0));
                }
            }
            e
        })
        .collect()
}

/// Move hand targets and kinematic targets along circles at time `t`.
pub fn animate(driver: &mut TickDriver, t: f32) {
    for (e, targets) in driver.world.ik_targets.iter_mut() {
        let Some(root) = driver.world.transforms.get(e).map(|tr| tr.position) else {
            continue;
        };
        let phase = t + e.id() as f32;
        targets.left_hand_position = root + Vec3::new(-0.3, 1.2 + phase.sin() * 0.2, -0.3);
        targets.right_hand_position = root + Vec3::new(0.3, 1.2 + phase.cos() * 0.2, -0.3);
        targets.right_hand_rotation = Quat::from_rotation_z(phase.sin() * 0.5);
    }
    for (e, body) in driver.world.bodies.iter_mut() {
        if body.is_dynamic() {
            continue;
        }
        let phase = t * 0.5 + e.id() as f32;
        body.target_kinematic_position = body.position.with_y(phase.sin().abs() * 2.0);
    }
}
