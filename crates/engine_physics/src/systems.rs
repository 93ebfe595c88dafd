//! Per-step systems bridging rigid-body components and the backend.

use engine_component::SparseSet;

use crate::backend::PhysicsBackend;
use crate::rigid_body::{BodyType, RigidBody};

/// Move every kinematic body a fraction `alpha` of the way from its current
/// backend pose toward its staged target pose.
///
/// The interpolated pose is handed to the backend as the next kinematic pose,
/// so it takes effect on the following physics step. Returns the number of
/// bodies moved.
pub fn interpolate_kinematic_bodies(
    bodies: &SparseSet<RigidBody>,
    backend: &mut dyn PhysicsBackend,
    alpha: f32,
) -> usize {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut moved = 0;
    for (_, body) in bodies.iter() {
        if body.body_type != BodyType::Kinematic {
            continue;
        }
        let Some(state) = backend.body_state(body.body) else {
            continue;
        };
        let position = state.position.lerp(body.target_kinematic_position, alpha);
        let rotation = state.rotation.slerp(body.target_kinematic_rotation, alpha);
        backend.set_next_kinematic_pose(body.body, position, rotation);
        moved += 1;
    }
    moved
}

/// Copy the backend's pose and velocity state into the components.
pub fn sync_from_backend(bodies: &mut SparseSet<RigidBody>, backend: &dyn PhysicsBackend) {
    for (_, body) in bodies.iter_mut() {
        if let Some(state) = backend.body_state(body.body) {
            body.position = state.position;
            body.rotation = state.rotation;
            body.linear_velocity = state.linear_velocity;
            body.angular_velocity = state.angular_velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_component::Entity;
    use engine_math::{Quat, Vec3};

    use super::*;
    use crate::backend::BodySet;

    #[test]
    fn test_kinematic_body_moves_toward_target() {
        let mut backend = BodySet::new();
        let handle = backend.create_body(BodyType::Kinematic, Vec3::ZERO, Quat::IDENTITY);
        let mut bodies = SparseSet::new();
        let mut body = RigidBody::new(handle, BodyType::Kinematic, Vec3::ZERO, Quat::IDENTITY);
        body.target_kinematic_position = Vec3::new(4.0, 0.0, 0.0);
        bodies.insert(Entity::from_raw(1), body);

        assert_eq!(interpolate_kinematic_bodies(&bodies, &mut backend, 0.25), 1);
        backend.step(1.0 / 60.0);
        sync_from_backend(&mut bodies, &backend);

        let synced = bodies.get(Entity::from_raw(1)).unwrap();
        assert!(synced.position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
        // The target stays put until the next received pose.
        assert_eq!(synced.target_kinematic_position, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_dynamic_and_fixed_bodies_are_not_interpolated() {
        let mut backend = BodySet::new();
        let mut bodies = SparseSet::new();
        for (id, body_type) in [(1, BodyType::Dynamic), (2, BodyType::Fixed)] {
            let handle = backend.create_body(body_type, Vec3::ZERO, Quat::IDENTITY);
            let mut body = RigidBody::new(handle, body_type, Vec3::ZERO, Quat::IDENTITY);
            body.target_kinematic_position = Vec3::ONE;
            bodies.insert(Entity::from_raw(id), body);
        }
        assert_eq!(interpolate_kinematic_bodies(&bodies, &mut backend, 1.0), 0);
    }

    #[test]
    fn test_sync_copies_velocities() {
        let mut backend = BodySet::new();
        let handle = backend.create_body(BodyType::Dynamic, Vec3::ZERO, Quat::IDENTITY);
        backend.set_angvel(handle, Vec3::Y);
        let mut bodies = SparseSet::new();
        bodies.insert(
            Entity::from_raw(1),
            RigidBody::new(handle, BodyType::Dynamic, Vec3::ZERO, Quat::IDENTITY),
        );
        sync_from_backend(&mut bodies, &backend);
        assert_eq!(bodies.get(Entity::from_raw(1)).unwrap().angular_velocity, Vec3::Y);
    }
}
