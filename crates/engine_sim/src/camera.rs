//! View queries used to rate entities for the priority scheduler.

use engine_component::Entity;
use engine_math::{Transform3D, Vec3};

use crate::world::World;

/// Visibility and distance of entities as seen from some viewpoint.
pub trait ViewQuery {
    /// Returns `true` if the entity cannot be seen.
    fn is_culled(&self, world: &World, entity: Entity) -> bool;

    /// Squared distance from the viewpoint to the entity.
    fn squared_distance(&self, world: &World, entity: Entity) -> f32;
}

/// A camera seeing a cone around its forward axis, up to a far plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub forward: Vec3,
    /// Half the opening angle of the view cone, in radians.
    pub half_angle: f32,
    pub far: f32,
}

impl CameraView {
    /// A camera placed by `transform`, looking down its `-Z` axis.
    #[must_use]
    pub fn from_transform(transform: &Transform3D, half_angle: f32, far: f32) -> Self {
        Self {
            position: transform.position,
            forward: transform.forward(),
            half_angle,
            far,
        }
    }

    /// Returns `true` if `point` lies inside the view cone.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        let offset = point - self.position;
        let distance = offset.length();
        if distance > self.far {
            return false;
        }
        if distance <= f32::EPSILON {
            return true;
        }
        let Some(forward) = self.forward.try_normalize() else {
            return false;
        };
        offset.dot(forward) / distance >= self.half_angle.cos()
    }
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            half_angle: std::f32::consts::FRAC_PI_4,
            far: 1000.0,
        }
    }
}

impl ViewQuery for CameraView {
    fn is_culled(&self, world: &World, entity: Entity) -> bool {
        world
            .transforms
            .get(entity)
            .is_none_or(|t| !self.contains(t.position))
    }

    fn squared_distance(&self, world: &World, entity: Entity) -> f32 {
        world
            .transforms
            .get(entity)
            .map_or(f32::INFINITY, |t| t.position.distance_squared(self.position))
    }
}
