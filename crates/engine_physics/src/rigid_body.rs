//! Rigid-body component.

use engine_component::{Component, ComponentKind};
use engine_math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Handle of a body inside the physics backend.
///
/// A slot index plus the generation of the body occupying it, so a handle to
/// a removed body never reaches whichever body reuses the slot. The default
/// handle refers to no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}

impl BodyHandle {
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// How a body's pose is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BodyType {
    /// Simulated by the physics engine. Received state is applied directly.
    #[default]
    Dynamic,
    /// Driven externally (animation, remote authority). Received poses are
    /// staged as targets and interpolated toward.
    Kinematic,
    /// Never moves.
    Fixed,
}

/// Public pose and velocity state of a rigid body.
///
/// Replicated fields, in bitmask order: `position`, `rotation`,
/// `linear_velocity`, `angular_velocity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    /// The backend body this component mirrors.
    pub body: BodyHandle,
    pub body_type: BodyType,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Pose a kinematic body is being moved toward.
    pub target_kinematic_position: Vec3,
    pub target_kinematic_rotation: Quat,
}

impl RigidBody {
    /// A body at rest at `position`.
    #[must_use]
    pub fn new(body: BodyHandle, body_type: BodyType, position: Vec3, rotation: Quat) -> Self {
        Self {
            body,
            body_type,
            position,
            rotation,
            target_kinematic_position: position,
            target_kinematic_rotation: rotation,
            ..Self::default()
        }
    }

    /// Returns `true` if the physics engine simulates this body.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Stage the current pose as the kinematic target.
    pub fn stage_kinematic_target(&mut self) {
        self.target_kinematic_position = self.position;
        self.target_kinematic_rotation = self.rotation;
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            body: BodyHandle::default(),
            body_type: BodyType::default(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            target_kinematic_position: Vec3::ZERO,
            target_kinematic_rotation: Quat::IDENTITY,
        }
    }
}

impl Component for RigidBody {
    const KIND: ComponentKind = ComponentKind(2);

    fn type_name() -> &'static str {
        "RigidBody"
    }
}
