//! Avatar components.
//!
//! [`IkTargets`] is replicated: it carries where the remote user's head and
//! hands are. [`AvatarRig`] is local: the posed skeleton the IK solvers
//! write into.

use engine_component::{Component, ComponentKind};
use engine_math::{Quat, Vec3};

/// Tracked head and hand targets of an avatar.
///
/// Replicated fields, in bitmask order: `head_position`,
/// `left_hand_position`, `left_hand_rotation`, `right_hand_position`,
/// `right_hand_rotation`, `hand_weight`.
///
/// A hand at exactly [`Vec3::ZERO`] is untracked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkTargets {
    pub head_position: Vec3,
    pub left_hand_position: Vec3,
    pub left_hand_rotation: Quat,
    pub right_hand_position: Vec3,
    pub right_hand_rotation: Quat,
    /// Blend between the animated pose (0) and the IK pose (1).
    pub hand_weight: f32,
}

impl Default for IkTargets {
    fn default() -> Self {
        Self {
            head_position: Vec3::ZERO,
            left_hand_position: Vec3::ZERO,
            left_hand_rotation: Quat::IDENTITY,
            right_hand_position: Vec3::ZERO,
            right_hand_rotation: Quat::IDENTITY,
            hand_weight: 1.0,
        }
    }
}

impl Component for IkTargets {
    const KIND: ComponentKind = ComponentKind(3);

    fn type_name() -> &'static str {
        "IkTargets"
    }
}

/// A world-space bone pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Bone {
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Bone {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Shoulder, elbow and hand of one arm.
///
/// Bones point along their local `+Y` axis toward the child joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmChain {
    pub upper: Bone,
    pub lower: Bone,
    pub hand: Bone,
    pub upper_length: f32,
    pub lower_length: f32,
    /// Direction, relative to the shoulder, the elbow bends toward.
    pub hint: Vec3,
}

impl ArmChain {
    /// An arm hanging straight down from `shoulder`.
    #[must_use]
    pub fn hanging(shoulder: Vec3, upper_length: f32, lower_length: f32, hint: Vec3) -> Self {
        let down = Quat::from_rotation_arc(Vec3::Y, Vec3::NEG_Y);
        let elbow = shoulder - Vec3::Y * upper_length;
        let wrist = elbow - Vec3::Y * lower_length;
        Self {
            upper: Bone {
                position: shoulder,
                rotation: down,
            },
            lower: Bone {
                position: elbow,
                rotation: down,
            },
            hand: Bone {
                position: wrist,
                rotation: Quat::IDENTITY,
            },
            upper_length,
            lower_length,
            hint,
        }
    }

    /// Full reach of the chain.
    #[must_use]
    pub fn reach(&self) -> f32 {
        self.upper_length + self.lower_length
    }

    /// Hand pose of the arm hanging straight down from its shoulder.
    #[must_use]
    pub fn rest_hand(&self) -> Bone {
        Bone::at(self.upper.position - Vec3::Y * self.reach())
    }
}

impl Default for ArmChain {
    fn default() -> Self {
        Self::hanging(Vec3::ZERO, 0.3, 0.28, Vec3::Z)
    }
}

/// The posed skeleton of an avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarRig {
    pub head: Bone,
    /// Largest angle in radians the head may turn away from its rest pose.
    pub head_rotation_clamp: f32,
    pub left_arm: ArmChain,
    pub right_arm: ArmChain,
}

impl AvatarRig {
    /// A rest-pose humanoid standing at `root`, facing `-Z`.
    #[must_use]
    pub fn humanoid(root: Vec3) -> Self {
        let elbow_hint = Vec3::new(0.0, -0.5, 1.0).normalize();
        Self {
            head: Bone::at(root + Vec3::new(0.0, 1.6, 0.0)),
            head_rotation_clamp: std::f32::consts::FRAC_PI_3,
            left_arm: ArmChain::hanging(root + Vec3::new(-0.2, 1.4, 0.0), 0.3, 0.28, elbow_hint),
            right_arm: ArmChain::hanging(root + Vec3::new(0.2, 1.4, 0.0), 0.3, 0.28, elbow_hint),
        }
    }
}

impl Default for AvatarRig {
    fn default() -> Self {
        Self::humanoid(Vec3::ZERO)
    }
}

impl Component for AvatarRig {
    const KIND: ComponentKind = ComponentKind(16);

    fn type_name() -> &'static str {
        "AvatarRig"
    }
}
