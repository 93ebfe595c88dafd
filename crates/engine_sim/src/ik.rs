//! Inverse-kinematics solvers for avatar rigs.

use engine_math::{Quat, Vec3};

use crate::avatar::{ArmChain, AvatarRig, Bone, IkTargets};

/// Which parts of a rig a solve touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IkSolve {
    pub head: bool,
    pub left_hand: bool,
    pub right_hand: bool,
}

fn aim(axis_target: Vec3, fallback: Quat) -> Quat {
    axis_target
        .try_normalize()
        .map_or(fallback, |dir| Quat::from_rotation_arc(Vec3::Y, dir))
}

/// Turn `head` so its forward axis (`-Z`) points along `direction`, limited
/// to `clamp` radians away from the rest orientation.
///
/// Returns `false` and leaves the bone alone if `direction` is zero.
pub fn solve_look_ik(head: &mut Bone, direction: Vec3, clamp: f32) -> bool {
    let Some(dir) = direction.try_normalize() else {
        return false;
    };
    let target = Quat::from_rotation_arc(Vec3::NEG_Z, dir);
    let angle = target.angle_between(Quat::IDENTITY);
    head.rotation = if angle > clamp.max(0.0) {
        Quat::IDENTITY.slerp(target, clamp.max(0.0) / angle)
    } else {
        target
    };
    true
}

/// Analytic two-bone IK.
///
/// Places the elbow and hand of `chain` so the hand reaches `target` (or
/// gets as close as the bone lengths allow), bending in the plane spanned by
/// the target direction and the chain's hint. `position_weight` and
/// `rotation_weight` blend from the chain's rest hand pose toward the
/// target, so solving twice against the same target gives the same pose.
///
/// Returns `false` if the chain is degenerate or the target coincides with
/// the shoulder.
pub fn solve_two_bone_ik(
    chain: &mut ArmChain,
    target: &Bone,
    position_weight: f32,
    rotation_weight: f32,
) -> bool {
    let (a, b) = (chain.upper_length, chain.lower_length);
    if a <= 0.0 || b <= 0.0 {
        return false;
    }
    let root = chain.upper.position;
    let rest = chain.rest_hand();
    let goal = rest
        .position
        .lerp(target.position, position_weight.clamp(0.0, 1.0));
    let to_goal = goal - root;
    let Some(dir) = to_goal.try_normalize() else {
        return false;
    };
    let distance = to_goal.length().max((a - b).abs()).min(a + b);

    let bend = (chain.hint - dir * chain.hint.dot(dir))
        .try_normalize()
        .unwrap_or_else(|| dir.any_orthonormal_vector());
    // Law of cosines for the shoulder angle.
    let cos_root = ((a * a + distance * distance - b * b) / (2.0 * a * distance)).clamp(-1.0, 1.0);
    let sin_root = (1.0 - cos_root * cos_root).max(0.0).sqrt();

    let elbow = root + (dir * cos_root + bend * sin_root) * a;
    let wrist = root + dir * distance;

    chain.upper.rotation = aim(elbow - root, chain.upper.rotation);
    chain.lower.position = elbow;
    chain.lower.rotation = aim(wrist - elbow, chain.lower.rotation);
    chain.hand.position = wrist;
    chain.hand.rotation = rest
        .rotation
        .slerp(target.rotation, rotation_weight.clamp(0.0, 1.0))
        .normalize();
    true
}

/// Pose `rig` toward `targets`: look-at for the head, two-bone IK for each
/// tracked hand.
pub fn solve_avatar(rig: &mut AvatarRig, targets: &IkTargets) -> IkSolve {
    let look = targets.head_position - rig.head.position;
    let mut solve = IkSolve {
        head: solve_look_ik(&mut rig.head, look, rig.head_rotation_clamp),
        ..IkSolve::default()
    };

    // A hand target at exactly the origin means tracking is unavailable.
    if targets.left_hand_position != Vec3::ZERO {
        let target = Bone {
            position: targets.left_hand_position,
            rotation: targets.left_hand_rotation,
        };
        solve.left_hand = solve_two_bone_ik(
            &mut rig.left_arm,
            &target,
            targets.hand_weight,
            targets.hand_weight,
        );
    }
    if targets.right_hand_position != Vec3::ZERO {
        let target = Bone {
            position: targets.right_hand_position,
            rotation: targets.right_hand_rotation,
        };
        solve.right_hand = solve_two_bone_ik(
            &mut rig.right_arm,
            &target,
            targets.hand_weight,
            targets.hand_weight,
        );
    }
    solve
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> ArmChain {
        ArmChain::hanging(Vec3::ZERO, 1.0, 1.0, Vec3::Y)
    }

    #[test]
    fn test_reachable_target_is_hit() {
        let mut chain = arm();
        let target = Bone::at(Vec3::new(1.5, 0.0, 0.0));
        assert!(solve_two_bone_ik(&mut chain, &target, 1.0, 1.0));

        assert!(chain.hand.position.abs_diff_eq(target.position, 1e-5));
        assert!((chain.lower.position.length() - 1.0).abs() < 1e-5);
        assert!((chain.lower.position.distance(chain.hand.position) - 1.0).abs() < 1e-5);
        assert!(chain.lower.position.y > 0.0, "elbow bends toward the hint");
    }

    #[test]
    fn test_bones_point_at_their_child() {
        let mut chain = arm();
        solve_two_bone_ik(&mut chain, &Bone::at(Vec3::new(0.0, 0.0, -1.2)), 1.0, 1.0);
        let upper_dir = (chain.lower.position - chain.upper.position).normalize();
        assert!((chain.upper.rotation * Vec3::Y).abs_diff_eq(upper_dir, 1e-5));
        let lower_dir = (chain.hand.position - chain.lower.position).normalize();
        assert!((chain.lower.rotation * Vec3::Y).abs_diff_eq(lower_dir, 1e-5));
    }

    #[test]
    fn test_unreachable_target_straightens_arm() {
        let mut chain = arm();
        assert!(solve_two_bone_ik(&mut chain, &Bone::at(Vec3::new(5.0, 0.0, 0.0)), 1.0, 1.0));
        assert!(chain.hand.position.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
        assert!(chain.lower.position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_zero_weight_keeps_rest_pose() {
        let mut chain = arm();
        let before = chain.hand.position;
        solve_two_bone_ik(&mut chain, &Bone::at(Vec3::new(1.0, 1.0, 0.0)), 0.0, 0.0);
        assert!(chain.hand.position.abs_diff_eq(before, 1e-5));
    }

    #[test]
    fn test_partial_weight_blends_from_rest_and_is_stable() {
        let mut chain = arm();
        let target = Bone {
            position: Vec3::new(2.0, 0.0, 0.0),
            rotation: Quat::from_rotation_z(1.0),
        };
        solve_two_bone_ik(&mut chain, &target, 0.5, 0.5);
        let first = chain;
        assert!(first.hand.position.abs_diff_eq(Vec3::new(1.0, -1.0, 0.0), 1e-5));

        solve_two_bone_ik(&mut chain, &target, 0.5, 0.5);
        assert!(chain.hand.position.abs_diff_eq(first.hand.position, 1e-5));
        assert!((chain.hand.rotation.angle_between(first.hand.rotation)).abs() < 1e-4);
    }

    #[test]
    fn test_avatar_solve_reads_head_before_posing_it() {
        let mut rig = AvatarRig::humanoid(Vec3::new(0.0, 0.0, 3.0));
        let targets = IkTargets {
            head_position: rig.head.position + Vec3::new(1.0, 0.0, -1.0),
            ..IkTargets::default()
        };
        assert!(solve_avatar(&mut rig, &targets).head);
        let forward = rig.head.rotation * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::new(1.0, 0.0, -1.0).normalize(), 1e-5));
    }

    #[test]
    fn test_hand_rotation_follows_weight() {
        let mut chain = arm();
        let turn = Quat::from_rotation_y(1.0);
        let target = Bone {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: turn,
        };
        solve_two_bone_ik(&mut chain, &target, 1.0, 0.5);
        assert!((chain.hand.rotation.angle_between(Quat::IDENTITY) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_look_ik_faces_target() {
        let mut head = Bone::default();
        assert!(solve_look_ik(&mut head, Vec3::new(0.1, 0.0, -1.0), 1.0));
        let forward = head.rotation * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::new(0.1, 0.0, -1.0).normalize(), 1e-5));
    }

    #[test]
    fn test_look_ik_is_clamped() {
        let mut head = Bone::default();
        solve_look_ik(&mut head, Vec3::X, 0.5);
        assert!((head.rotation.angle_between(Quat::IDENTITY) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_look_ik_ignores_zero_direction() {
        let mut head = Bone::default();
        assert!(!solve_look_ik(&mut head, Vec3::ZERO, 1.0));
        assert_eq!(head.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_untracked_hands_are_skipped() {
        let mut rig = AvatarRig::humanoid(Vec3::ZERO);
        let before = rig;
        let targets = IkTargets {
            head_position: Vec3::new(0.0, 1.6, -2.0),
            right_hand_position: Vec3::new(0.4, 1.2, -0.3),
            ..IkTargets::default()
        };
        let solve = solve_avatar(&mut rig, &targets);
        assert_eq!(
            solve,
            IkSolve {
                head: true,
                left_hand: false,
                right_hand: true,
            }
        );
        assert_eq!(rig.left_arm, before.left_arm);
        assert_ne!(rig.right_arm, before.right_arm);
    }
}
