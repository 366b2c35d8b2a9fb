//! Analytic two-bone IK for arms.
//!
//! Law of cosines gives the shoulder and elbow angles; the bend plane comes
//! from the target and a pole hint (toward the elbow). The upper bone is
//! aimed in world space, twisted so the elbow hinge lies along the plane
//! normal, then converted to parent-local space. The lower bone is a single
//! hinge rotation.

use std::f32::consts::PI;

use glam::{Quat, Vec3};
use tracing::warn;

use super::damping::damp_rotation;
use super::euler_degrees;
use crate::config::ArmConfig;
use crate::rig::{HumanoidBone, NodeId, Rig, RigBinding, Side};

/// Below this, target and pole are treated as colinear.
const DEGENERATE_CROSS: f32 = 1e-4;

/// Shoulder, elbow and wrist of one rig arm with rest geometry derived once.
#[derive(Debug, Clone)]
pub struct LimbChain {
    pub side: Side,
    pub upper: NodeId,
    pub lower: NodeId,
    /// Upper bone length `a`
    pub upper_len: f32,
    /// Lower bone length `b`
    pub lower_len: f32,
    /// Upper bone direction in its own local frame
    pub upper_axis: Vec3,
    pub upper_rest: Quat,
    pub lower_rest: Quat,
    /// Local-frame elbow hinge axis
    pub hinge_axis: Vec3,
    /// +1 or -1; flexion is `hinge_sign · (π − interior)`
    pub hinge_sign: f32,
    relaxed_upper: Quat,
    relaxed_lower: Quat,
}

impl LimbChain {
    /// Assemble the chain for one side. `None` if either joint is unbound or
    /// a bone has zero rest length.
    pub fn assemble<R: Rig + ?Sized>(
        rig: &R,
        binding: &RigBinding,
        side: Side,
        config: &ArmConfig,
    ) -> Option<Self> {
        let upper = binding.get(HumanoidBone::upper_arm(side))?;
        let lower = binding.get(HumanoidBone::lower_arm(side))?;

        let upper_offset = rig.child_offset(upper);
        let lower_offset = rig.child_offset(lower);
        let upper_len = upper_offset.length();
        let lower_len = lower_offset.length();
        let upper_axis = match upper_offset.try_normalize() {
            Some(axis) if lower_len > 0.0 => axis,
            _ => {
                warn!("{} arm has a zero-length bone; arm IK disabled", side);
                return None;
            }
        };

        let hinge_axis = Vec3::from_array(config.hinge_axis).try_normalize()?;
        let (hinge_sign, relaxed_upper, relaxed_lower) = match side {
            Side::Left => (
                config.left_hinge_sign.signum(),
                config.relaxed_upper_left_deg,
                config.relaxed_lower_left_deg,
            ),
            Side::Right => (
                config.right_hinge_sign.signum(),
                config.relaxed_upper_right_deg,
                config.relaxed_lower_right_deg,
            ),
        };

        let upper_rest = rig.rest_rotation(upper);
        let lower_rest = rig.rest_rotation(lower);

        Some(Self {
            side,
            upper,
            lower,
            upper_len,
            lower_len,
            upper_axis,
            upper_rest,
            lower_rest,
            hinge_axis,
            hinge_sign,
            relaxed_upper: upper_rest * euler_degrees(relaxed_upper),
            relaxed_lower: lower_rest * euler_degrees(relaxed_lower),
        })
    }

    /// Maximum reach `a + b`.
    pub fn reach(&self) -> f32 {
        self.upper_len + self.lower_len
    }

    /// Ease both joints toward the relaxed pose instead of solving.
    pub fn relax<R: Rig + ?Sized>(&self, rig: &mut R, speed: f32, dt: f32) {
        let upper = damp_rotation(rig.local_rotation(self.upper), self.relaxed_upper, speed, dt);
        rig.set_local_rotation(self.upper, upper);
        let lower = damp_rotation(rig.local_rotation(self.lower), self.relaxed_lower, speed, dt);
        rig.set_local_rotation(self.lower, lower);
    }

    pub fn relaxed_rotations(&self) -> (Quat, Quat) {
        (self.relaxed_upper, self.relaxed_lower)
    }
}

/// Triangle angles for sides a, b and clamped target distance c.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBoneAngles {
    /// Angle between the upper bone and the target direction
    pub shoulder: f32,
    /// Interior angle at the elbow (π when straight)
    pub elbow_interior: f32,
}

impl TwoBoneAngles {
    /// Hinge rotation at the elbow: 0 straight, π fully folded.
    pub fn elbow_flexion(&self) -> f32 {
        PI - self.elbow_interior
    }
}

/// Angle opposite side `opposite` in a triangle with adjacent sides `s1`, `s2`.
fn law_of_cosines(s1: f32, s2: f32, opposite: f32) -> f32 {
    let denom = 2.0 * s1 * s2;
    if denom <= f32::EPSILON {
        return 0.0;
    }
    let cos = (s1 * s1 + s2 * s2 - opposite * opposite) / denom;
    cos.clamp(-1.0, 1.0).acos()
}

/// Solve the triangle for bone lengths `a`, `b` and target distance `c`.
/// `c` is clamped into `[|a-b|, a+b]`.
pub fn solve_angles(a: f32, b: f32, c: f32) -> TwoBoneAngles {
    let c = c.clamp((a - b).abs(), a + b);
    TwoBoneAngles {
        shoulder: law_of_cosines(a, c, b),
        elbow_interior: law_of_cosines(a, b, c),
    }
}

/// Result of one solve: the target local rotations the joints ease toward.
#[derive(Debug, Clone, Copy)]
pub struct ArmSolution {
    pub angles: TwoBoneAngles,
    /// Bend-plane normal in world space
    pub normal: Vec3,
    /// True when target and pole were colinear and a reference axis was used
    pub fallback_normal: bool,
    pub upper_local: Quat,
    pub lower_local: Quat,
}

/// Two-bone solver parameters
#[derive(Debug, Clone)]
pub struct TwoBoneIk {
    pub speed: f32,
    pub epsilon: f32,
}

impl TwoBoneIk {
    pub fn from_config(config: &ArmConfig) -> Self {
        Self {
            speed: config.speed,
            epsilon: config.epsilon,
        }
    }

    /// Compute target rotations for `chain` reaching toward `target`
    /// (shoulder-relative, world space) with the elbow on the `pole` side.
    pub fn plan<R: Rig + ?Sized>(
        &self,
        rig: &R,
        chain: &LimbChain,
        target: Vec3,
        pole: Vec3,
    ) -> ArmSolution {
        let a = chain.upper_len;
        let b = chain.lower_len;
        let parent_world = rig.parent_world_rotation(chain.upper);

        // Clamp reach, keeping clear of the singular straight/folded poses
        let lo = (a - b).abs() + self.epsilon;
        let hi = (a + b - self.epsilon).max(lo);
        let c = target.length().clamp(lo, hi);

        let rest_dir = parent_world * chain.upper_rest * chain.upper_axis;
        let target_dir = target.try_normalize().unwrap_or(rest_dir);
        let angles = solve_angles(a, b, c);

        let cross = target_dir.cross(pole);
        let (normal, fallback_normal) = match cross.try_normalize() {
            Some(n) if cross.length() > DEGENERATE_CROSS * pole.length() => (n, false),
            _ => (reference_normal(target_dir, chain.hinge_sign), true),
        };

        // Upper bone leans off the target line toward the pole side
        let upper_dir = Quat::from_axis_angle(normal, angles.shoulder) * target_dir;
        let aim = Quat::from_rotation_arc(chain.upper_axis, upper_dir);

        // Lower hinge in the upper bone's frame, aligned with -sign·n in world
        let hinge_in_upper = chain.lower_rest * chain.hinge_axis;
        let upper_world = align_twist(aim, upper_dir, hinge_in_upper, -chain.hinge_sign * normal);

        let upper_local = (parent_world.inverse() * upper_world).normalize();
        let lower_local = chain.lower_rest
            * Quat::from_axis_angle(chain.hinge_axis, chain.hinge_sign * angles.elbow_flexion());

        ArmSolution {
            angles,
            normal,
            fallback_normal,
            upper_local,
            lower_local,
        }
    }

    /// Plan and ease both joints toward the solution.
    pub fn solve<R: Rig + ?Sized>(
        &self,
        rig: &mut R,
        chain: &LimbChain,
        target: Vec3,
        pole: Vec3,
        dt: f32,
    ) -> ArmSolution {
        let solution = self.plan(rig, chain, target, pole);

        let upper = damp_rotation(
            rig.local_rotation(chain.upper),
            solution.upper_local,
            self.speed,
            dt,
        );
        rig.set_local_rotation(chain.upper, upper);

        let lower = damp_rotation(
            rig.local_rotation(chain.lower),
            solution.lower_local,
            self.speed,
            dt,
        );
        rig.set_local_rotation(chain.lower, lower);

        solution
    }
}

/// Bend-plane normal when the pole gives none: the elbow hinge goes along
/// world up (or forward, for a vertical arm) projected off the bone.
fn reference_normal(dir: Vec3, hinge_sign: f32) -> Vec3 {
    for reference in [Vec3::Y, Vec3::Z] {
        if reference.cross(dir).length() < 0.1 {
            continue;
        }
        if let Some(hinge) = (reference - dir * reference.dot(dir)).try_normalize() {
            return -hinge_sign * hinge;
        }
    }
    dir.any_orthonormal_vector()
}

/// Roll `rotation` about `dir` so that `rotation * local_axis` points along
/// `desired` as closely as possible.
fn align_twist(rotation: Quat, dir: Vec3, local_axis: Vec3, desired: Vec3) -> Quat {
    let current = rotation * local_axis;
    let from = (current - dir * current.dot(dir)).try_normalize();
    let to = (desired - dir * desired.dot(dir)).try_normalize();
    match (from, to) {
        (Some(from), Some(to)) => {
            let angle = from.cross(to).dot(dir).atan2(from.dot(to));
            (Quat::from_axis_angle(dir, angle) * rotation).normalize()
        }
        _ => rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::Skeleton;

    fn arm_rig(a: f32, b: f32) -> Skeleton {
        let mut rig = Skeleton::new();
        let shoulder = rig.add_node("shoulder", None, Vec3::ZERO, Quat::IDENTITY);
        let upper = rig.add_node("upper", Some(shoulder), Vec3::ZERO, Quat::IDENTITY);
        let lower = rig.add_node("lower", Some(upper), Vec3::new(a, 0.0, 0.0), Quat::IDENTITY);
        let hand = rig.add_node("hand", Some(lower), Vec3::new(b, 0.0, 0.0), Quat::IDENTITY);
        rig.bind(HumanoidBone::LeftShoulder, shoulder);
        rig.bind(HumanoidBone::LeftUpperArm, upper);
        rig.bind(HumanoidBone::LeftLowerArm, lower);
        rig.bind(HumanoidBone::LeftHand, hand);
        rig
    }

    fn left_chain(rig: &Skeleton, config: &ArmConfig) -> LimbChain {
        let binding = RigBinding::resolve(rig);
        LimbChain::assemble(rig, &binding, Side::Left, config).unwrap()
    }

    #[test]
    fn test_angles_at_full_reach_are_straight() {
        let angles = solve_angles(0.3, 0.25, 0.55);
        assert!(angles.elbow_flexion().abs() < 1e-3);
        assert!(angles.shoulder.abs() < 1e-3);
    }

    #[test]
    fn test_angles_at_min_reach_are_folded() {
        let angles = solve_angles(0.3, 0.25, 0.05);
        assert!((angles.elbow_flexion() - PI).abs() < 1e-3);

        // Equal bones fold onto a zero-length target
        let angles = solve_angles(0.3, 0.3, 0.0);
        assert!((angles.elbow_flexion() - PI).abs() < 1e-3);
        assert!(angles.shoulder.is_finite());
    }

    #[test]
    fn test_angles_finite_across_range() {
        let (a, b) = (0.3f32, 0.2f32);
        for i in 0..=200 {
            let c = (a - b) + (2.0 * b) * i as f32 / 200.0;
            let angles = solve_angles(a, b, c);
            assert!(angles.shoulder.is_finite() && angles.elbow_interior.is_finite());
            assert!((0.0..=PI).contains(&angles.elbow_flexion()));
        }
        // Out of range is clamped, not undefined
        assert!(solve_angles(a, b, 5.0).elbow_flexion().abs() < 1e-3);
        assert!(solve_angles(a, b, -1.0).elbow_flexion().is_finite());
    }

    #[test]
    fn test_right_angle_bend() {
        let config = ArmConfig::default();
        let mut rig = arm_rig(0.3, 0.3);
        let chain = left_chain(&rig, &config);
        let ik = TwoBoneIk::from_config(&config);

        let elbow = Vec3::new(0.3, 0.0, 0.0);
        let wrist = Vec3::new(0.3, 0.0, 0.3);
        let solution = ik.solve(&mut rig, &chain, wrist, elbow, 10.0);

        let expected = PI - solve_angles(0.3, 0.3, wrist.length()).elbow_interior;
        assert!((expected - PI / 2.0).abs() < 1e-3);

        let lower = rig.local_rotation(chain.lower);
        let flexion = chain.lower_rest.angle_between(lower);
        assert!((flexion - expected).abs() < 1e-3, "flexion {flexion}");
        assert!(!solution.fallback_normal);

        // Forward kinematics lands the joints on the tracked positions
        let elbow_node = rig.node_by_name("lower").unwrap();
        let hand_node = rig.node_by_name("hand").unwrap();
        assert!((rig.world_position(elbow_node) - elbow).length() < 1e-3);
        assert!((rig.world_position(hand_node) - wrist).length() < 1e-3);
    }

    #[test]
    fn test_right_hinge_sign_reaches_same_target() {
        let config = ArmConfig {
            left_hinge_sign: 1.0,
            ..ArmConfig::default()
        };
        let mut rig = arm_rig(0.3, 0.3);
        let chain = left_chain(&rig, &config);
        let ik = TwoBoneIk::from_config(&config);

        let wrist = Vec3::new(0.3, 0.0, 0.3);
        ik.solve(&mut rig, &chain, wrist, Vec3::new(0.3, 0.0, 0.0), 10.0);

        let hand_node = rig.node_by_name("hand").unwrap();
        assert!((rig.world_position(hand_node) - wrist).length() < 1e-3);
    }

    #[test]
    fn test_parent_rotation_is_removed() {
        let config = ArmConfig::default();
        let mut rig = arm_rig(0.3, 0.3);
        let shoulder = rig.node_by_name("shoulder").unwrap();
        rig.set_local_rotation(shoulder, Quat::from_rotation_y(0.7));
        let chain = left_chain(&rig, &config);
        let ik = TwoBoneIk::from_config(&config);

        let wrist = Vec3::new(0.2, -0.3, 0.25);
        ik.solve(&mut rig, &chain, wrist, Vec3::new(0.1, -0.25, -0.05), 10.0);

        let hand_node = rig.node_by_name("hand").unwrap();
        assert!((rig.world_position(hand_node) - wrist).length() < 1e-3);
    }

    #[test]
    fn test_colinear_pole_uses_fallback() {
        let config = ArmConfig::default();
        let mut rig = arm_rig(0.3, 0.25);
        let chain = left_chain(&rig, &config);
        let ik = TwoBoneIk::from_config(&config);

        for target in [
            Vec3::new(0.4, 0.0, 0.0),
            Vec3::new(0.0, -0.4, 0.0),
            Vec3::new(0.0, 0.0, 0.4),
        ] {
            let solution = ik.solve(&mut rig, &chain, target, target * 0.5, 10.0);
            assert!(solution.fallback_normal);
            assert!(solution.normal.is_finite());
            assert!((solution.normal.length() - 1.0).abs() < 1e-4);
            assert!(solution.upper_local.is_finite());
            assert!(solution.lower_local.is_finite());

            let hand_node = rig.node_by_name("hand").unwrap();
            assert!((rig.world_position(hand_node) - target).length() < 1e-3);
        }
    }

    #[test]
    fn test_zero_pole_and_zero_target_stay_finite() {
        let config = ArmConfig::default();
        let mut rig = arm_rig(0.3, 0.3);
        let chain = left_chain(&rig, &config);
        let ik = TwoBoneIk::from_config(&config);

        let solution = ik.solve(&mut rig, &chain, Vec3::ZERO, Vec3::ZERO, 0.1);
        assert!(solution.upper_local.is_finite());
        assert!(solution.lower_local.is_finite());
        assert!(rig.local_rotation(chain.upper).is_finite());
    }

    #[test]
    fn test_unreachable_target_is_clamped() {
        let config = ArmConfig::default();
        let mut rig = arm_rig(0.3, 0.25);
        let chain = left_chain(&rig, &config);
        let ik = TwoBoneIk::from_config(&config);

        let solution = ik.solve(&mut rig, &chain, Vec3::new(0.0, -5.0, 0.0), Vec3::X, 10.0);
        assert!(solution.angles.elbow_flexion() < 0.1);

        let hand_node = rig.node_by_name("hand").unwrap();
        let hand = rig.world_position(hand_node);
        assert!(hand.y < -0.54 && hand.x.abs() < 0.05);
    }

    #[test]
    fn test_missing_lower_arm_gives_no_chain() {
        let mut rig = Skeleton::new();
        let upper = rig.add_node("upper", None, Vec3::ZERO, Quat::IDENTITY);
        rig.add_node("child", Some(upper), Vec3::X, Quat::IDENTITY);
        rig.bind(HumanoidBone::LeftUpperArm, upper);

        let binding = RigBinding::resolve(&rig);
        let chain = LimbChain::assemble(&rig, &binding, Side::Left, &ArmConfig::default());
        assert!(chain.is_none());
    }

    #[test]
    fn test_t_pose_chain_lengths() {
        let rig = Skeleton::t_pose();
        let binding = RigBinding::resolve(&rig);
        for side in Side::BOTH {
            let chain = LimbChain::assemble(&rig, &binding, side, &ArmConfig::default()).unwrap();
            assert!((chain.upper_len - 0.28).abs() < 1e-6);
            assert!((chain.lower_len - 0.25).abs() < 1e-6);
            assert!((chain.reach() - 0.53).abs() < 1e-6);
        }
    }

    #[test]
    fn test_relax_eases_toward_rest_pose() {
        let config = ArmConfig::default();
        let mut rig = arm_rig(0.3, 0.3);
        let chain = left_chain(&rig, &config);
        let (relaxed_upper, _) = chain.relaxed_rotations();

        let before = rig.local_rotation(chain.upper).angle_between(relaxed_upper);
        chain.relax(&mut rig, config.rest_speed, 0.1);
        let after = rig.local_rotation(chain.upper).angle_between(relaxed_upper);
        assert!(after < before);

        chain.relax(&mut rig, config.rest_speed, 100.0);
        assert!(rig.local_rotation(chain.upper).angle_between(relaxed_upper) < 1e-2);
    }
}
