//! Finger curl from hand landmarks.
//!
//! Curl compares the straight-line MCP→TIP distance with the summed segment
//! lengths, so it does not depend on hand size, distance from the camera or
//! orientation.

use glam::{Quat, Vec3};

use super::damping::damp_rotation;
use super::euler_degrees;
use crate::config::FingerConfig;
use crate::rig::{HumanoidBone, NodeId, Rig, RigBinding, Side};
use crate::tracking::{hand, Landmark};

/// `1 - straight / arc`, clamped to [0, 1]. Zero-length fingers read as open.
pub fn raw_curl(joints: [Vec3; 4]) -> f32 {
    let arc = joints[0].distance(joints[1])
        + joints[1].distance(joints[2])
        + joints[2].distance(joints[3]);
    if !(arc > f32::EPSILON) {
        return 0.0;
    }
    let straight = joints[0].distance(joints[3]);
    (1.0 - straight / arc).clamp(0.0, 1.0)
}

/// Boost mid-range response; tracker noise rarely allows fully closed geometry.
pub fn reshape_curl(raw: f32) -> f32 {
    (raw.powf(0.7) * 1.5).clamp(0.0, 1.0)
}

/// Reshaped curl for four joints (MCP, PIP, DIP, TIP).
pub fn finger_curl(joints: [Vec3; 4]) -> f32 {
    reshape_curl(raw_curl(joints))
}

/// Curl for all five digits, thumb first. `None` unless the full 21-point
/// hand is present.
pub fn hand_curls(landmarks: &[Landmark]) -> Option<[f32; 5]> {
    if landmarks.len() < hand::COUNT {
        return None;
    }
    Some(hand::FINGER_JOINTS.map(|idx| finger_curl(idx.map(|i| landmarks[i].position()))))
}

#[derive(Debug, Clone, Copy)]
struct Joint {
    node: NodeId,
    rest: Quat,
}

/// Drives one rig hand: curls on the 15 finger bones and the calibrated
/// palm offset on the hand bone.
#[derive(Debug, Clone)]
pub struct HandDriver {
    side: Side,
    hand: Option<Joint>,
    palm_target: Quat,
    digits: [[Option<Joint>; 3]; 5],
    finger_axis: Vec3,
    thumb_axis: Vec3,
    /// Radians per joint at full curl
    finger_max: [f32; 3],
    thumb_max: [f32; 3],
    sign: f32,
    speed: f32,
}

impl HandDriver {
    pub fn attach<R: Rig + ?Sized>(
        rig: &R,
        binding: &RigBinding,
        side: Side,
        config: &FingerConfig,
    ) -> Self {
        let joint = |bone: HumanoidBone| {
            binding.get(bone).map(|node| Joint {
                node,
                rest: rig.rest_rotation(node),
            })
        };

        let hand = joint(HumanoidBone::hand(side));
        let digits = HumanoidBone::fingers(side).map(|chain| chain.map(joint));

        let (sign, palm_offset) = match side {
            Side::Left => (config.left_sign, config.palm_offset_left_deg),
            Side::Right => (config.right_sign, config.palm_offset_right_deg),
        };
        let hand_rest = hand.map(|j| j.rest).unwrap_or(Quat::IDENTITY);

        Self {
            side,
            hand,
            palm_target: hand_rest * euler_degrees(palm_offset),
            digits,
            finger_axis: Vec3::from_array(config.finger_axis).normalize_or_zero(),
            thumb_axis: Vec3::from_array(config.thumb_axis).normalize_or_zero(),
            finger_max: config.finger_max_deg.map(f32::to_radians),
            thumb_max: config.thumb_max_deg.map(f32::to_radians),
            sign: sign.signum(),
            speed: config.speed,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Number of finger bones the rig provides for this hand.
    pub fn bound_joints(&self) -> usize {
        self.digits.iter().flatten().filter(|j| j.is_some()).count()
    }

    /// Target local rotation for joint `j` of digit `digit` at `curl`.
    fn joint_target(&self, digit: usize, j: usize, rest: Quat, curl: f32) -> Quat {
        let (axis, max) = if digit == 0 {
            (self.thumb_axis, self.thumb_max[j])
        } else {
            (self.finger_axis, self.finger_max[j])
        };
        rest * Quat::from_axis_angle(axis, self.sign * curl * max)
    }

    /// Curl the rig's fingers toward the tracked hand. Returns the curls
    /// applied, or `None` for an incomplete hand.
    pub fn apply<R: Rig + ?Sized>(
        &self,
        rig: &mut R,
        landmarks: &[Landmark],
        dt: f32,
    ) -> Option<[f32; 5]> {
        let curls = hand_curls(landmarks)?;

        for (digit, chain) in self.digits.iter().enumerate() {
            for (j, joint) in chain.iter().enumerate() {
                let Some(joint) = joint else { continue };
                let target = self.joint_target(digit, j, joint.rest, curls[digit]);
                let current = rig.local_rotation(joint.node);
                rig.set_local_rotation(joint.node, damp_rotation(current, target, self.speed, dt));
            }
        }

        if let Some(hand) = self.hand {
            let current = rig.local_rotation(hand.node);
            rig.set_local_rotation(
                hand.node,
                damp_rotation(current, self.palm_target, self.speed, dt),
            );
        }

        Some(curls)
    }

    /// Ease the hand and fingers back to rest.
    pub fn relax<R: Rig + ?Sized>(&self, rig: &mut R, speed: f32, dt: f32) {
        for joint in self.digits.iter().flatten().chain(std::iter::once(&self.hand)).flatten() {
            let current = rig.local_rotation(joint.node);
            rig.set_local_rotation(joint.node, damp_rotation(current, joint.rest, speed, dt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::Skeleton;

    /// Straight fingers along +x, one row per digit.
    fn open_hand() -> Vec<Landmark> {
        let mut points = vec![Landmark::new(0.0, 0.0, 0.0); hand::COUNT];
        for (digit, joints) in hand::FINGER_JOINTS.iter().enumerate() {
            for (j, &idx) in joints.iter().enumerate() {
                points[idx] = Landmark::new(0.05 + 0.03 * j as f32, 0.02 * digit as f32, 0.0);
            }
        }
        points
    }

    /// Fold a digit back on itself so the tip meets the MCP joint.
    fn fold(points: &mut [Landmark], digit: usize) {
        let joints = hand::FINGER_JOINTS[digit];
        let base = points[joints[0]];
        points[joints[1]] = Landmark::new(base.x + 0.03, base.y, 0.0);
        points[joints[2]] = Landmark::new(base.x + 0.03, base.y + 0.03, 0.0);
        points[joints[3]] = base;
    }

    #[test]
    fn test_straight_finger_has_zero_curl() {
        let joints = [
            Vec3::ZERO,
            Vec3::new(0.04, 0.0, 0.0),
            Vec3::new(0.065, 0.0, 0.0),
            Vec3::new(0.085, 0.0, 0.0),
        ];
        assert!(raw_curl(joints) < 1e-5);
        assert!(finger_curl(joints) < 1e-3);
    }

    #[test]
    fn test_folded_finger_curl() {
        // Unit segments with the tip at 1.2 from the MCP: straight = 0.4 × arc
        let s = 1.22f32;
        let x = (s - (s * s - 4.0 * 0.0242).sqrt()) / 2.0;
        let joints = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(x, s - x, 0.0),
        ];
        assert!((joints[2].distance(joints[3]) - 1.0).abs() < 1e-3);

        let raw = raw_curl(joints);
        assert!((raw - 0.6).abs() < 1e-3, "raw curl {raw}");

        let expected = (0.6f32.powf(0.7) * 1.5).clamp(0.0, 1.0);
        assert!((finger_curl(joints) - expected).abs() < 1e-2);
        assert!(finger_curl(joints) >= 0.98);
    }

    #[test]
    fn test_degenerate_finger_reads_open() {
        assert_eq!(raw_curl([Vec3::ONE; 4]), 0.0);
    }

    #[test]
    fn test_reshape_is_monotonic_and_bounded() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let c = reshape_curl(i as f32 / 100.0);
            assert!((0.0..=1.0).contains(&c));
            assert!(c >= prev);
            prev = c;
        }
        assert_eq!(reshape_curl(0.0), 0.0);
    }

    #[test]
    fn test_partial_hand_yields_none() {
        assert!(hand_curls(&open_hand()[..20]).is_none());
    }

    #[test]
    fn test_driver_curls_only_folded_digit() {
        let mut rig = Skeleton::t_pose();
        let binding = RigBinding::resolve(&rig);
        let config = FingerConfig::default();
        let driver = HandDriver::attach(&rig, &binding, Side::Left, &config);
        assert_eq!(driver.bound_joints(), 15);

        let mut points = open_hand();
        fold(&mut points, 1);
        let curls = driver.apply(&mut rig, &points, 10.0).unwrap();
        assert!((curls[1] - 1.0).abs() < 1e-3);
        assert!(curls[2] < 1e-3);

        let index = rig.find_bone(HumanoidBone::LeftIndexProximal).unwrap();
        let middle = rig.find_bone(HumanoidBone::LeftMiddleProximal).unwrap();
        let bent = rig.local_rotation(index);
        assert!((bent.angle_between(Quat::IDENTITY) - config.finger_max_deg[0].to_radians()).abs() < 1e-2);
        assert!(rig.local_rotation(middle).angle_between(Quat::IDENTITY) < 1e-2);

        // Left fingers flex toward the palm (-y in T-pose)
        let tip = bent * Vec3::X;
        assert!(tip.y < 0.0);
    }

    #[test]
    fn test_thumb_uses_its_own_axis() {
        let mut rig = Skeleton::t_pose();
        let binding = RigBinding::resolve(&rig);
        let config = FingerConfig::default();
        let driver = HandDriver::attach(&rig, &binding, Side::Right, &config);

        let mut points = open_hand();
        fold(&mut points, 0);
        driver.apply(&mut rig, &points, 10.0);

        let thumb = rig.find_bone(HumanoidBone::RightThumbProximal).unwrap();
        let (axis, angle) = rig.local_rotation(thumb).to_axis_angle();
        assert!((angle - config.thumb_max_deg[1].to_radians()).abs() < 1e-2);
        assert!(axis.dot(Vec3::from_array(config.thumb_axis)).abs() > 0.99);
    }

    #[test]
    fn test_palm_offset_and_relax() {
        let mut rig = Skeleton::t_pose();
        let binding = RigBinding::resolve(&rig);
        let config = FingerConfig {
            palm_offset_left_deg: [0.0, 0.0, 20.0],
            ..FingerConfig::default()
        };
        let driver = HandDriver::attach(&rig, &binding, Side::Left, &config);
        let hand = rig.find_bone(HumanoidBone::LeftHand).unwrap();

        driver.apply(&mut rig, &open_hand(), 10.0);
        let angle = rig.local_rotation(hand).angle_between(Quat::IDENTITY);
        assert!((angle - 20f32.to_radians()).abs() < 1e-3);

        driver.relax(&mut rig, 4.0, 100.0);
        assert!(rig.local_rotation(hand).angle_between(Quat::IDENTITY) < 1e-2);
    }

    #[test]
    fn test_missing_finger_bones_are_skipped() {
        let mut rig = Skeleton::new();
        let hand_node = rig.add_node("hand", None, Vec3::ZERO, Quat::IDENTITY);
        rig.bind(HumanoidBone::LeftHand, hand_node);
        let binding = RigBinding::resolve(&rig);

        let driver = HandDriver::attach(&rig, &binding, Side::Left, &FingerConfig::default());
        assert_eq!(driver.bound_joints(), 0);
        assert!(driver.apply(&mut rig, &open_hand(), 0.1).is_some());
    }
}
