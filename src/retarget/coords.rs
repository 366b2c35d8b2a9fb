//! Tracker space → rig space.
//!
//! Tracker: x right, y down, z away from the viewer.
//! Rig: x right, y up, z forward (toward the viewer).
//! Mirroring negates x so the user's left drives the rig's right.

use glam::Vec3;

use crate::tracking::Landmark;

pub fn to_rig_space(p: Vec3, mirror: bool) -> Vec3 {
    let x = if mirror { -p.x } else { p.x };
    Vec3::new(x, -p.y, -p.z)
}

pub fn landmark_to_rig(landmark: &Landmark, mirror: bool) -> Vec3 {
    to_rig_space(landmark.position(), mirror)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes_flip() {
        let p = to_rig_space(Vec3::new(0.2, 0.3, 0.4), false);
        assert_eq!(p, Vec3::new(0.2, -0.3, -0.4));
    }

    #[test]
    fn test_mirror_negates_x_only() {
        let plain = to_rig_space(Vec3::new(0.2, 0.3, 0.4), false);
        let mirrored = to_rig_space(Vec3::new(0.2, 0.3, 0.4), true);
        assert_eq!(mirrored.x, -plain.x);
        assert_eq!(mirrored.y, plain.y);
        assert_eq!(mirrored.z, plain.z);
    }

    #[test]
    fn test_double_mapping_is_involution() {
        let p = Vec3::new(-0.7, 0.25, 1.5);
        for mirror in [false, true] {
            let twice = to_rig_space(to_rig_space(p, mirror), mirror);
            assert_eq!(twice, p);
        }
    }

    #[test]
    fn test_landmark_visibility_is_irrelevant() {
        let lm = Landmark::new(1.0, 2.0, 3.0).with_visibility(0.1);
        assert_eq!(landmark_to_rig(&lm, true), Vec3::new(-1.0, -2.0, -3.0));
    }
}
