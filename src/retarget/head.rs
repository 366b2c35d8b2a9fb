//! Head and neck rotation from the face tracker's pose matrix.

use glam::{EulerRot, Mat4, Quat};

use super::damping::damp_rotation;
use crate::config::HeadConfig;
use crate::rig::{HumanoidBone, NodeId, Rig, RigBinding};

/// Head orientation in radians (YXZ order)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl HeadPose {
    /// Decompose a column-major 4x4 transform. `None` for a non-finite or
    /// collapsed matrix.
    pub fn from_matrix(cols: &[f32; 16]) -> Option<Self> {
        let m = Mat4::from_cols_array(cols);
        if !m.is_finite() {
            return None;
        }
        let (scale, rotation, _) = m.to_scale_rotation_translation();
        if scale.abs().min_element() < 1e-6 || !rotation.is_finite() {
            return None;
        }
        let (yaw, pitch, roll) = rotation.normalize().to_euler(EulerRot::YXZ);
        Some(Self { yaw, pitch, roll })
    }

    /// Mirror across the vertical plane: yaw and roll flip, pitch stays.
    pub fn mirrored(self) -> Self {
        Self {
            yaw: -self.yaw,
            pitch: self.pitch,
            roll: -self.roll,
        }
    }

    pub fn clamped(self, config: &HeadConfig) -> Self {
        let clamp = |v: f32, limit_deg: f32| {
            let limit = limit_deg.to_radians();
            v.clamp(-limit, limit)
        };
        Self {
            yaw: clamp(self.yaw, config.yaw_limit_deg),
            pitch: clamp(self.pitch, config.pitch_limit_deg),
            roll: clamp(self.roll, config.roll_limit_deg),
        }
    }

    /// Rotation covering `fraction` of each axis.
    pub fn rotation(&self, fraction: f32) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.yaw * fraction,
            self.pitch * fraction,
            self.roll * fraction,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Joint {
    node: NodeId,
    rest: Quat,
}

/// Splits head pose between the head and neck bones.
#[derive(Debug, Clone)]
pub struct HeadDriver {
    head: Option<Joint>,
    neck: Option<Joint>,
    config: HeadConfig,
}

impl HeadDriver {
    pub fn attach<R: Rig + ?Sized>(rig: &R, binding: &RigBinding, config: &HeadConfig) -> Self {
        let joint = |bone| {
            binding.get(bone).map(|node| Joint {
                node,
                rest: rig.rest_rotation(node),
            })
        };
        Self {
            head: joint(HumanoidBone::Head),
            neck: joint(HumanoidBone::Neck),
            config: config.clone(),
        }
    }

    /// Raw tracker pose → the pose applied to the rig. Yaw and roll are
    /// negated only when `mirror` is set; an unmirrored engine turns the
    /// head exactly as the tracker reports it.
    pub fn resolve_pose(&self, raw: HeadPose, mirror: bool) -> HeadPose {
        let pose = if mirror { raw.mirrored() } else { raw };
        pose.clamped(&self.config)
    }

    pub fn apply<R: Rig + ?Sized>(&self, rig: &mut R, pose: HeadPose, dt: f32) {
        for (joint, fraction) in [
            (self.head, self.config.head_fraction),
            (self.neck, self.config.neck_fraction),
        ] {
            let Some(joint) = joint else { continue };
            let target = joint.rest * pose.rotation(fraction);
            let current = rig.local_rotation(joint.node);
            rig.set_local_rotation(joint.node, damp_rotation(current, target, self.config.speed, dt));
        }
    }

    /// Ease head and neck back to rest.
    pub fn relax<R: Rig + ?Sized>(&self, rig: &mut R, speed: f32, dt: f32) {
        for joint in [self.head, self.neck].into_iter().flatten() {
            let current = rig.local_rotation(joint.node);
            rig.set_local_rotation(joint.node, damp_rotation(current, joint.rest, speed, dt));
        }
    }
}
