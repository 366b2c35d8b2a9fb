//! Retargeting core
//!
//! Turns filtered tracker landmarks into humanoid joint rotations:
//! - One Euro filtering of body landmarks
//! - Tracker → rig coordinate mapping with mirroring
//! - Per-arm hysteresis on landmark confidence
//! - Two-bone arm IK and finger curl estimation
//! - Head pose and expression channel mapping
//!
//! Nothing here returns an error. Missing bones are skipped, bad timing holds
//! the last value, degenerate geometry falls back and lost tracking eases
//! joints back to rest.

pub mod arm_ik;
pub mod coords;
pub mod damping;
pub mod engine;
pub mod expression;
pub mod finger;
pub mod head;
pub mod hysteresis;
pub mod one_euro;

pub use arm_ik::{solve_angles, ArmSolution, LimbChain, TwoBoneAngles, TwoBoneIk};
pub use coords::to_rig_space;
pub use damping::{damp_factor, damp_rotation, damp_scalar};
pub use engine::{FrameOutcome, RetargetEngine};
pub use expression::{map_blendshapes, BlinkPair, ExpressionDriver};
pub use finger::{finger_curl, hand_curls, HandDriver};
pub use head::{HeadDriver, HeadPose};
pub use hysteresis::{HysteresisGate, LimbActivation};
pub use one_euro::{FilterBank, OneEuroFilter, OneEuroParams, PointFilter};

use glam::{EulerRot, Quat};

/// XYZ Euler angles in degrees, as used by the calibration settings.
pub(crate) fn euler_degrees(deg: [f32; 3]) -> Quat {
    Quat::from_euler(
        EulerRot::XYZ,
        deg[0].to_radians(),
        deg[1].to_radians(),
        deg[2].to_radians(),
    )
}
