//! Tracker-space data model
//!
//! Landmarks arrive once per source frame from an external pose/hand/face
//! tracker and are read-only to the retargeting core. Positions are in tracker
//! space: x right, y down, z away from the viewer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single tracked point with optional confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Tracker certainty in [0, 1] that the point is located and unoccluded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }

    /// Confidence, treating an unreported value as fully visible.
    pub fn confidence(&self) -> f32 {
        self.visibility.unwrap_or(1.0).clamp(0.0, 1.0)
    }
}

/// Which of the user's hands a landmark set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    #[serde(alias = "Left")]
    Left,
    #[serde(alias = "Right")]
    Right,
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handedness::Left => write!(f, "left"),
            Handedness::Right => write!(f, "right"),
        }
    }
}

/// Full-body pose landmarks for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyFrame {
    /// Normalized image-space landmarks (33 for the standard layout)
    pub landmarks: Vec<Landmark>,
    /// Metric world-space landmarks (hip-centred), same ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_landmarks: Option<Vec<Landmark>>,
}

/// Coordinate space a set of body landmarks is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkSpace {
    /// Normalized image coordinates
    Image,
    /// Metric, hip-centred
    World,
}

impl BodyFrame {
    /// World landmarks when present and complete, else normalized ones.
    pub fn best_landmarks(&self) -> (LandmarkSpace, &[Landmark]) {
        match &self.world_landmarks {
            Some(world) if world.len() == self.landmarks.len() && !world.is_empty() => {
                (LandmarkSpace::World, world)
            }
            _ => (LandmarkSpace::Image, &self.landmarks),
        }
    }
}

/// One detected hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandFrame {
    pub handedness: Handedness,
    /// 21 landmarks in the standard hand layout
    pub landmarks: Vec<Landmark>,
}

/// Face pose and expression scores for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceFrame {
    /// Head pose as a column-major 4x4 matrix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f32; 16]>,
    /// Blend-shape name → score in [0, 1]
    #[serde(default)]
    pub blendshapes: HashMap<String, f32>,
}

/// Everything the tracker produced for a single source frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerFrame {
    /// Source capture time in seconds
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyFrame>,
    #[serde(default)]
    pub hands: Vec<HandFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceFrame>,
}

/// Body landmark indices (33-point layout)
pub mod pose {
    pub const COUNT: usize = 33;

    pub const NOSE: usize = 0;
    pub const LEFT_EYE: usize = 2;
    pub const RIGHT_EYE: usize = 5;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
}

/// Hand landmark indices (21-point layout)
pub mod hand {
    pub const COUNT: usize = 21;

    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// Four curl joints per digit, thumb first: (MCP, PIP, DIP, TIP) or the
    /// thumb's (CMC, MCP, IP, TIP).
    pub const FINGER_JOINTS: [[usize; 4]; 5] = [
        [THUMB_CMC, THUMB_MCP, THUMB_IP, THUMB_TIP],
        [INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP],
        [MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP],
        [RING_MCP, RING_PIP, RING_DIP, RING_TIP],
        [PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP],
    ];
}

/// ARKit-compatible blend-shape names emitted by the face tracker
pub mod blendshapes {
    pub const BROW_DOWN_LEFT: &str = "browDownLeft";
    pub const BROW_DOWN_RIGHT: &str = "browDownRight";

    pub const EYE_BLINK_LEFT: &str = "eyeBlinkLeft";
    pub const EYE_BLINK_RIGHT: &str = "eyeBlinkRight";
    pub const EYE_LOOK_DOWN_LEFT: &str = "eyeLookDownLeft";
    pub const EYE_LOOK_DOWN_RIGHT: &str = "eyeLookDownRight";
    pub const EYE_LOOK_UP_LEFT: &str = "eyeLookUpLeft";
    pub const EYE_LOOK_UP_RIGHT: &str = "eyeLookUpRight";
    pub const EYE_WIDE_LEFT: &str = "eyeWideLeft";
    pub const EYE_WIDE_RIGHT: &str = "eyeWideRight";

    pub const JAW_OPEN: &str = "jawOpen";

    pub const MOUTH_FUNNEL: &str = "mouthFunnel";
    pub const MOUTH_PUCKER: &str = "mouthPucker";
    pub const MOUTH_SMILE_LEFT: &str = "mouthSmileLeft";
    pub const MOUTH_SMILE_RIGHT: &str = "mouthSmileRight";
    pub const MOUTH_STRETCH_LEFT: &str = "mouthStretchLeft";
    pub const MOUTH_STRETCH_RIGHT: &str = "mouthStretchRight";
}
