//! Tracking module
//!
//! Tracker-side input consumed by the retargeting engine:
//! - Landmark data model for body, hands and face
//! - Landmark index tables for the 33-point body and 21-point hand layouts
//! - JSON packet and JSON-lines recording parsing

pub mod landmark;
pub mod packet;

pub use landmark::{
    blendshapes, hand, pose, BodyFrame, FaceFrame, HandFrame, Handedness, Landmark,
    LandmarkSpace, TrackerFrame,
};
pub use packet::{parse_recording, read_recording};
