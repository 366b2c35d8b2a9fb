//! Marionette - Real-time landmark → humanoid retargeting
//!
//! Puppeteers a humanoid rig from noisy per-frame tracker landmarks:
//! - Adaptive One Euro filtering of body landmarks
//! - Confidence hysteresis per arm with relaxed fallback poses
//! - Analytic two-bone arm IK and geometric finger curl
//! - Head pose and VRM expression channels from face tracking
//!
//! The caller owns the rig (anything implementing [`rig::Rig`]) and calls
//! [`RetargetEngine::update`] once per display frame.

pub mod config;
pub mod error;
pub mod retarget;
pub mod rig;
pub mod tracking;

pub use config::Config;
pub use error::{MarionetteError, Result};
pub use retarget::{FrameOutcome, RetargetEngine};
pub use rig::{HumanoidBone, Rig, RigBinding, Side, Skeleton};
pub use tracking::TrackerFrame;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
