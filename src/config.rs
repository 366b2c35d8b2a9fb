//! Configuration parsing and management for Marionette

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, MarionetteError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mirror the subject (selfie view): the user's left drives the rig's right
    pub mirror: bool,
    /// Largest time step fed to damping in one update (seconds)
    pub max_step_secs: f32,
    pub filter: FilterConfig,
    pub gate: GateConfig,
    pub arm: ArmConfig,
    pub finger: FingerConfig,
    pub head: HeadConfig,
    pub expression: ExpressionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror: true,
            max_step_secs: 0.25,
            filter: FilterConfig::default(),
            gate: GateConfig::default(),
            arm: ArmConfig::default(),
            finger: FingerConfig::default(),
            head: HeadConfig::default(),
            expression: ExpressionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MarionetteError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, MarionetteError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, MarionetteError> {
        let paths = [
            PathBuf::from("marionette.toml"),
            PathBuf::from("config/marionette.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MarionetteError> {
        if !(self.max_step_secs > 0.0) {
            return Err(invalid("max_step_secs", "Must be greater than 0"));
        }

        // Filter
        if !(self.filter.min_cutoff > 0.0) {
            return Err(invalid("filter.min_cutoff", "Must be greater than 0"));
        }
        if !(self.filter.d_cutoff > 0.0) {
            return Err(invalid("filter.d_cutoff", "Must be greater than 0"));
        }
        if !(self.filter.beta >= 0.0) {
            return Err(invalid("filter.beta", "Must not be negative"));
        }

        // Hysteresis gate
        for (field, value) in [
            ("gate.on_threshold", self.gate.on_threshold),
            ("gate.off_threshold", self.gate.off_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, "Threshold must be between 0.0 and 1.0"));
            }
        }
        if self.gate.on_threshold <= self.gate.off_threshold {
            return Err(invalid(
                "gate.on_threshold",
                "Must be greater than gate.off_threshold",
            ));
        }

        // Damping speeds
        for (field, value) in [
            ("arm.speed", self.arm.speed),
            ("arm.rest_speed", self.arm.rest_speed),
            ("finger.speed", self.finger.speed),
            ("head.speed", self.head.speed),
            ("expression.speed", self.expression.speed),
        ] {
            if !(value > 0.0) {
                return Err(invalid(field, "Speed must be greater than 0"));
            }
        }

        if !(self.arm.epsilon > 0.0) {
            return Err(invalid("arm.epsilon", "Must be greater than 0"));
        }
        if glam::Vec3::from_array(self.arm.hinge_axis).length_squared() < 1e-8 {
            return Err(invalid("arm.hinge_axis", "Axis must be non-zero"));
        }
        if glam::Vec3::from_array(self.finger.finger_axis).length_squared() < 1e-8 {
            return Err(invalid("finger.finger_axis", "Axis must be non-zero"));
        }
        if glam::Vec3::from_array(self.finger.thumb_axis).length_squared() < 1e-8 {
            return Err(invalid("finger.thumb_axis", "Axis must be non-zero"));
        }

        if self.expression.sensitivity < 0.0 {
            return Err(invalid("expression.sensitivity", "Must not be negative"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> MarionetteError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// 1-Euro filter parameters for body landmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum cutoff frequency (Hz); lower = smoother at rest
    pub min_cutoff: f32,
    /// Speed coefficient; higher = less lag during fast motion
    pub beta: f32,
    /// Derivative cutoff frequency (Hz)
    pub d_cutoff: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_cutoff: 1.0,
            beta: 0.4,
            d_cutoff: 1.0,
        }
    }
}

/// Limb activation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Confidence above which an inactive limb activates
    pub on_threshold: f32,
    /// Confidence below which an active limb deactivates
    pub off_threshold: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            on_threshold: 0.65,
            off_threshold: 0.45,
        }
    }
}

/// Arm IK tuning and relaxed pose
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Damping speed while tracked (1/s)
    pub speed: f32,
    /// Damping speed while easing back to the relaxed pose (1/s)
    pub rest_speed: f32,
    /// Reach margin keeping the triangle away from fully straight/folded
    pub epsilon: f32,
    /// Elbow hinge axis in the lower arm's local frame
    pub hinge_axis: [f32; 3],
    pub left_hinge_sign: f32,
    pub right_hinge_sign: f32,
    /// Relaxed pose offsets, XYZ Euler degrees on top of the rest rotation
    pub relaxed_upper_left_deg: [f32; 3],
    pub relaxed_upper_right_deg: [f32; 3],
    pub relaxed_lower_left_deg: [f32; 3],
    pub relaxed_lower_right_deg: [f32; 3],
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            speed: 12.0,
            rest_speed: 4.0,
            epsilon: 1e-4,
            hinge_axis: [0.0, 1.0, 0.0],
            left_hinge_sign: -1.0,
            right_hinge_sign: 1.0,
            relaxed_upper_left_deg: [0.0, 0.0, -70.0],
            relaxed_upper_right_deg: [0.0, 0.0, 70.0],
            relaxed_lower_left_deg: [0.0, -10.0, 0.0],
            relaxed_lower_right_deg: [0.0, 10.0, 0.0],
        }
    }
}

/// Finger curl calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerConfig {
    /// Damping speed (1/s); faster than the arms
    pub speed: f32,
    /// Flexion axis for index..little bones (local frame)
    pub finger_axis: [f32; 3],
    /// Flexion axis for thumb bones (local frame)
    pub thumb_axis: [f32; 3],
    /// Max flexion per joint [proximal, intermediate, distal] (degrees)
    pub finger_max_deg: [f32; 3],
    /// Max flexion per thumb joint [metacarpal, proximal, distal] (degrees)
    pub thumb_max_deg: [f32; 3],
    pub left_sign: f32,
    pub right_sign: f32,
    /// Palm orientation while tracked, XYZ Euler degrees on top of rest
    pub palm_offset_left_deg: [f32; 3],
    pub palm_offset_right_deg: [f32; 3],
}

impl Default for FingerConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            finger_axis: [0.0, 0.0, 1.0],
            thumb_axis: [0.0, 1.0, 0.0],
            finger_max_deg: [70.0, 95.0, 65.0],
            thumb_max_deg: [25.0, 45.0, 60.0],
            left_sign: -1.0,
            right_sign: 1.0,
            palm_offset_left_deg: [0.0, 0.0, 0.0],
            palm_offset_right_deg: [0.0, 0.0, 0.0],
        }
    }
}

/// Head pose mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadConfig {
    pub speed: f32,
    pub yaw_limit_deg: f32,
    pub pitch_limit_deg: f32,
    pub roll_limit_deg: f32,
    /// Share of the tracked rotation given to the head bone
    pub head_fraction: f32,
    /// Share given to the neck bone
    pub neck_fraction: f32,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            yaw_limit_deg: 60.0,
            pitch_limit_deg: 45.0,
            roll_limit_deg: 40.0,
            head_fraction: 0.7,
            neck_fraction: 0.3,
        }
    }
}

/// Blend-shape to expression mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Damping speed (1/s); facial response should feel immediate
    pub speed: f32,
    /// Multiplier applied to raw blend-shape scores
    pub sensitivity: f32,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            speed: 25.0,
            sensitivity: 1.0,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("marionette");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/marionette");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/marionette");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("marionette");
        }
    }

    PathBuf::from(".")
}
