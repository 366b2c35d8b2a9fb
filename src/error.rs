//! Error types for Marionette
//!
//! Only the edges of the crate can fail: loading configuration, parsing
//! tracker packets and loading rig descriptions. The retargeting core is
//! infallible and degrades silently instead.

use thiserror::Error;

/// Main error type for Marionette
#[derive(Error, Debug)]
pub enum MarionetteError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Rig error: {0}")]
    Rig(#[from] RigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Tracker input errors (packets and recordings)
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Failed to read recording: {0}")]
    ReadRecording(String),

    #[error("Packet parse error: {0}")]
    Parse(String),

    #[error("Packet parse error on line {line}: {message}")]
    ParseLine { line: usize, message: String },
}

/// Rig description errors
#[derive(Error, Debug)]
pub enum RigError {
    #[error("Failed to read rig description: {0}")]
    ReadFile(String),

    #[error("Failed to parse rig description: {0}")]
    Parse(String),

    #[error("Node '{node}' references unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },

    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Unknown humanoid bone name: {0}")]
    UnknownBone(String),
}

/// Result type alias for Marionette operations
pub type Result<T> = std::result::Result<T, MarionetteError>;
