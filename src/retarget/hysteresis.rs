//! Confidence gate with separate activation and release thresholds.

use crate::config::GateConfig;

/// Whether a limb is currently driven by tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimbActivation {
    #[default]
    Inactive,
    Active,
}

impl LimbActivation {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl std::fmt::Display for LimbActivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Two-threshold state machine. Confidence between the thresholds holds the
/// current state.
#[derive(Debug, Clone)]
pub struct HysteresisGate {
    on_threshold: f32,
    off_threshold: f32,
    state: LimbActivation,
}

impl HysteresisGate {
    /// `on_threshold` must exceed `off_threshold`; config validation enforces it.
    pub fn new(on_threshold: f32, off_threshold: f32) -> Self {
        Self {
            on_threshold,
            off_threshold,
            state: LimbActivation::Inactive,
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.on_threshold, config.off_threshold)
    }

    /// Feed one confidence sample and return the resulting state.
    pub fn update(&mut self, confidence: f32) -> LimbActivation {
        self.state = match self.state {
            LimbActivation::Inactive if confidence > self.on_threshold => LimbActivation::Active,
            LimbActivation::Active if confidence < self.off_threshold => LimbActivation::Inactive,
            held => held,
        };
        self.state
    }

    pub fn state(&self) -> LimbActivation {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = LimbActivation::Inactive;
    }
}

impl Default for HysteresisGate {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LimbActivation::{Active, Inactive};

    #[test]
    fn test_starts_inactive() {
        assert_eq!(HysteresisGate::default().state(), Inactive);
    }

    #[test]
    fn test_sequence() {
        let mut gate = HysteresisGate::new(0.65, 0.45);
        let states: Vec<_> = [0.7, 0.5, 0.3, 0.7]
            .into_iter()
            .map(|c| gate.update(c))
            .collect();
        assert_eq!(states, vec![Active, Active, Inactive, Active]);
    }

    #[test]
    fn test_dead_zone_holds_inactive() {
        let mut gate = HysteresisGate::new(0.65, 0.45);
        for c in [0.5, 0.6, 0.65, 0.46] {
            assert_eq!(gate.update(c), Inactive);
        }
    }

    #[test]
    fn test_thresholds_are_strict() {
        let mut gate = HysteresisGate::new(0.65, 0.45);
        assert_eq!(gate.update(0.65), Inactive);
        assert_eq!(gate.update(0.66), Active);
        assert_eq!(gate.update(0.45), Active);
        assert_eq!(gate.update(0.44), Inactive);
    }

    #[test]
    fn test_reset() {
        let mut gate = HysteresisGate::new(0.65, 0.45);
        gate.update(1.0);
        assert!(gate.state().is_active());
        gate.reset();
        assert_eq!(gate.state(), Inactive);
    }
}
