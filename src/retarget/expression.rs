//! ARKit-style blend-shape scores → VRM expression channels.
//!
//! Scores map directly or through simple combinations onto the preset
//! channels, then ease toward their targets faster than limbs do.

use std::collections::HashMap;

use tracing::debug;

use super::damping::damp_scalar;
use crate::config::ExpressionConfig;
use crate::rig::Rig;
use crate::tracking::blendshapes as bs;

/// Expression channels this mapper writes
pub const CHANNELS: &[&str] = &[
    "aa", "ih", "ou", "ee", "oh", "blink", "blinkLeft", "blinkRight", "happy", "angry",
    "surprised", "lookUp", "lookDown",
];

/// Head yaw (radians, ~23°) past which the eye turned away from the camera
/// stops tracking reliably
const OCCLUSION_START: f32 = 0.4;
/// Yaw (~34°) at which the hidden eye simply copies the visible one
const OCCLUSION_FULL: f32 = 0.6;
/// Weaker/stronger eye ratio below which the weaker score is wink leakage
const CROSSTALK_RATIO: f32 = 0.6;
/// Both eyes under this read as open and are left alone
const CROSSTALK_FLOOR: f32 = 0.05;

/// Left and right blink scores for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkPair {
    pub left: f32,
    pub right: f32,
}

impl BlinkPair {
    /// Pull the hidden eye toward the visible one as the head turns away.
    /// Positive yaw hides the left eye.
    pub fn occlusion_compensated(self, head_yaw_rad: f32) -> Self {
        let t = ((head_yaw_rad.abs() - OCCLUSION_START) / (OCCLUSION_FULL - OCCLUSION_START))
            .clamp(0.0, 1.0);
        if t == 0.0 {
            return self;
        }
        if head_yaw_rad > 0.0 {
            Self {
                left: self.left + (self.right - self.left) * t,
                ..self
            }
        } else {
            Self {
                right: self.right + (self.left - self.right) * t,
                ..self
            }
        }
    }

    /// A wink leaks 0.2-0.4 onto the open eye. When the weaker eye reads
    /// under `CROSSTALK_RATIO` of the stronger one it is scaled by
    /// `ratio / CROSSTALK_RATIO`, reaching zero for a one-eyed wink.
    pub fn crosstalk_suppressed(self) -> Self {
        let strong = self.left.max(self.right);
        if strong < CROSSTALK_FLOOR {
            return self;
        }
        let ratio = self.left.min(self.right) / strong;
        if ratio >= CROSSTALK_RATIO {
            return self;
        }
        let scale = ratio / CROSSTALK_RATIO;
        if self.left < self.right {
            Self {
                left: self.left * scale,
                ..self
            }
        } else {
            Self {
                right: self.right * scale,
                ..self
            }
        }
    }
}

/// Target weight for every channel in `CHANNELS`, clamped to [0, 1].
///
/// `sensitivity` scales raw scores before mapping. `head_yaw_rad` drives the
/// eye occlusion compensation.
pub fn map_blendshapes(
    scores: &HashMap<String, f32>,
    sensitivity: f32,
    head_yaw_rad: f32,
) -> HashMap<&'static str, f32> {
    let get = |key: &str| scores.get(key).copied().unwrap_or(0.0) * sensitivity;
    let mut weights: HashMap<&'static str, f32> = CHANNELS.iter().map(|&c| (c, 0.0)).collect();
    let mut set = |channel: &'static str, value: f32| {
        weights.insert(channel, value.clamp(0.0, 1.0));
    };

    let jaw_open = get(bs::JAW_OPEN);
    set("aa", jaw_open);
    set("ou", get(bs::MOUTH_PUCKER));
    set("oh", get(bs::MOUTH_FUNNEL));
    set(
        "ih",
        (get(bs::MOUTH_STRETCH_LEFT) + get(bs::MOUTH_STRETCH_RIGHT)) * 0.5,
    );

    let smile_l = get(bs::MOUTH_SMILE_LEFT);
    let smile_r = get(bs::MOUTH_SMILE_RIGHT);
    set("ee", (smile_l + smile_r) * 0.6);

    let blinks = BlinkPair {
        left: get(bs::EYE_BLINK_LEFT),
        right: get(bs::EYE_BLINK_RIGHT),
    }
    .occlusion_compensated(head_yaw_rad)
    .crosstalk_suppressed();
    set("blinkLeft", blinks.left);
    set("blinkRight", blinks.right);
    // Rigs with only the combined channel still blink
    set("blink", (blinks.left + blinks.right) * 0.5);

    let avg_smile = (smile_l + smile_r) * 0.5;
    if avg_smile > 0.35 {
        set("happy", (avg_smile - 0.35) * 1.5);
    }

    let avg_eye_wide = (get(bs::EYE_WIDE_LEFT) + get(bs::EYE_WIDE_RIGHT)) * 0.5;
    if avg_eye_wide > 0.2 && jaw_open > 0.2 {
        set("surprised", (avg_eye_wide + jaw_open) * 0.5);
    }

    let avg_brow_down = (get(bs::BROW_DOWN_LEFT) + get(bs::BROW_DOWN_RIGHT)) * 0.5;
    if avg_brow_down > 0.3 {
        set("angry", (avg_brow_down - 0.3) * 1.4);
    }

    set(
        "lookUp",
        (get(bs::EYE_LOOK_UP_LEFT) + get(bs::EYE_LOOK_UP_RIGHT)) * 0.5,
    );
    set(
        "lookDown",
        (get(bs::EYE_LOOK_DOWN_LEFT) + get(bs::EYE_LOOK_DOWN_RIGHT)) * 0.5,
    );

    weights
}

/// Writes mapped weights to the channels a rig exposes.
#[derive(Debug, Clone)]
pub struct ExpressionDriver {
    available: Vec<&'static str>,
    config: ExpressionConfig,
}

impl ExpressionDriver {
    pub fn attach<R: Rig + ?Sized>(rig: &R, config: &ExpressionConfig) -> Self {
        let available: Vec<_> = CHANNELS
            .iter()
            .copied()
            .filter(|c| rig.has_expression(c))
            .collect();
        if available.len() < CHANNELS.len() {
            debug!(
                "Rig exposes {}/{} expression channels",
                available.len(),
                CHANNELS.len()
            );
        }
        Self {
            available,
            config: config.clone(),
        }
    }

    pub fn available(&self) -> &[&'static str] {
        &self.available
    }

    pub fn apply<R: Rig + ?Sized>(
        &self,
        rig: &mut R,
        scores: &HashMap<String, f32>,
        head_yaw_rad: f32,
        dt: f32,
    ) {
        let targets = map_blendshapes(scores, self.config.sensitivity, head_yaw_rad);
        for &channel in &self.available {
            let target = targets.get(channel).copied().unwrap_or(0.0);
            self.ease(rig, channel, target, dt);
        }
    }

    /// Ease every channel back to neutral.
    pub fn relax<R: Rig + ?Sized>(&self, rig: &mut R, dt: f32) {
        for &channel in &self.available {
            self.ease(rig, channel, 0.0, dt);
        }
    }

    fn ease<R: Rig + ?Sized>(&self, rig: &mut R, channel: &str, target: f32, dt: f32) {
        let current = rig.expression_weight(channel);
        let next = damp_scalar(current, target, self.config.speed, dt);
        rig.set_expression_weight(channel, next.clamp(0.0, 1.0));
    }
}
