//! Frame orchestrator
//!
//! One `RetargetEngine` owns all per-session state for one rig and one
//! tracking session: the body filter banks, the arm gates, the bone binding
//! and the last processed source timestamp. The host calls `update` once per
//! display frame; frames whose timestamp has not advanced are skipped.

use glam::Vec3;
use tracing::{debug, info, trace, warn};

use super::arm_ik::{LimbChain, TwoBoneIk};
use super::coords::to_rig_space;
use super::expression::ExpressionDriver;
use super::finger::HandDriver;
use super::head::{HeadDriver, HeadPose};
use super::hysteresis::{HysteresisGate, LimbActivation};
use super::one_euro::{FilterBank, OneEuroParams};
use crate::config::Config;
use crate::rig::{Rig, RigBinding, Side};
use crate::tracking::{
    pose, BodyFrame, FaceFrame, Handedness, Landmark, LandmarkSpace, TrackerFrame,
};

/// What `update` did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// New source frame; the rig was updated
    Processed,
    /// Source timestamp did not advance; nothing was touched
    Stale,
}

#[derive(Debug, Clone)]
struct ArmState {
    chain: Option<LimbChain>,
    gate: HysteresisGate,
}

/// Retargeting context for one rig and one tracking session
#[derive(Debug, Clone)]
pub struct RetargetEngine {
    config: Config,
    binding: RigBinding,
    /// One bank per landmark space; a frame only feeds the bank of its space
    image_filters: FilterBank,
    world_filters: FilterBank,
    ik: TwoBoneIk,
    arms: [ArmState; 2],
    hands: [HandDriver; 2],
    head: HeadDriver,
    expressions: ExpressionDriver,
    last_timestamp: Option<f64>,
    pending_dt: f32,
}

fn arm_indices(side: Side) -> [usize; 3] {
    match side {
        Side::Left => [pose::LEFT_SHOULDER, pose::LEFT_ELBOW, pose::LEFT_WRIST],
        Side::Right => [pose::RIGHT_SHOULDER, pose::RIGHT_ELBOW, pose::RIGHT_WRIST],
    }
}

fn handedness_side(handedness: Handedness) -> Side {
    match handedness {
        Handedness::Left => Side::Left,
        Handedness::Right => Side::Right,
    }
}

/// Shoulder-relative IK target and pole in rig space.
///
/// The tracked shoulder→wrist direction is kept; its length is the tracked
/// extension ratio scaled to the rig's reach, so users and rigs of different
/// proportions line up.
fn reach_target(points: [Landmark; 3], mirror: bool, reach: f32) -> Option<(Vec3, Vec3)> {
    let [shoulder, elbow, wrist] = points.map(|p| to_rig_space(p.position(), mirror));
    let tracked_len = shoulder.distance(elbow) + elbow.distance(wrist);
    if !(tracked_len > f32::EPSILON) {
        return None;
    }
    let extension = (shoulder.distance(wrist) / tracked_len).clamp(0.0, 1.0);
    let target = (wrist - shoulder).normalize_or_zero() * extension * reach;
    Some((target, elbow - shoulder))
}

impl RetargetEngine {
    /// Bind to `rig`: resolve bones, assemble arm chains and size the filter
    /// bank. `config` should already be validated.
    pub fn attach<R: Rig + ?Sized>(rig: &R, config: Config) -> Self {
        let binding = RigBinding::resolve(rig);
        info!(
            "Retarget engine attached: {}/{} humanoid bones bound",
            binding.bound_count(),
            crate::rig::HumanoidBone::COUNT
        );
        for bone in binding.missing() {
            debug!("Rig has no {} bone; skipping it", bone);
        }

        let arms = Side::BOTH.map(|side| {
            let chain = LimbChain::assemble(rig, &binding, side, &config.arm);
            if chain.is_none() {
                warn!("{} arm chain unavailable; arm will not be posed", side);
            }
            ArmState {
                chain,
                gate: HysteresisGate::from_config(&config.gate),
            }
        });
        let hands = Side::BOTH.map(|side| HandDriver::attach(rig, &binding, side, &config.finger));

        Self {
            image_filters: FilterBank::new(pose::COUNT, OneEuroParams::from(&config.filter)),
            world_filters: FilterBank::new(pose::COUNT, OneEuroParams::from(&config.filter)),
            ik: TwoBoneIk::from_config(&config.arm),
            head: HeadDriver::attach(rig, &binding, &config.head),
            expressions: ExpressionDriver::attach(rig, &config.expression),
            arms,
            hands,
            binding,
            config,
            last_timestamp: None,
            pending_dt: 0.0,
        }
    }

    /// Rig changed: re-resolve everything against the new rig, then reset.
    pub fn rebind<R: Rig + ?Sized>(&mut self, rig: &R) {
        *self = Self::attach(rig, self.config.clone());
    }

    /// Forget all tracking history (subject change).
    pub fn reset(&mut self) {
        self.image_filters.reset();
        self.world_filters.reset();
        for arm in &mut self.arms {
            arm.gate.reset();
        }
        self.last_timestamp = None;
        self.pending_dt = 0.0;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn binding(&self) -> &RigBinding {
        &self.binding
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Display time accumulated since the last processed frame.
    pub fn pending_secs(&self) -> f32 {
        self.pending_dt
    }

    /// Activation state of the rig's arm on `side`.
    pub fn activation(&self, side: Side) -> LimbActivation {
        self.arms[side.index()].gate.state()
    }

    pub fn has_arm_chain(&self, side: Side) -> bool {
        self.arms[side.index()].chain.is_some()
    }

    /// The user's side that drives the rig's `side`.
    fn tracked_side(&self, side: Side) -> Side {
        if self.config.mirror {
            side.opposite()
        } else {
            side
        }
    }

    /// Run one display frame. `dt` is the display time since the previous
    /// call; it accumulates across stale frames.
    pub fn update<R: Rig + ?Sized>(
        &mut self,
        rig: &mut R,
        frame: &TrackerFrame,
        dt: f32,
    ) -> FrameOutcome {
        if dt > 0.0 {
            self.pending_dt += dt;
        }

        if let Some(last) = self.last_timestamp {
            if frame.timestamp <= last {
                return FrameOutcome::Stale;
            }
        }

        let step = self.pending_dt.min(self.config.max_step_secs);
        self.pending_dt = 0.0;
        self.last_timestamp = Some(frame.timestamp);

        trace!("Processing frame t={:.3} step={:.4}", frame.timestamp, step);

        self.drive_arms(rig, frame, step);
        self.drive_hands(rig, frame, step);
        self.drive_face(rig, frame.face.as_ref(), step);

        FrameOutcome::Processed
    }

    /// Smooth body landmarks in the bank matching their space.
    fn filter_body(&mut self, body: &BodyFrame, timestamp: f64) -> Vec<Landmark> {
        let (space, landmarks) = body.best_landmarks();
        let bank = match space {
            LandmarkSpace::Image => &mut self.image_filters,
            LandmarkSpace::World => &mut self.world_filters,
        };
        bank.filter_all(landmarks, timestamp)
    }

    fn drive_arms<R: Rig + ?Sized>(&mut self, rig: &mut R, frame: &TrackerFrame, dt: f32) {
        let filtered = frame
            .body
            .as_ref()
            .map(|body| self.filter_body(body, frame.timestamp));

        for side in Side::BOTH {
            let tracked = self.tracked_side(side);
            let points = filtered.as_deref().and_then(|landmarks| {
                let idx = arm_indices(tracked);
                let get = |i: usize| landmarks.get(i).copied();
                Some([get(idx[0])?, get(idx[1])?, get(idx[2])?])
            });

            // Weakest joint decides; no body counts as lost
            let confidence = points
                .map(|p| p.iter().map(Landmark::confidence).fold(1.0, f32::min))
                .unwrap_or(0.0);

            let arm = &mut self.arms[side.index()];
            let before = arm.gate.state();
            let state = arm.gate.update(confidence);
            if state != before {
                debug!("{} arm {} (confidence {:.2})", side, state, confidence);
            }

            let Some(chain) = &arm.chain else { continue };
            match (state, points) {
                (LimbActivation::Active, Some(points)) => {
                    if let Some((target, pole)) =
                        reach_target(points, self.config.mirror, chain.reach())
                    {
                        self.ik.solve(rig, chain, target, pole, dt);
                    }
                }
                _ => chain.relax(rig, self.config.arm.rest_speed, dt),
            }
        }
    }

    fn drive_hands<R: Rig + ?Sized>(&self, rig: &mut R, frame: &TrackerFrame, dt: f32) {
        for driver in &self.hands {
            let tracked = self.tracked_side(driver.side());
            let hand = frame
                .hands
                .iter()
                .find(|h| handedness_side(h.handedness) == tracked);
            match hand {
                // Incomplete hands hold their last pose
                Some(hand) => {
                    driver.apply(rig, &hand.landmarks, dt);
                }
                None => driver.relax(rig, self.config.arm.rest_speed, dt),
            }
        }
    }

    fn drive_face<R: Rig + ?Sized>(&self, rig: &mut R, face: Option<&FaceFrame>, dt: f32) {
        let Some(face) = face else {
            self.head.relax(rig, self.config.arm.rest_speed, dt);
            self.expressions.relax(rig, dt);
            return;
        };

        let raw = face.transform.as_ref().and_then(HeadPose::from_matrix);
        let head_yaw = match raw {
            Some(raw) => {
                let pose = self.head.resolve_pose(raw, self.config.mirror);
                self.head.apply(rig, pose, dt);
                raw.yaw
            }
            None => {
                self.head.relax(rig, self.config.arm.rest_speed, dt);
                0.0
            }
        };

        self.expressions.apply(rig, &face.blendshapes, head_yaw, dt);
    }
}
