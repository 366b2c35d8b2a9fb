//! Marionette - recording replay
//!
//! Replays a JSON-lines tracker recording against a skeleton on a simulated
//! display clock and prints the final pose.

use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marionette::{
    config::Config,
    tracking::{read_recording, TrackerFrame},
    FrameOutcome, RetargetEngine, Skeleton,
};

/// Marionette - replay tracker recordings onto a humanoid rig
#[derive(Parser, Debug)]
#[command(name = "marionette", version, about, long_about = None)]
struct Args {
    /// JSON-lines tracker recording
    #[arg(short, long)]
    input: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rig description (TOML); built-in T-pose humanoid if omitted
    #[arg(short, long)]
    rig: Option<PathBuf>,

    /// Simulated display refresh rate
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    fps: u32,

    /// Disable mirroring (overrides config)
    #[arg(long)]
    no_mirror: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Final rig state after a replay
#[derive(Debug, Serialize)]
struct ReplaySummary {
    frames: usize,
    ticks: usize,
    processed: usize,
    stale: usize,
    /// Bone → local rotation [x, y, z, w]
    bones: BTreeMap<String, [f32; 4]>,
    expressions: BTreeMap<String, f32>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", marionette::NAME, marionette::VERSION);

    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    if args.no_mirror {
        config.mirror = false;
    }
    config.validate()?;

    let mut rig = match args.rig {
        Some(ref path) => Skeleton::from_file(path)?,
        None => Skeleton::t_pose(),
    };

    let frames = read_recording(&args.input)?;
    info!(
        "Replaying {} frames from {} at {} fps (mirror: {})",
        frames.len(),
        args.input.display(),
        args.fps,
        config.mirror
    );

    let mut engine = RetargetEngine::attach(&rig, config);
    let summary = replay(&mut engine, &mut rig, &frames, args.fps);

    info!(
        "Replay finished: {} ticks, {} processed, {} stale",
        summary.ticks, summary.processed, summary.stale
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Absorbs rounding in the accumulated tick time
const CLOCK_SLACK: f64 = 1e-9;

/// Drive the engine on a fixed display clock. Each tick hands it the newest
/// frame at or before the tick time; frames overtaken between ticks are
/// dropped.
fn replay(
    engine: &mut RetargetEngine,
    rig: &mut Skeleton,
    frames: &[TrackerFrame],
    fps: u32,
) -> ReplaySummary {
    let mut summary = ReplaySummary {
        frames: frames.len(),
        ticks: 0,
        processed: 0,
        stale: 0,
        bones: BTreeMap::new(),
        expressions: BTreeMap::new(),
    };

    let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
        warn!("Recording is empty");
        return summary;
    };

    let tick = 1.0 / fps as f64;
    let mut now = first.timestamp;
    let mut current = 0;

    while now <= last.timestamp + tick * 0.5 {
        while current + 1 < frames.len() && frames[current + 1].timestamp <= now + CLOCK_SLACK {
            current += 1;
        }

        match engine.update(rig, &frames[current], tick as f32) {
            FrameOutcome::Processed => summary.processed += 1,
            FrameOutcome::Stale => summary.stale += 1,
        }
        summary.ticks += 1;
        now += tick;
    }

    let dropped = frames.len().saturating_sub(summary.processed);
    if dropped > 0 {
        info!("{} source frames were overtaken and dropped", dropped);
    }

    summary.bones = rig
        .bone_rotations()
        .into_iter()
        .map(|(bone, q)| (bone.vrm_name().to_string(), q.to_array()))
        .collect();
    summary.expressions = rig
        .expressions()
        .iter()
        .map(|(name, &w)| (name.clone(), w))
        .collect();

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette::tracking::FaceFrame;
    use std::collections::HashMap;

    fn face_frame(t: f64, jaw: f32) -> TrackerFrame {
        TrackerFrame {
            timestamp: t,
            face: Some(FaceFrame {
                transform: None,
                blendshapes: HashMap::from([("jawOpen".to_string(), jaw)]),
            }),
            ..TrackerFrame::default()
        }
    }

    #[test]
    fn test_replay_drops_overtaken_frames() {
        let mut rig = Skeleton::t_pose();
        let mut engine = RetargetEngine::attach(&rig, Config::default());

        // 120 Hz source on a 30 Hz display: only every fourth frame is seen
        let frames: Vec<_> = (0..=120).map(|i| face_frame(i as f64 / 120.0, 0.5)).collect();
        let summary = replay(&mut engine, &mut rig, &frames, 30);

        assert_eq!(summary.ticks, 31);
        assert_eq!(summary.processed, 31);
        assert_eq!(summary.stale, 0);
        assert!(summary.expressions["aa"] > 0.4);
        assert!(summary.bones.contains_key("leftUpperArm"));
    }

    #[test]
    fn test_replay_reports_stale_ticks() {
        let mut rig = Skeleton::t_pose();
        let mut engine = RetargetEngine::attach(&rig, Config::default());

        // 10 Hz source on a 60 Hz display
        let frames: Vec<_> = (0..=10).map(|i| face_frame(i as f64 / 10.0, 0.2)).collect();
        let summary = replay(&mut engine, &mut rig, &frames, 60);

        assert_eq!(summary.processed, 11);
        assert_eq!(summary.ticks, summary.processed + summary.stale);
        assert!(summary.stale > 40);
    }

    #[test]
    fn test_replay_empty_recording() {
        let mut rig = Skeleton::t_pose();
        let mut engine = RetargetEngine::attach(&rig, Config::default());
        let summary = replay(&mut engine, &mut rig, &[], 60);
        assert_eq!(summary.ticks, 0);
        assert!(summary.bones.is_empty());
    }
}
