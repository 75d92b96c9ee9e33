// src/bin/camera_test.rs - Headless check of camera access and the stability filter
//
// Usage: camera_test [frames] [replay.json]
use anyhow::Context;
use tracing::{info, warn};

use jewelry_tryon::face_mesh::ReplayFeed;
use jewelry_tryon::settings::AppSettings;
use jewelry_tryon::tracking::FaceTracker;
use jewelry_tryon::video::VideoSource;

const DEFAULT_FRAMES: u64 = 120;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let frames = match args.next() {
        Some(arg) => arg
            .parse::<u64>()
            .with_context(|| format!("invalid frame count: {}", arg))?,
        None => DEFAULT_FRAMES,
    };

    let settings = AppSettings::load_or_default();
    let mut source = match VideoSource::new_camera(settings.camera_index, settings.mirror) {
        Ok(source) => {
            info!("Camera {} opened", settings.camera_index);
            source
        }
        Err(e) => {
            warn!("Camera unavailable, using a blank frame: {:#}", e);
            warn!("Possible causes: camera in use, permission not granted, or no camera connected");
            VideoSource::blank()
        }
    };

    let mut tracker = FaceTracker::simulated(settings.stability);
    if let Some(path) = args.next() {
        tracker.set_provider(Box::new(ReplayFeed::load(&path)?));
    }
    info!(provider = tracker.provider_name(), frames, "running stability filter");

    let mut rendered = 0u64;
    let mut rejected = 0u64;
    for _ in 0..frames {
        let frame = source.read_frame()?;
        let result = tracker.process_frame(&frame);
        if result.is_rendering() {
            rendered += 1;
        }
        if result.mean_difference().is_some() {
            rejected += 1;
        }
        info!(
            frame = result.frame_index,
            verdict = result.verdict.label(),
            mean_difference = result.mean_difference(),
            hold_frames = result.hold_frames,
            "frame processed"
        );
    }

    let metrics = tracker.metrics();
    info!(
        rendered,
        rejected,
        fps = metrics.avg_fps,
        processing_ms = metrics.avg_processing_time * 1000.0,
        render_ratio = metrics.render_ratio,
        "done"
    );
    Ok(())
}
