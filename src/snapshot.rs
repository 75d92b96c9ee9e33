// src/snapshot.rs - Snapshot export and per-session stability log
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::Writer;
use image::RgbaImage;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::tracking::TrackingResult;

/// Writes composited frames to disk as PNG.
pub struct SnapshotExporter {
    output_dir: PathBuf,
}

impl SnapshotExporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn set_output_dir(&mut self, output_dir: impl AsRef<Path>) {
        self.output_dir = output_dir.as_ref().to_path_buf();
    }

    /// `tryon_<date>_<time>_<8 hex chars>.png`
    pub fn snapshot_file_name() -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "tryon_{}_{}.png",
            Local::now().format("%Y%m%d_%H%M%S"),
            &suffix[..8]
        )
    }

    pub fn save(&self, frame: &RgbaImage) -> Result<PathBuf> {
        let path = self.output_dir.join(Self::snapshot_file_name());
        self.save_to(frame, &path)?;
        Ok(path)
    }

    pub fn save_to(&self, frame: &RgbaImage, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        frame.save(path)?;
        info!(path = %path.display(), "saved snapshot");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub timestamp: f64,
    pub detected: bool,
    pub verdict: &'static str,
    pub mean_difference: Option<f64>,
    pub hold_frames: u32,
    pub rendering: bool,
}

impl From<&TrackingResult> for FrameRecord {
    fn from(result: &TrackingResult) -> Self {
        Self {
            frame: result.frame_index,
            timestamp: result.timestamp,
            detected: result.detected,
            verdict: result.verdict.label(),
            mean_difference: result.mean_difference(),
            hold_frames: result.hold_frames,
            rendering: result.is_rendering(),
        }
    }
}

/// Accumulates filter decisions for later CSV export.
pub struct SessionLog {
    session_name: String,
    records: Vec<FrameRecord>,
    capacity: usize,
}

impl SessionLog {
    /// Keeps at most `capacity` most recent frames.
    pub fn new(session_name: Option<String>, capacity: usize) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            session_name,
            records: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add_frame(&mut self, result: &TrackingResult) {
        if self.records.len() == self.capacity {
            self.records.remove(0);
        }
        self.records.push(FrameRecord::from(result));
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Writes `<output_dir>/<session>/stability_log.csv`.
    pub fn export_csv(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let csv_path = output_dir
            .as_ref()
            .join(&self.session_name)
            .join("stability_log.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!(path = %csv_path.display(), frames = self.records.len(), "exported stability log");
        Ok(csv_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::{FrameVerdict, LandmarkSet};
    use image::Rgba;

    fn result(frame_index: u64, verdict: FrameVerdict, hold_frames: u32) -> TrackingResult {
        TrackingResult {
            frame_index,
            timestamp: frame_index as f64 / 30.0,
            detected: verdict != FrameVerdict::Missing,
            verdict,
            hold_frames,
            render_set: (hold_frames > 0).then(|| LandmarkSet::from_pairs(&[[0.5, 0.5]])),
        }
    }

    #[test]
    fn snapshot_names_are_unique_pngs() {
        let a = SnapshotExporter::snapshot_file_name();
        let b = SnapshotExporter::snapshot_file_name();
        assert!(a.starts_with("tryon_") && a.ends_with(".png"));
        assert_eq!(a.len(), "tryon_20250101_120000_abcdef12.png".len());
        assert_ne!(a, b);
    }

    #[test]
    fn save_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnapshotExporter::new(dir.path().join("shots"));
        let frame = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));

        let path = exporter.save(&frame).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded, frame);
    }

    #[test]
    fn session_log_exports_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::new(Some("demo".to_string()), 100);
        log.add_frame(&result(0, FrameVerdict::Accepted, 5));
        log.add_frame(&result(1, FrameVerdict::Unstable { mean_difference: 0.25 }, 4));
        log.add_frame(&result(2, FrameVerdict::Missing, 0));

        let path = log.export_csv(dir.path()).unwrap();
        assert!(path.ends_with("demo/stability_log.csv"));

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "frame,timestamp,detected,verdict,mean_difference,hold_frames,rendering"
        );
        assert!(lines[2].contains("unstable,0.25,4,true"));
        assert!(lines[3].contains("missing,,0,false"));
    }

    #[test]
    fn session_log_drops_oldest_at_capacity() {
        let mut log = SessionLog::new(None, 2);
        for i in 0..3 {
            log.add_frame(&result(i, FrameVerdict::Accepted, 5));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].frame, 1);
        assert!(log.session_name().starts_with("session_"));
    }
}
