// src/face_mesh.rs - Landmark providers feeding the tracker
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use nalgebra::Vector2;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, TryOnError};
use crate::stability::{LandmarkSet, FACE_MESH_LANDMARKS};

/// Face mesh output with iris refinement enabled.
pub const REFINED_FACE_MESH_LANDMARKS: usize = FACE_MESH_LANDMARKS + 10;

// Face mesh indices used for anchoring jewelry
pub const LEFT_EAR: usize = 132;
pub const RIGHT_EAR: usize = 361;
pub const CHIN: usize = 152;

#[derive(Debug, Clone, PartialEq)]
pub struct FaceMeshOptions {
    pub max_num_faces: usize,
    pub refine_landmarks: bool,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
}

impl Default for FaceMeshOptions {
    fn default() -> Self {
        Self {
            max_num_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.6,
            min_tracking_confidence: 0.6,
        }
    }
}

impl FaceMeshOptions {
    pub fn landmark_count(&self) -> usize {
        if self.refine_landmarks {
            REFINED_FACE_MESH_LANDMARKS
        } else {
            FACE_MESH_LANDMARKS
        }
    }
}

/// Per-frame source of at most one face's landmarks.
pub trait LandmarkProvider: Send {
    fn name(&self) -> &str;

    fn detect(&mut self, frame: &DynamicImage) -> Result<Option<LandmarkSet>>;
}

/// Synthetic face used when no face mesh model is available.
///
/// The face drifts slowly with per-point jitter below the default stability
/// threshold. Every `jump_period` frames the whole face jumps, and during
/// the tail of every `dropout_period` frames confidence falls below the
/// detection threshold.
pub struct SimulatedFace {
    options: FaceMeshOptions,
    frame: u64,
    tracking: bool,
    pub jitter: f64,
    pub jump_period: u64,
    pub dropout_period: u64,
    pub dropout_len: u64,
}

impl SimulatedFace {
    pub fn new(options: FaceMeshOptions) -> Self {
        Self {
            options,
            frame: 0,
            tracking: false,
            jitter: 0.0008,
            jump_period: 97,
            dropout_period: 150,
            dropout_len: 8,
        }
    }

    pub fn options(&self) -> &FaceMeshOptions {
        &self.options
    }

    fn confidence(&self, frame: u64) -> f64 {
        if self.dropout_period > 0
            && frame % self.dropout_period >= self.dropout_period.saturating_sub(self.dropout_len)
        {
            0.3
        } else {
            0.95
        }
    }

    fn noise(index: usize, frame: u64, salt: f64) -> f64 {
        ((index as f64 * 12.9898 + frame as f64 * 78.233 + salt).sin() * 43_758.545_3).fract()
    }

    fn generate(&self, frame: u64) -> LandmarkSet {
        let t = frame as f64 / 30.0;
        let mut cx = 0.5 + 0.02 * (0.4 * t).sin();
        let cy = 0.45 + 0.01 * (0.3 * t).sin();
        if self.jump_period > 0 && frame > 0 && frame % self.jump_period == 0 {
            cx += 0.08;
        }

        let (rx, ry) = (0.12, 0.17);
        let count = self.options.landmark_count();
        let mut points: Vec<Vector2<f64>> = (0..count)
            .map(|i| {
                let angle = TAU * i as f64 / count as f64;
                Vector2::new(cx + rx * angle.cos(), cy + ry * angle.sin())
            })
            .collect();

        points[LEFT_EAR] = Vector2::new(cx - 0.11, cy + 0.05);
        points[RIGHT_EAR] = Vector2::new(cx + 0.11, cy + 0.05);
        points[CHIN] = Vector2::new(cx, cy + ry);

        for (i, p) in points.iter_mut().enumerate() {
            p.x = (p.x + self.jitter * Self::noise(i, frame, 0.0)).clamp(0.0, 1.0);
            p.y = (p.y + self.jitter * Self::noise(i, frame, 1.7)).clamp(0.0, 1.0);
        }

        LandmarkSet::new(points)
    }
}

impl Default for SimulatedFace {
    fn default() -> Self {
        Self::new(FaceMeshOptions::default())
    }
}

impl LandmarkProvider for SimulatedFace {
    fn name(&self) -> &str {
        "simulation"
    }

    fn detect(&mut self, _frame: &DynamicImage) -> Result<Option<LandmarkSet>> {
        let frame = self.frame;
        self.frame += 1;

        if self.options.max_num_faces == 0 {
            return Ok(None);
        }

        let required = if self.tracking {
            self.options.min_tracking_confidence
        } else {
            self.options.min_detection_confidence
        };
        let confidence = self.confidence(frame);
        if confidence < required {
            if self.tracking {
                debug!(frame, confidence, "simulated face lost");
            }
            self.tracking = false;
            return Ok(None);
        }

        self.tracking = true;
        Ok(Some(self.generate(frame)))
    }
}

#[derive(Deserialize)]
#[serde(transparent)]
struct ReplayFile {
    frames: Vec<Option<Vec<[f64; 2]>>>,
}

/// Replays a recorded landmark stream, looping at the end.
///
/// The file is a JSON array with one entry per frame: `null` for no
/// detection, or an array of `[x, y]` pairs.
pub struct ReplayFeed {
    path: PathBuf,
    frames: Vec<Option<LandmarkSet>>,
    cursor: usize,
}

impl ReplayFeed {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path)?;
        let feed = Self::from_json(&json, path)?;
        info!(
            path = %feed.path.display(),
            frames = feed.frames.len(),
            "loaded landmark replay"
        );
        Ok(feed)
    }

    pub fn from_json(json: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let invalid = |reason: String| TryOnError::Replay {
            path: path.clone(),
            reason,
        };

        let file: ReplayFile =
            serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        if file.frames.is_empty() {
            return Err(invalid("no frames".to_string()));
        }

        let mut expected_len = None;
        for (index, frame) in file.frames.iter().enumerate() {
            if let Some(points) = frame {
                match expected_len {
                    None => expected_len = Some(points.len()),
                    Some(len) if len != points.len() => {
                        return Err(invalid(format!(
                            "frame {index} has {} landmarks, expected {len}",
                            points.len()
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        let frames = file
            .frames
            .into_iter()
            .map(|frame| frame.map(|points| LandmarkSet::from_pairs(&points)))
            .collect();

        Ok(Self {
            path,
            frames,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkProvider for ReplayFeed {
    fn name(&self) -> &str {
        "replay"
    }

    fn detect(&mut self, _frame: &DynamicImage) -> Result<Option<LandmarkSet>> {
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::StabilityConfig;

    fn blank() -> DynamicImage {
        DynamicImage::new_rgba8(4, 4)
    }

    #[test]
    fn simulated_face_has_refined_length() {
        let mut face = SimulatedFace::default();
        let set = face.detect(&blank()).unwrap().unwrap();
        assert_eq!(set.len(), REFINED_FACE_MESH_LANDMARKS);

        let mut plain = SimulatedFace::new(FaceMeshOptions {
            refine_landmarks: false,
            ..Default::default()
        });
        let set = plain.detect(&blank()).unwrap().unwrap();
        assert_eq!(set.len(), FACE_MESH_LANDMARKS);
    }

    #[test]
    fn simulated_face_jitter_stays_below_threshold() {
        let threshold = StabilityConfig::default().stability_threshold;
        let face = SimulatedFace::default();
        for frame in 1..40 {
            let a = face.generate(frame - 1);
            let b = face.generate(frame);
            assert!(a.mean_difference(&b) < threshold, "frame {frame}");
        }
    }

    #[test]
    fn simulated_face_jumps_and_drops_out() {
        let threshold = StabilityConfig::default().stability_threshold;
        let mut face = SimulatedFace::default();
        let jump = face.jump_period;
        assert!(face.generate(jump - 1).mean_difference(&face.generate(jump)) >= threshold);

        let detections: Vec<bool> = (0..face.dropout_period)
            .map(|_| face.detect(&blank()).unwrap().is_some())
            .collect();
        let missing = detections.iter().filter(|d| !**d).count() as u64;
        assert_eq!(missing, face.dropout_len);
    }

    #[test]
    fn no_faces_requested_means_no_detection() {
        let mut face = SimulatedFace::new(FaceMeshOptions {
            max_num_faces: 0,
            ..Default::default()
        });
        assert!(face.detect(&blank()).unwrap().is_none());
    }

    #[test]
    fn replay_loops_and_keeps_gaps() {
        let mut feed =
            ReplayFeed::from_json("[[[0.1, 0.2], [0.3, 0.4]], null]", "inline.json").unwrap();
        assert_eq!(feed.len(), 2);

        let first = feed.detect(&blank()).unwrap().unwrap();
        assert_eq!(first.get(1).unwrap().x, 0.3);
        assert!(feed.detect(&blank()).unwrap().is_none());
        assert!(feed.detect(&blank()).unwrap().is_some());
    }

    #[test]
    fn replay_rejects_inconsistent_lengths() {
        let err = ReplayFeed::from_json("[[[0.1, 0.2]], [[0.1, 0.2], [0.3, 0.4]]]", "bad.json")
            .err()
            .unwrap();
        assert!(matches!(err, TryOnError::Replay { .. }));
    }

    #[test]
    fn replay_rejects_empty_stream() {
        assert!(ReplayFeed::from_json("[]", "empty.json").is_err());
        assert!(ReplayFeed::from_json("{", "broken.json").is_err());
    }
}
