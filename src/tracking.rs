// src/tracking.rs - Per-frame landmark detection + stability filtering
use std::collections::VecDeque;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::face_mesh::{LandmarkProvider, SimulatedFace};
use crate::stability::{FrameVerdict, LandmarkSet, StabilityConfig, StabilityFilter};

const METRICS_WINDOW: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    pub render_ratio: f32,
    frame_times: VecDeque<f32>,
    rendered: VecDeque<bool>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
            rendered: VecDeque::with_capacity(METRICS_WINDOW),
            ..Default::default()
        }
    }

    fn record(&mut self, elapsed: f32, rendering: bool) {
        self.frame_times.push_front(elapsed);
        self.rendered.push_front(rendering);
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_back();
            self.rendered.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
        self.render_ratio =
            self.rendered.iter().filter(|r| **r).count() as f32 / self.rendered.len() as f32;
    }
}

#[derive(Debug, Clone)]
pub struct TrackingResult {
    pub frame_index: u64,
    pub timestamp: f64,
    pub detected: bool,
    pub verdict: FrameVerdict,
    pub hold_frames: u32,
    pub render_set: Option<LandmarkSet>,
}

impl TrackingResult {
    pub fn is_rendering(&self) -> bool {
        self.render_set.is_some()
    }

    pub fn mean_difference(&self) -> Option<f64> {
        match self.verdict {
            FrameVerdict::Unstable { mean_difference } => Some(mean_difference),
            _ => None,
        }
    }
}

/// Owns the landmark provider and the filter state for one video stream.
pub struct FaceTracker {
    provider: Box<dyn LandmarkProvider>,
    filter: StabilityFilter,
    metrics: PerformanceMetrics,
    frame_counter: u64,
    started: Instant,
}

impl FaceTracker {
    pub fn new(provider: Box<dyn LandmarkProvider>, config: StabilityConfig) -> Self {
        Self {
            provider,
            filter: StabilityFilter::new(config),
            metrics: PerformanceMetrics::new(),
            frame_counter: 0,
            started: Instant::now(),
        }
    }

    pub fn simulated(config: StabilityConfig) -> Self {
        Self::new(Box::new(SimulatedFace::default()), config)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn set_provider(&mut self, provider: Box<dyn LandmarkProvider>) {
        self.provider = provider;
        self.reset();
    }

    pub fn config(&self) -> &StabilityConfig {
        self.filter.config()
    }

    pub fn set_config(&mut self, config: StabilityConfig) {
        if *self.filter.config() != config {
            debug!(?config, "stability config changed");
            self.filter.set_config(config);
        }
    }

    /// Forgets the accepted landmarks, e.g. after the camera restarts.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.metrics = PerformanceMetrics::new();
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn process_frame(&mut self, frame: &DynamicImage) -> TrackingResult {
        let start = Instant::now();
        let frame_index = self.frame_counter;
        self.frame_counter += 1;

        let detection = match self.provider.detect(frame) {
            Ok(detection) => detection,
            Err(e) => {
                warn!(provider = self.provider.name(), "landmark detection failed: {}", e);
                None
            }
        };
        let detected = detection.is_some();

        let verdict = self.filter.push(detection);
        if let FrameVerdict::Unstable { mean_difference } = verdict {
            debug!(frame_index, mean_difference, "rejected unstable landmarks");
        }

        let render_set = self.filter.render_set().cloned();
        self.metrics
            .record(start.elapsed().as_secs_f32(), render_set.is_some());

        TrackingResult {
            frame_index,
            timestamp: self.started.elapsed().as_secs_f64(),
            detected,
            verdict,
            hold_frames: self.filter.state().hold_frames,
            render_set,
        }
    }
}
