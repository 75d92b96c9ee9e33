// src/stability.rs - Hysteresis filter over per-frame face landmark sets
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Number of points produced by the face mesh model.
pub const FACE_MESH_LANDMARKS: usize = 468;

/// Normalized `(x, y)` position in `[0, 1]` relative to frame width/height.
pub type Landmark = Vector2<f64>;

/// Ordered landmark points for one detected face.
///
/// Index `i` always refers to the same facial point, so the set is never
/// reordered or filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn from_pairs(pairs: &[[f64; 2]]) -> Self {
        Self::new(pairs.iter().map(|p| Vector2::new(p[0], p[1])).collect())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Sum of `|dx| + |dy|` over all points, divided by the point count.
    ///
    /// Both sets must have the same length. An empty set has no drift.
    pub fn mean_difference(&self, other: &LandmarkSet) -> f64 {
        debug_assert_eq!(
            self.len(),
            other.len(),
            "landmark sets must have the same length"
        );
        if self.points.is_empty() {
            return 0.0;
        }

        let total: f64 = self
            .points
            .iter()
            .zip(other.points.iter())
            .map(|(a, b)| (a.x - b.x).abs() + (a.y - b.y).abs())
            .sum();

        total / self.points.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub stability_threshold: f64,
    pub max_hold: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 0.004,
            max_hold: 5,
        }
    }
}

/// Filter memory carried from one frame to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StabilityState {
    pub accepted: Option<LandmarkSet>,
    pub hold_frames: u32,
}

impl StabilityState {
    pub fn is_holding(&self) -> bool {
        self.hold_frames > 0
    }

    /// Landmarks to draw this frame, if any.
    pub fn render_set(&self) -> Option<&LandmarkSet> {
        if self.is_holding() {
            self.accepted.as_ref()
        } else {
            None
        }
    }
}

/// Why a frame did or did not replace the accepted landmark set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameVerdict {
    Accepted,
    Unstable { mean_difference: f64 },
    Missing,
}

impl FrameVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            FrameVerdict::Accepted => "accepted",
            FrameVerdict::Unstable { .. } => "unstable",
            FrameVerdict::Missing => "missing",
        }
    }
}

/// Classifies `detection` against the currently accepted set.
pub fn classify(
    detection: Option<&LandmarkSet>,
    state: &StabilityState,
    config: &StabilityConfig,
) -> FrameVerdict {
    let Some(current) = detection else {
        return FrameVerdict::Missing;
    };

    match state.accepted.as_ref() {
        None => FrameVerdict::Accepted,
        Some(previous) => {
            let mean_difference = current.mean_difference(previous);
            if mean_difference < config.stability_threshold {
                FrameVerdict::Accepted
            } else {
                FrameVerdict::Unstable { mean_difference }
            }
        }
    }
}

/// Advances the filter by one frame and reports the verdict alongside the
/// new state.
pub fn update_with_verdict(
    detection: Option<LandmarkSet>,
    state: StabilityState,
    config: &StabilityConfig,
) -> (StabilityState, FrameVerdict) {
    let verdict = classify(detection.as_ref(), &state, config);

    let next = match (verdict, detection) {
        (FrameVerdict::Accepted, Some(current)) => StabilityState {
            accepted: Some(current),
            hold_frames: config.max_hold,
        },
        _ => StabilityState {
            accepted: state.accepted,
            hold_frames: state.hold_frames.saturating_sub(1),
        },
    };

    (next, verdict)
}

/// Advances the filter by one frame.
///
/// Returns the landmarks to render (if still holding) and the new state.
pub fn update(
    detection: Option<LandmarkSet>,
    state: StabilityState,
    config: &StabilityConfig,
) -> (Option<LandmarkSet>, StabilityState) {
    let (next, _) = update_with_verdict(detection, state, config);
    (next.render_set().cloned(), next)
}

/// Owns a [`StabilityState`] for callers driving the filter in place.
#[derive(Debug, Clone, Default)]
pub struct StabilityFilter {
    config: StabilityConfig,
    state: StabilityState,
}

impl StabilityFilter {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            state: StabilityState::default(),
        }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Takes effect from the next frame; the current hold count is clamped
    /// to the new maximum.
    pub fn set_config(&mut self, config: StabilityConfig) {
        self.config = config;
        self.state.hold_frames = self.state.hold_frames.min(config.max_hold);
    }

    pub fn state(&self) -> &StabilityState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = StabilityState::default();
    }

    pub fn push(&mut self, detection: Option<LandmarkSet>) -> FrameVerdict {
        let state = std::mem::take(&mut self.state);
        let (next, verdict) = update_with_verdict(detection, state, &self.config);
        self.state = next;
        verdict
    }

    pub fn render_set(&self) -> Option<&LandmarkSet> {
        self.state.render_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn set(points: &[[f64; 2]]) -> LandmarkSet {
        LandmarkSet::from_pairs(points)
    }

    #[test]
    fn mean_difference_divides_by_point_count() {
        let a = set(&[[0.0, 0.0], [0.0, 0.0]]);
        let b = set(&[[0.002, 0.002], [0.0, 0.0]]);
        // 0.004 total over 2 points, not over 4 coordinates
        assert_relative_eq!(a.mean_difference(&b), 0.002, epsilon = 1e-12);
    }

    #[test]
    fn empty_sets_have_no_drift() {
        assert_eq!(set(&[]).mean_difference(&set(&[])), 0.0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let config = StabilityConfig::default();
        let accepted = set(&[[0.0, 0.0]]);
        let state = StabilityState {
            accepted: Some(accepted),
            hold_frames: 5,
        };
        let at_threshold = set(&[[0.004, 0.0]]);

        let verdict = classify(Some(&at_threshold), &state, &config);
        assert!(matches!(verdict, FrameVerdict::Unstable { .. }));
    }

    #[test]
    fn missing_frame_on_empty_state_stays_empty() {
        let (render, state) = update(None, StabilityState::default(), &StabilityConfig::default());
        assert!(render.is_none());
        assert_eq!(state, StabilityState::default());
    }

    #[test]
    fn set_config_clamps_hold() {
        let mut filter = StabilityFilter::new(StabilityConfig::default());
        filter.push(Some(set(&[[0.5, 0.5]])));
        assert_eq!(filter.state().hold_frames, 5);

        filter.set_config(StabilityConfig {
            stability_threshold: 0.004,
            max_hold: 2,
        });
        assert_eq!(filter.state().hold_frames, 2);
    }

    #[test]
    fn reset_forgets_accepted_set() {
        let mut filter = StabilityFilter::new(StabilityConfig::default());
        filter.push(Some(set(&[[0.5, 0.5]])));
        filter.reset();
        assert!(filter.render_set().is_none());
        assert!(filter.state().accepted.is_none());
    }
}
