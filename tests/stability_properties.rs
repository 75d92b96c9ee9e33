use approx::assert_relative_eq;
use jewelry_tryon::{update, FrameVerdict, LandmarkSet, StabilityConfig, StabilityFilter, StabilityState};

fn set(points: &[[f64; 2]]) -> LandmarkSet {
    LandmarkSet::from_pairs(points)
}

fn zeros() -> LandmarkSet {
    set(&[[0.0, 0.0], [0.0, 0.0], [0.0, 0.0]])
}

fn holding(accepted: LandmarkSet, hold_frames: u32) -> StabilityState {
    StabilityState {
        accepted: Some(accepted),
        hold_frames,
    }
}

#[test]
fn first_detection_is_accepted() {
    let config = StabilityConfig::default();
    let (render, state) = update(Some(zeros()), StabilityState::default(), &config);

    assert_eq!(render, Some(zeros()));
    assert_eq!(state, holding(zeros(), 5));
}

#[test]
fn dropout_keeps_last_set_while_hold_lasts() {
    let config = StabilityConfig::default();
    let (render, state) = update(None, holding(zeros(), 3), &config);

    assert_eq!(render, Some(zeros()));
    assert_eq!(state, holding(zeros(), 2));
}

#[test]
fn small_motion_replaces_accepted_set() {
    let config = StabilityConfig::default();
    let moved = set(&[[0.001, 0.0], [0.0, 0.001], [0.0, 0.0]]);
    let (render, state) = update(Some(moved.clone()), holding(zeros(), 1), &config);

    assert_eq!(render, Some(moved.clone()));
    assert_eq!(state, holding(moved, 5));
}

#[test]
fn large_motion_is_rejected() {
    let config = StabilityConfig::default();
    let jumped = set(&[[0.1, 0.0], [0.1, 0.0], [0.1, 0.0]]);
    let (render, state) = update(Some(jumped), holding(zeros(), 5), &config);

    assert_eq!(render, Some(zeros()));
    assert_eq!(state, holding(zeros(), 4));
}

#[test]
fn difference_equal_to_threshold_is_rejected() {
    let config = StabilityConfig {
        stability_threshold: 0.5,
        max_hold: 5,
    };
    let single = set(&[[0.0, 0.0]]);
    let (_, state) = update(Some(set(&[[0.25, 0.25]])), holding(single.clone(), 5), &config);

    assert_eq!(state, holding(single, 4));
}

#[test]
fn exhausted_hold_renders_nothing() {
    let config = StabilityConfig::default();
    let (render, state) = update(None, holding(zeros(), 1), &config);
    assert!(render.is_none());
    assert_eq!(state, holding(zeros(), 0));

    let (render, state) = update(None, state, &config);
    assert!(render.is_none());
    assert_eq!(state.hold_frames, 0);
    assert_eq!(state.accepted, Some(zeros()));
}

#[test]
fn stale_set_is_still_the_reference_after_exhaustion() {
    let config = StabilityConfig::default();
    let close = set(&[[0.001, 0.0], [0.0, 0.0], [0.0, 0.0]]);
    let (render, state) = update(Some(close.clone()), holding(zeros(), 0), &config);

    assert_eq!(render, Some(close.clone()));
    assert_eq!(state, holding(close, 5));

    let far = set(&[[0.5, 0.5], [0.5, 0.5], [0.5, 0.5]]);
    let (render, state) = update(Some(far), holding(zeros(), 0), &config);
    assert!(render.is_none());
    assert_eq!(state, holding(zeros(), 0));
}

#[test]
fn worked_sequence() {
    let config = StabilityConfig::default();
    let d2 = set(&[[0.002, 0.0], [0.0, 0.002], [0.001, 0.001]]);
    assert_relative_eq!(d2.mean_difference(&zeros()), 0.002, epsilon = 1e-12);

    let mut filter = StabilityFilter::new(config);
    assert_eq!(filter.push(Some(zeros())), FrameVerdict::Accepted);
    assert_eq!(filter.state().hold_frames, 5);

    assert_eq!(filter.push(Some(d2.clone())), FrameVerdict::Accepted);
    assert_eq!(filter.state().hold_frames, 5);
    assert_eq!(filter.render_set(), Some(&d2));

    for expected in [4, 3, 2, 1] {
        assert_eq!(filter.push(None), FrameVerdict::Missing);
        assert_eq!(filter.state().hold_frames, expected);
        assert_eq!(filter.render_set(), Some(&d2));
    }

    assert_eq!(filter.push(None), FrameVerdict::Missing);
    assert_eq!(filter.state().hold_frames, 0);
    assert!(filter.render_set().is_none());
    assert_eq!(filter.state().accepted.as_ref(), Some(&d2));
}

#[test]
fn update_is_deterministic() {
    let config = StabilityConfig::default();
    let input = set(&[[0.003, 0.0], [0.0, 0.0], [0.0, 0.0]]);
    let first = update(Some(input.clone()), holding(zeros(), 2), &config);
    let second = update(Some(input), holding(zeros(), 2), &config);
    assert_eq!(first, second);
}

#[test]
fn zero_max_hold_never_renders() {
    let config = StabilityConfig {
        stability_threshold: 0.004,
        max_hold: 0,
    };
    let (render, state) = update(Some(zeros()), StabilityState::default(), &config);
    assert!(render.is_none());
    assert_eq!(state, holding(zeros(), 0));
}

#[test]
fn repeated_detection_pins_hold_at_max() {
    let mut filter = StabilityFilter::new(StabilityConfig::default());
    for _ in 0..10 {
        assert_eq!(filter.push(Some(zeros())), FrameVerdict::Accepted);
        assert_eq!(filter.state().hold_frames, 5);
        assert_eq!(filter.render_set(), Some(&zeros()));
    }
}
