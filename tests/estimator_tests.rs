use freezewatch::error::QualityError;
use freezewatch::kernel::quality::{InterframeDelayEstimator, AVG_INTERFRAME_DELAYS_WINDOW_SIZE_FRAMES, MIN_FREEZE_MS};

#[test]
fn test_average_is_rounded_down_per_frame() {
    let mut est = InterframeDelayEstimator::new();

    assert_eq!(est.add_sample(1, 66.0), Ok(66.0));
    // (66 + 100) / 3 = 55.33
    assert_eq!(est.add_sample(2, 100.0), Ok(55.0));
    assert_eq!(est.window_frames(), 3);
    assert_eq!(est.len(), 2);
}

#[test]
fn test_average_is_capped() {
    let mut est = InterframeDelayEstimator::new();

    for _ in 0..10 {
        let avg = est.add_sample(1, 60_000.0).expect("non-empty window");
        assert_eq!(avg, MIN_FREEZE_MS, "Average must never exceed the cap");
    }
}

#[test]
fn test_window_stays_bounded() {
    let mut est = InterframeDelayEstimator::new();

    for i in 0..40 {
        est.add_sample(1, 16.0).expect("non-empty window");
        assert!(
            est.window_frames() <= AVG_INTERFRAME_DELAYS_WINDOW_SIZE_FRAMES,
            "Sample {}: window holds {} frames",
            i,
            est.window_frames()
        );
    }

    assert_eq!(est.window_frames(), 30);
    assert_eq!(est.len(), 30);
    assert_eq!(est.average_ms(), 16.0);
}

#[test]
fn test_window_keeps_minimum_mass() {
    let mut est = InterframeDelayEstimator::new();

    // One heavy sample: dropping it would leave too few frames behind.
    est.add_sample(40, 4_000.0).expect("non-empty window");
    let avg = est.add_sample(1, 10.0).expect("non-empty window");

    assert_eq!(est.len(), 2, "Head must not be trimmed below the minimum mass");
    assert_eq!(est.window_frames(), 41);
    // 4010 / 41 = 97.8
    assert_eq!(avg, 97.0);
}

#[test]
fn test_light_head_is_trimmed() {
    let mut est = InterframeDelayEstimator::new();

    est.add_sample(1, 10.0).expect("non-empty window");
    est.add_sample(40, 4_000.0).expect("non-empty window");

    assert_eq!(est.len(), 1);
    assert_eq!(est.window_frames(), 40);
    assert_eq!(est.average_ms(), 100.0);
}

#[test]
fn test_empty_window_keeps_previous_average() {
    let mut est = InterframeDelayEstimator::new();

    assert_eq!(est.add_sample(0, 5.0), Err(QualityError::EmptyWindow));
    assert_eq!(est.average_ms(), 0.0, "No division by zero, no update");

    // The zero-frame sample still sits in the window and adds its time.
    assert_eq!(est.add_sample(1, 30.0), Ok(35.0));
}
