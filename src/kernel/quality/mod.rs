//! Render-freeze detection.
//!
//! A freeze is an interval between two presented frames whose delay, after
//! discounting the expected cost of skipped frames, is both at least three
//! times the running average and at least 150ms above it.

pub mod detector;
pub mod estimator;

pub use detector::{freeze_threshold_ms, FrameOutcome, FrameVerdict, FreezeDetector, FreezeState};
pub use estimator::InterframeDelayEstimator;

/// Frame mass the window must hold before any interval is classified.
pub const MIN_FRAME_SAMPLES_TO_DETECT_FREEZE: u64 = 5;
/// Target frame mass of the sliding window.
pub const AVG_INTERFRAME_DELAYS_WINDOW_SIZE_FRAMES: u64 = 30;
pub const MIN_INCREASE_FOR_FREEZE_MS: f64 = 150.0;
/// Cap on the running average.
pub const MIN_FREEZE_MS: f64 = 500.0;

/// Default number of freeze durations a detector keeps.
pub const DEFAULT_FREEZE_HISTORY: usize = 64;
