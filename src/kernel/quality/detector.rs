use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::QualityError;
use crate::kernel::frame::{FrameMetadata, FrameSample};
use crate::kernel::visibility::VisibilityGate;

use super::estimator::InterframeDelayEstimator;
use super::{DEFAULT_FREEZE_HISTORY, MIN_FRAME_SAMPLES_TO_DETECT_FREEZE, MIN_INCREASE_FOR_FREEZE_MS};

/// Scalar view of the detector, cheap to copy out for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezeState {
    pub avg_interframe_delay_ms: f64,
    pub min_interframe_delay_ms: f64,
    pub was_freeze: bool,
    pub freeze_accumulated_ms: f64,
}

/// Classification of one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameVerdict {
    /// Delay since the previous frame minus the expected cost of skipped frames.
    pub interframe_delay_ms: f64,
    pub avg_interframe_delay_ms: f64,
    pub was_freeze: bool,
    /// The freeze was visible throughout and was added to the accumulator.
    pub counted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// First frame of the stream; nothing to compare against yet.
    Warmup,
    /// No decision was made. Regressed input never reaches the window; an
    /// empty-window sample stays in it but leaves the average and the
    /// minimum delay alone.
    Discarded(QualityError),
    Classified(FrameVerdict),
}

/// Per-stream freeze state machine.
///
/// Feed it every presented frame in arrival order. `&mut self` on
/// `on_rendered_frame` keeps a single stream from being processed
/// concurrently.
#[derive(Debug)]
pub struct FreezeDetector {
    visibility: Arc<VisibilityGate>,
    estimator: InterframeDelayEstimator,
    last_sample: Option<FrameSample>,
    // Only ever lowered.
    min_interframe_delay_ms: f64,
    was_freeze: bool,
    freeze_accumulated_ms: f64,
    freeze_durations: VecDeque<f64>,
    history_capacity: usize,
}

impl FreezeDetector {
    pub fn new(visibility: Arc<VisibilityGate>) -> Self {
        Self::with_history_capacity(visibility, DEFAULT_FREEZE_HISTORY)
    }

    /// `capacity` bounds `freeze_durations`; the oldest entry is evicted
    /// once it is reached. A capacity of zero is treated as one.
    pub fn with_history_capacity(visibility: Arc<VisibilityGate>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            visibility,
            estimator: InterframeDelayEstimator::new(),
            last_sample: None,
            min_interframe_delay_ms: MIN_INCREASE_FOR_FREEZE_MS,
            was_freeze: false,
            freeze_accumulated_ms: 0.0,
            freeze_durations: VecDeque::with_capacity(capacity),
            history_capacity: capacity,
        }
    }

    pub fn on_rendered_frame(&mut self, now_ms: f64, metadata: &FrameMetadata) -> FrameOutcome {
        let current = FrameSample::observe(metadata, now_ms);

        let Some(last) = self.last_sample.replace(current) else {
            debug!("first frame at {:.1}ms, warming up", now_ms);
            return FrameOutcome::Warmup;
        };

        if let Err(e) = check_monotonic(&last, &current) {
            // The sample is dropped but the stream is rebased onto it, so a
            // source reset does not poison every following frame.
            warn!("discarding frame sample: {}", e);
            self.was_freeze = false;
            return FrameOutcome::Discarded(e);
        }

        let frame_count_delta = current.presented_frames - last.presented_frames;
        let time_delta_ms = current.presentation_time_ms - last.presentation_time_ms;

        let avg = match self.estimator.add_sample(frame_count_delta, time_delta_ms) {
            Ok(avg) => avg,
            Err(e) => {
                // No average was computed, so it must not lower the floor.
                debug!("average not updated: {}", e);
                self.was_freeze = false;
                return FrameOutcome::Discarded(e);
            }
        };
        self.min_interframe_delay_ms = avg.min(self.min_interframe_delay_ms);

        let interframe_delay_ms = time_delta_ms
            - (frame_count_delta as f64 - 1.0) * self.min_interframe_delay_ms.min(MIN_INCREASE_FOR_FREEZE_MS);

        self.was_freeze = false;
        let mut counted = false;

        if interframe_delay_ms != 0.0 && self.estimator.window_frames() >= MIN_FRAME_SAMPLES_TO_DETECT_FREEZE {
            self.was_freeze = interframe_delay_ms >= freeze_threshold_ms(avg);

            if self.was_freeze && self.visibility.snapshot().visible_since(last.observed_at_ms) {
                self.freeze_accumulated_ms += interframe_delay_ms;
                self.record_duration(interframe_delay_ms);
                counted = true;
                info!(
                    "freeze of {:.0}ms (avg {:.0}ms, {} frames)",
                    interframe_delay_ms, avg, frame_count_delta
                );
            } else if self.was_freeze {
                debug!("freeze of {:.0}ms overlapped a hidden surface, not counted", interframe_delay_ms);
            }
        }

        FrameOutcome::Classified(FrameVerdict {
            interframe_delay_ms,
            avg_interframe_delay_ms: avg,
            was_freeze: self.was_freeze,
            counted,
        })
    }

    /// Classification of the most recent interval.
    pub fn was_freeze(&self) -> bool {
        self.was_freeze
    }

    pub fn freeze_accumulated_ms(&self) -> f64 {
        self.freeze_accumulated_ms
    }

    /// Read-and-clear of the accumulated freeze time.
    pub fn take_freeze_accumulated_ms(&mut self) -> f64 {
        std::mem::take(&mut self.freeze_accumulated_ms)
    }

    pub fn reset_freeze_accumulated(&mut self) {
        self.freeze_accumulated_ms = 0.0;
    }

    /// Counted freeze durations, oldest first.
    pub fn freeze_durations(&self) -> impl Iterator<Item = f64> + '_ {
        self.freeze_durations.iter().copied()
    }

    pub fn freeze_history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn avg_interframe_delay_ms(&self) -> f64 {
        self.estimator.average_ms()
    }

    pub fn min_interframe_delay_ms(&self) -> f64 {
        self.min_interframe_delay_ms
    }

    pub fn window_frames(&self) -> u64 {
        self.estimator.window_frames()
    }

    pub fn estimator(&self) -> &InterframeDelayEstimator {
        &self.estimator
    }

    pub fn last_sample(&self) -> Option<&FrameSample> {
        self.last_sample.as_ref()
    }

    pub fn state(&self) -> FreezeState {
        FreezeState {
            avg_interframe_delay_ms: self.estimator.average_ms(),
            min_interframe_delay_ms: self.min_interframe_delay_ms,
            was_freeze: self.was_freeze,
            freeze_accumulated_ms: self.freeze_accumulated_ms,
        }
    }

    fn record_duration(&mut self, duration_ms: f64) {
        if self.freeze_durations.len() >= self.history_capacity {
            self.freeze_durations.pop_front();
        }
        self.freeze_durations.push_back(duration_ms);
    }
}

/// Smallest interframe delay classified as a freeze for a given average.
pub fn freeze_threshold_ms(avg_interframe_delay_ms: f64) -> f64 {
    (3.0 * avg_interframe_delay_ms).max(avg_interframe_delay_ms + MIN_INCREASE_FOR_FREEZE_MS)
}

fn check_monotonic(last: &FrameSample, current: &FrameSample) -> Result<(), QualityError> {
    if current.presented_frames < last.presented_frames {
        return Err(QualityError::FrameCountRegressed {
            previous: last.presented_frames,
            current: current.presented_frames,
        });
    }
    if current.presentation_time_ms < last.presentation_time_ms {
        return Err(QualityError::PresentationTimeRegressed {
            previous_ms: last.presentation_time_ms,
            current_ms: current.presentation_time_ms,
        });
    }
    Ok(())
}
