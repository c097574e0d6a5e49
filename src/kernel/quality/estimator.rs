use std::collections::VecDeque;

use crate::error::QualityError;

use super::{AVG_INTERFRAME_DELAYS_WINDOW_SIZE_FRAMES, MIN_FRAME_SAMPLES_TO_DETECT_FREEZE, MIN_FREEZE_MS};

/// Sliding-window average of the delay per presented frame.
///
/// Each sample is a (frame-count delta, time delta) pair. The window keeps
/// roughly the last 30 presented frames, but never trims below the minimum
/// frame mass, so one very long sample still contributes to the average
/// before it can be evicted.
#[derive(Debug, Clone, Default)]
pub struct InterframeDelayEstimator {
    frame_count_deltas: VecDeque<u64>,
    time_deltas: VecDeque<f64>,
    // Kept in step with `frame_count_deltas`; integer, so never drifts.
    sum_frames: u64,
    avg_interframe_delay_ms: f64,
}

impl InterframeDelayEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample and returns the refreshed average.
    ///
    /// When the window holds no presented frames at all the average is left
    /// as it was and `EmptyWindow` is returned.
    pub fn add_sample(&mut self, frame_count_delta: u64, time_delta_ms: f64) -> Result<f64, QualityError> {
        self.frame_count_deltas.push_back(frame_count_delta);
        self.time_deltas.push_back(time_delta_ms);
        self.sum_frames += frame_count_delta;

        if let Some(&head) = self.frame_count_deltas.front() {
            if self.sum_frames > AVG_INTERFRAME_DELAYS_WINDOW_SIZE_FRAMES
                && self.sum_frames - head > MIN_FRAME_SAMPLES_TO_DETECT_FREEZE
            {
                self.frame_count_deltas.pop_front();
                self.time_deltas.pop_front();
                self.sum_frames -= head;
            }
        }

        if self.sum_frames == 0 {
            return Err(QualityError::EmptyWindow);
        }

        // Summed fresh each time so fractional timestamps cannot accumulate
        // rounding error across evictions.
        let sum_time_ms: f64 = self.time_deltas.iter().sum();
        let avg = (sum_time_ms / self.sum_frames as f64).floor();
        self.avg_interframe_delay_ms = avg.min(MIN_FREEZE_MS);
        Ok(self.avg_interframe_delay_ms)
    }

    pub fn average_ms(&self) -> f64 {
        self.avg_interframe_delay_ms
    }

    /// Total presented-frame mass currently in the window.
    pub fn window_frames(&self) -> u64 {
        self.sum_frames
    }

    pub fn len(&self) -> usize {
        self.frame_count_deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count_deltas.is_empty()
    }
}
