use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one media element's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(pub Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata delivered with each presented frame by the media pipeline.
///
/// Only `presentation_time_ms` and `presented_frames` feed freeze detection;
/// the remaining fields ride along for diagnostics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// When the frame was shown on screen.
    pub presentation_time_ms: f64,
    /// Running count of frames actually presented (not requested).
    pub presented_frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_display_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_time_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_duration_ms: Option<f64>,
}

impl FrameMetadata {
    pub fn new(presentation_time_ms: f64, presented_frames: u64) -> Self {
        Self {
            presentation_time_ms,
            presented_frames,
            ..Self::default()
        }
    }
}

/// The slice of a frame the detector keeps between callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub presentation_time_ms: f64,
    pub presented_frames: u64,
    /// Callback timestamp, on the same clock as visibility transitions.
    pub observed_at_ms: f64,
}

impl FrameSample {
    pub fn observe(metadata: &FrameMetadata, now_ms: f64) -> Self {
        Self {
            presentation_time_ms: metadata.presentation_time_ms,
            presented_frames: metadata.presented_frames,
            observed_at_ms: now_ms,
        }
    }
}
